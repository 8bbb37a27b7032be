//! Error types for reposync-meta

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid repository identifier '{value}': expected owner/repo")]
    InvalidRepository { value: String },

    #[error("Invalid permission '{value}': expected one of read, triage, write, maintain, admin")]
    InvalidPermission { value: String },

    #[error("Invalid label color '{value}': expected a hex color such as d73a4a")]
    InvalidColor { value: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Why a desired-state document was rejected.
///
/// Callers match this exhaustively: both variants mean "do not reconcile",
/// but they are reported to repository owners differently.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The file is not well-formed YAML.
    #[error("{source_name} is not valid YAML: {message}")]
    Syntax {
        source_name: String,
        message: String,
    },

    /// The YAML parsed but does not describe a valid configuration.
    #[error("{source_name} does not match the settings schema: {}", .issues.join("; "))]
    Schema {
        source_name: String,
        issues: Vec<String>,
    },
}

impl ConfigError {
    /// The file or location the rejected document came from.
    pub fn source_name(&self) -> &str {
        match self {
            Self::Syntax { source_name, .. } | Self::Schema { source_name, .. } => source_name,
        }
    }
}
