//! Error types for reposync-core

use reposync_meta::{ConfigError, RepoIdentifier};

/// Result type for reposync-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Reading the current state of a repository failed; the pass is aborted.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ReadError {
    /// The repository does not exist or the client cannot see it.
    #[error("Repository {repo} is not accessible (HTTP {status})")]
    Inaccessible { repo: RepoIdentifier, status: u16 },

    /// The API kept failing after the retry budget was spent.
    #[error("GitHub API unavailable while reading {repo}: {source}")]
    Unavailable {
        repo: RepoIdentifier,
        #[source]
        source: reposync_github::Error,
    },
}

impl ReadError {
    pub fn repo(&self) -> &RepoIdentifier {
        match self {
            Self::Inaccessible { repo, .. } | Self::Unavailable { repo, .. } => repo,
        }
    }
}

/// A job in [`SyncEngine::reconcile_many`](crate::SyncEngine::reconcile_many)
/// that produced no report.
#[derive(Debug, Clone, thiserror::Error)]
pub enum JobError {
    #[error(transparent)]
    Read(#[from] ReadError),

    /// The task running the pass panicked or was cancelled.
    #[error("Pass for {repo} did not finish: {message}")]
    Aborted { repo: RepoIdentifier, message: String },
}

/// Errors that can occur in reposync-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Current state could not be read
    #[error(transparent)]
    Read(#[from] ReadError),

    /// The desired-state document is malformed
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A webhook payload could not be interpreted
    #[error(transparent)]
    Event(#[from] crate::events::EventError),

    /// GitHub API error outside a reconciliation pass
    #[error(transparent)]
    GitHub(#[from] reposync_github::Error),

    /// Metadata error from reposync-meta
    #[error(transparent)]
    Meta(#[from] reposync_meta::Error),

    /// Engine settings file could not be read
    #[error("Failed to read settings from {path}: {source}")]
    SettingsIo {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Engine settings file is not valid TOML
    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
