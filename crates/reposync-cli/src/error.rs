//! Error types for reposync-cli

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that can occur in CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Error from reposync-core
    #[error(transparent)]
    Core(#[from] reposync_core::Error),

    /// Error from reposync-meta
    #[error(transparent)]
    Meta(#[from] reposync_meta::Error),

    /// Rejected desired-state document
    #[error(transparent)]
    Config(#[from] reposync_meta::ConfigError),

    /// GitHub API error
    #[error(transparent)]
    GitHub(#[from] reposync_github::Error),

    /// Failed to read current state
    #[error(transparent)]
    Read(#[from] reposync_core::ReadError),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// User-facing error with a message
    #[error("{message}")]
    User { message: String },
}

impl CliError {
    /// Create a new user error with the given message
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }
}
