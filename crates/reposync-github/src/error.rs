//! Error types for reposync-github

use std::fmt;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by a [`GitHubApi`](crate::GitHubApi) implementation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The API answered with a non-success status.
    #[error("GitHub API returned {status} for {method} {path}: {message}")]
    Status {
        method: String,
        path: String,
        status: u16,
        message: String,
        rate_limited: bool,
        retry_after: Option<Duration>,
    },

    /// The request never produced a response.
    #[error("Request to {path} failed: {message}")]
    Transport { path: String, message: String },

    /// The response could not be decoded.
    #[error("Unexpected response from {path}: {message}")]
    Decode { path: String, message: String },

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {message}")]
    Client { message: String },
}

/// Coarse classification of an [`Error`], used to decide whether to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    NotFound,
    Forbidden,
    RateLimited,
    Validation,
    Server,
    Transport,
    Decode,
    Other,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotFound => "not-found",
            Self::Forbidden => "forbidden",
            Self::RateLimited => "rate-limited",
            Self::Validation => "validation",
            Self::Server => "server",
            Self::Transport => "transport",
            Self::Decode => "decode",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

impl Error {
    /// Build a status error without rate-limit metadata.
    pub fn status(
        method: impl Into<String>,
        path: impl Into<String>,
        status: u16,
        message: impl Into<String>,
    ) -> Self {
        Self::Status {
            method: method.into(),
            path: path.into(),
            status,
            message: message.into(),
            rate_limited: status == 429,
            retry_after: None,
        }
    }

    /// Build a rate-limit error, optionally carrying the server's `Retry-After`.
    pub fn rate_limited(path: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Self::Status {
            method: "GET".to_string(),
            path: path.into(),
            status: 403,
            message: "API rate limit exceeded".to_string(),
            rate_limited: true,
            retry_after,
        }
    }

    pub fn transport(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Status {
                rate_limited: true, ..
            } => ErrorClass::RateLimited,
            Self::Status { status, .. } => match *status {
                404 => ErrorClass::NotFound,
                401 | 403 => ErrorClass::Forbidden,
                429 => ErrorClass::RateLimited,
                400 | 409 | 422 => ErrorClass::Validation,
                500..=599 => ErrorClass::Server,
                _ => ErrorClass::Other,
            },
            Self::Transport { .. } => ErrorClass::Transport,
            Self::Decode { .. } => ErrorClass::Decode,
            Self::Client { .. } => ErrorClass::Other,
        }
    }

    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.class(),
            ErrorClass::RateLimited | ErrorClass::Server | ErrorClass::Transport
        )
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Status { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(404, ErrorClass::NotFound, false)]
    #[case(403, ErrorClass::Forbidden, false)]
    #[case(401, ErrorClass::Forbidden, false)]
    #[case(422, ErrorClass::Validation, false)]
    #[case(429, ErrorClass::RateLimited, true)]
    #[case(500, ErrorClass::Server, true)]
    #[case(502, ErrorClass::Server, true)]
    #[case(418, ErrorClass::Other, false)]
    fn test_status_classification(
        #[case] status: u16,
        #[case] class: ErrorClass,
        #[case] transient: bool,
    ) {
        let err = Error::status("PUT", "/repos/o/r", status, "boom");
        assert_eq!(err.class(), class);
        assert_eq!(err.is_transient(), transient);
    }

    #[test]
    fn test_rate_limited_403_is_transient() {
        let err = Error::rate_limited("/repos/o/r", Some(Duration::from_secs(3)));
        assert_eq!(err.class(), ErrorClass::RateLimited);
        assert!(err.is_transient());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_transport_is_transient() {
        let err = Error::transport("/repos/o/r", "connection reset");
        assert!(err.is_transient());
        assert_eq!(err.status_code(), None);
    }

    #[test]
    fn test_display_includes_request() {
        let err = Error::status("PATCH", "/repos/o/r/labels/bug", 422, "Validation Failed");
        let display = err.to_string();
        assert!(display.contains("422"));
        assert!(display.contains("PATCH /repos/o/r/labels/bug"));
    }
}
