//! Bounded retries for API calls
//!
//! Only transient errors (rate limiting, 5xx, transport failures) are
//! retried, with exponential backoff. A `Retry-After` supplied by the API
//! replaces the computed delay for that attempt.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use reposync_github::Error as ApiError;
use tracing::warn;

/// How many times, and how patiently, a call is retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts including the first; `1` disables retries.
    pub max_attempts: u32,
    pub initial_interval: Duration,
    pub max_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Retries with a negligible delay, for tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(1),
        }
    }

    /// Run `call` until it succeeds, fails permanently, or the attempt budget
    /// is spent. The last error is returned.
    pub async fn run<T, F, Fut>(&self, what: &str, mut call: F) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, ApiError>> + Send,
        T: Send,
    {
        let max_attempts = self.max_attempts.max(1);
        let attempts = AtomicU32::new(0);
        let backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_interval)
            .with_max_interval(self.max_interval)
            .with_max_elapsed_time(None)
            .build();

        backoff::future::retry(backoff, || {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            let fut = call();
            async move {
                match fut.await {
                    Ok(value) => Ok(value),
                    Err(e) if e.is_transient() && attempt < max_attempts => {
                        warn!(
                            call = what,
                            attempt,
                            max_attempts,
                            error = %e,
                            "transient GitHub error, retrying"
                        );
                        match e.retry_after() {
                            Some(delay) => Err(backoff::Error::retry_after(e, delay)),
                            None => Err(backoff::Error::transient(e)),
                        }
                    }
                    Err(e) => Err(backoff::Error::permanent(e)),
                }
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn server_error() -> ApiError {
        ApiError::status("GET", "/repos/o/r", 502, "Bad Gateway")
    }

    #[tokio::test]
    async fn test_transient_error_retried_until_success() {
        let calls = AtomicUsize::new(0);
        let result = RetryPolicy::immediate(3)
            .run("get_repository", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move { if n < 2 { Err(server_error()) } else { Ok(n) } }
            })
            .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_budget_exhausted_returns_last_error() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), _> = RetryPolicy::immediate(2)
            .run("get_repository", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(server_error()) }
            })
            .await;
        assert_eq!(result.unwrap_err().status_code(), Some(502));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), _> = RetryPolicy::immediate(5)
            .run("create_label", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ApiError::status("POST", "/repos/o/r/labels", 422, "invalid")) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_after_is_honored() {
        let calls = AtomicUsize::new(0);
        let result = RetryPolicy::immediate(2)
            .run("get_topics", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(ApiError::rate_limited(
                            "/repos/o/r/topics",
                            Some(Duration::from_millis(5)),
                        ))
                    } else {
                        Ok(())
                    }
                }
            })
            .await;
        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
