//! Retry logic with exponential backoff
//!
//! Used by the object store client for listing and downloading partitions.
//! The export pipeline itself never retries: a failed step aborts the export.
//!
//! # Example
//!
//! ```no_run
//! use redshift_unload::retry::{IsRetryable, with_retry};
//! use redshift_unload::config::RetryConfig;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Transient,
//!     Permanent,
//! }
//!
//! impl std::fmt::Display for MyError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{:?}", self)
//!     }
//! }
//!
//! impl IsRetryable for MyError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, MyError::Transient)
//!     }
//! }
//!
//! # async fn example() -> Result<(), MyError> {
//! let config = RetryConfig::default();
//! with_retry(&config, || async { Ok::<_, MyError>(()) }).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::Error;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (timeouts, throttling, reset connections) return `true`.
/// Permanent failures (missing object, denied access, bad input) return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            Error::Transfer { .. } => true,
            Error::LocalIo { source, .. } | Error::Io(source) => matches!(
                source.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::NotConnected
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::Interrupted
            ),
            Error::Export(failure) => failure.source.is_retryable(),
            Error::Config { .. }
            | Error::Query { .. }
            | Error::Permission { .. }
            | Error::NotFound { .. }
            | Error::Delete { .. }
            | Error::InvalidObjectKey { .. }
            | Error::Cancelled
            | Error::Serialization(_) => false,
        }
    }
}

/// Execute an async operation with exponential backoff retry logic
///
/// Returns the successful result or the last error once attempts are exhausted
/// or a non-retryable error is seen.
pub async fn with_retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::info!(attempts = attempt + 1, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < config.max_attempts => {
                attempt += 1;

                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis(),
                    "Operation failed, retrying"
                );

                let jittered_delay = if config.jitter {
                    add_jitter(delay)
                } else {
                    delay
                };
                tokio::time::sleep(jittered_delay).await;

                let next_delay =
                    Duration::from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier);
                delay = next_delay.min(config.max_delay);
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(
                        error = %e,
                        attempts = attempt + 1,
                        "Operation failed after all retry attempts exhausted"
                    );
                }
                return Err(e);
            }
        }
    }
}

/// Add up to 100% random jitter, so the result lies in `delay..=2 * delay`
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_config(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(50),
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }

    fn transfer_error() -> Error {
        Error::Transfer {
            key: "tmp/redshift-unloader/s/0000_part_00.gz".into(),
            message: "connection reset".into(),
        }
    }

    #[tokio::test]
    async fn test_success_no_retry() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = with_retry(&fast_config(3), || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Error>(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 1, "should only call once");
    }

    #[tokio::test]
    async fn test_transfer_error_retried_then_succeeds() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = with_retry(&fast_config(3), || {
            let counter = counter_clone.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(transfer_error())
                } else {
                    Ok(7)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retries_exhausted_returns_last_error() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = with_retry(&fast_config(2), || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(transfer_error())
            }
        })
        .await;

        assert!(matches!(result, Err(Error::Transfer { .. })));
        assert_eq!(counter.load(Ordering::SeqCst), 3, "initial call + 2 retries");
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = with_retry(&fast_config(5), || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(Error::NotFound { key: "gone".into() })
            }
        })
        .await;

        assert!(matches!(result, Err(Error::NotFound { .. })));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_disabled_policy_calls_once() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let _ = with_retry(&RetryConfig::disabled(), || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(transfer_error())
            }
        })
        .await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let base = Duration::from_millis(100);
        for _ in 0..100 {
            let jittered = add_jitter(base);
            assert!(jittered >= base && jittered <= base * 2, "{jittered:?}");
        }
    }

    #[test]
    fn test_error_classification() {
        assert!(transfer_error().is_retryable());
        assert!(
            Error::local_io(
                "/tmp/x",
                std::io::Error::new(std::io::ErrorKind::TimedOut, "slow disk")
            )
            .is_retryable()
        );
        assert!(
            !Error::local_io(
                "/tmp/x",
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied")
            )
            .is_retryable()
        );
        assert!(!Error::Query { message: "syntax".into() }.is_retryable());
        assert!(!Error::Permission { message: "denied".into() }.is_retryable());
        assert!(!Error::Cancelled.is_retryable());
    }
}
