//! Retry logic with exponential backoff
//!
//! Two retry layers exist in the pipeline:
//! - In-call retries ([`with_retry`]) for short, idempotent HTTP calls such as
//!   Telegram notifications.
//! - Queue-level retries, where a failed job goes back to `pending` and becomes
//!   claimable again after [`backoff_delay`].
//!
//! Every external call is additionally bounded by [`with_timeout`], which turns an
//! overrun into a retryable [`Error::Timeout`].
//!
//! # Example
//!
//! ```no_run
//! use submission_pipeline::retry::{IsRetryable, with_retry};
//! use submission_pipeline::config::RetryConfig;
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

use crate::config::{BackoffConfig, RetryConfig};
use crate::error::{DatabaseError, Error, Result};
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (timeouts, upstream 5xx, a locked database) return `true`.
/// Permanent failures (bad input, missing configuration, duplicates) return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            Error::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Error::ExternalService { .. } => true,
            Error::Timeout { .. } => true,
            Error::Database(e) => matches!(
                e,
                DatabaseError::ConnectionFailed(_) | DatabaseError::QueryFailed(_)
            ),
            Error::Sqlx(e) => !matches!(
                e,
                sqlx::Error::RowNotFound | sqlx::Error::ColumnNotFound(_) | sqlx::Error::Decode(_)
            ),
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::Interrupted
            ),
            Error::Validation(_) => false,
            Error::Config { .. } => false,
            Error::Duplicate { .. } => false,
            Error::NotFound(_) => false,
            Error::Serialization(_) => false,
            Error::ApiServerError(_) => false,
            Error::Other(_) => false,
        }
    }
}

/// Execute an async operation with exponential backoff retry logic
///
/// Returns the successful result or the last error after `config.max_attempts`
/// retries are exhausted. Non-retryable errors are returned immediately.
pub async fn with_retry<F, Fut, T, E>(
    config: &RetryConfig,
    mut operation: F,
) -> std::result::Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::debug!(attempts = attempt + 1, "Operation succeeded after retry");
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
            Err(e) => return Err(e),
        }
    }
}

/// Delay before a failed job becomes claimable again
///
/// `attempt` is the attempt that just failed (1-based). The delay is
/// `initial_delay * multiplier^(attempt-1)`, capped at `max_delay`, optionally jittered.
pub fn backoff_delay(config: &BackoffConfig, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(32) as i32;
    let base = config.initial_delay.as_secs_f64() * config.multiplier.powi(exponent);
    let capped = Duration::from_secs_f64(base.min(config.max_delay.as_secs_f64()));

    if config.jitter {
        add_jitter(capped).min(config.max_delay)
    } else {
        capped
    }
}

/// Bound an external call, mapping an overrun to [`Error::Timeout`]
pub async fn with_timeout<T, Fut>(after: Duration, operation: &str, fut: Fut) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    match tokio::time::timeout(after, fut).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout {
            operation: operation.to_string(),
            after,
        }),
    }
}

/// Add random jitter to a delay to prevent thundering herd
///
/// The result lies between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}
