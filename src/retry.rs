//! Bounded retry with optional exponential backoff
//!
//! The attempt budget is enforced by the loop itself: the operation is
//! invoked with a 1-based attempt number that never exceeds `max_attempts`.
//!
//! # Example
//!
//! ```no_run
//! use podcast_dl::retry::{IsRetryable, download_with_retry};
//! use podcast_dl::config::RetryConfig;
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
//! download_with_retry(&config, 1, 3, |_attempt| async {
//!     Ok::<_, MyError>(())
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::{Error, TransferError};
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Stream failures (connection reset, HTTP 5xx, short read) should return `true`.
/// Failures after the payload is committed (archive write, post-processing) must return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            Error::Transfer(TransferError::Stream { .. }) => true,
            Error::Network(e) => e.is_timeout() || e.is_connect() || e.is_body() || e.is_request(),
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::NotConnected
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::UnexpectedEof
                    | std::io::ErrorKind::Interrupted
            ),
            // Everything past the stream phase happens after commit
            Error::Transfer(_) => false,
            Error::PostProcess(_) => false,
            Error::Archive(_) => false,
            Error::Config { .. } => false,
            Error::UnresolvableSource { .. } => false,
            Error::Serialization(_) => false,
            Error::ExternalTool(_) => false,
            Error::NotSupported(_) => false,
        }
    }
}

/// Execute an async operation for attempts `first_attempt..=max_attempts`
///
/// The operation receives the 1-based attempt number. Retryable failures are
/// retried until the budget is spent; the last error is returned unchanged.
/// Non-retryable failures are returned immediately.
///
/// # Example
///
/// ```no_run
/// use podcast_dl::retry::download_with_retry;
/// use podcast_dl::config::RetryConfig;
/// use podcast_dl::error::Error;
///
/// # async fn example() -> Result<(), Error> {
/// let config = RetryConfig::default();
/// let body = download_with_retry(&config, 1, config.max_attempts, |attempt| async move {
///     Ok::<String, Error>(format!("fetched on attempt {attempt}"))
/// })
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn download_with_retry<F, Fut, T, E>(
    config: &RetryConfig,
    first_attempt: u32,
    max_attempts: u32,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = first_attempt.clamp(1, max_attempts);
    let mut delay = config.initial_delay;

    loop {
        match operation(attempt).await {
            Ok(result) => {
                if attempt > first_attempt {
                    tracing::info!(attempts = attempt, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    max_attempts = max_attempts,
                    delay_ms = delay.as_millis(),
                    "Download attempt failed, retrying"
                );

                if !delay.is_zero() {
                    let wait = if config.jitter { add_jitter(delay) } else { delay };
                    tokio::time::sleep(wait).await;
                }

                let next_delay =
                    Duration::from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier);
                delay = next_delay.min(config.max_delay);
                attempt += 1;
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(
                        error = %e,
                        attempts = attempt,
                        "Operation failed after all retry attempts exhausted"
                    );
                } else {
                    tracing::error!(error = %e, "Operation failed with non-retryable error");
                }
                return Err(e);
            }
        }
    }
}

/// Add random jitter to a delay to prevent thundering herd
///
/// The actual delay will be between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}
