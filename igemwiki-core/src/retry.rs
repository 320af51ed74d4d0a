//! Bounded exponential backoff for transient wiki failures.
//!
//! Only login goes through here. Per-item uploads and page fetches are never
//! retried; their failures are recorded in the item's result instead.

use std::future::Future;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::error::WikiError;

/// Classifies errors as transient (worth retrying) or permanent.
pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for WikiError {
    fn is_retryable(&self) -> bool {
        match self {
            WikiError::Transport(e) => e.is_timeout() || e.is_connect(),
            // Server-side trouble and throttling.
            WikiError::Status { status, .. } => *status >= 500 || *status == 429,
            WikiError::Api { code, .. } => matches!(code.as_str(), "readonly" | "maxlag" | "ratelimited"),
            WikiError::Rejected(_) | WikiError::Malformed(_) => false,
        }
    }
}

/// Runs `operation` until it succeeds, fails permanently, or `config.max_attempts`
/// attempts have been made. Returns the last error.
pub async fn with_retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;
    let mut delay = config.initial_delay();

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(attempts = attempt, "Operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                tracing::warn!(
                    error = %e,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
                delay = next_delay(delay, config);
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(error = %e, attempts = attempt, "Retries exhausted");
                } else {
                    tracing::error!(error = %e, "Permanent failure, not retrying");
                }
                return Err(e);
            }
        }
    }
}

/// Backoff step, clamped to `config.max_delay()`. A multiplier that yields no
/// valid duration (negative, NaN, overflow) falls back to the maximum.
fn next_delay(delay: Duration, config: &RetryConfig) -> Duration {
    Duration::try_from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier)
        .unwrap_or(config.max_delay())
        .min(config.max_delay())
}
