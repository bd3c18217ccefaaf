//! Exponential backoff for page fetches.
//!
//! Transient failures (network errors, HTTP 429, HTTP 5xx) are retried with a
//! delay of `min(base_delay * 2^n, max_delay)`. Anything else is final.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts including the first (default: 3).
    pub max_attempts: u32,
    /// Delay before the first retry (default: 2 seconds).
    pub base_delay: Duration,
    /// Upper bound on any single delay (default: 10 seconds).
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryConfig {
    /// No delays at all. Used by tests against mock servers.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }
}

/// Outcome of one failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt {
    /// Worth trying again.
    Transient(String),
    /// Retrying will not help.
    Final(String),
}

/// Whether an HTTP status should be retried.
pub fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Delay before retry `attempt` (0-indexed).
pub fn compute_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let exp = 2u64.saturating_pow(attempt);
    let base_ms = config.base_delay.as_millis() as u64;
    let capped_ms = base_ms
        .saturating_mul(exp)
        .min(config.max_delay.as_millis() as u64);
    Duration::from_millis(capped_ms)
}

/// Run `op` until it succeeds, fails finally, or attempts run out.
///
/// Returns the last failure message on error.
pub async fn with_retry<T, F, Fut>(
    config: &RetryConfig,
    label: &str,
    mut op: F,
) -> std::result::Result<T, String>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, Attempt>>,
{
    let attempts = config.max_attempts.max(1);
    let mut last = String::new();

    for attempt in 0..attempts {
        match op().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(label, attempt, "succeeded after retry");
                }
                return Ok(value);
            }
            Err(Attempt::Final(msg)) => return Err(msg),
            Err(Attempt::Transient(msg)) => {
                if attempt + 1 < attempts {
                    let delay = compute_delay(config, attempt);
                    warn!(
                        label,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %msg,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                last = msg;
            }
        }
    }

    Err(last)
}
