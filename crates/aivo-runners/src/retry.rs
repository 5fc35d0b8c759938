//! Retry with exponential back-off and jitter for runner calls.
//!
//! [`retry_with_backoff`] wraps any fallible async operation and retries
//! on transient errors (rate limit, 5xx, timeout). Permanent errors —
//! auth rejections, malformed requests — are returned immediately so a
//! misconfigured backend fails fast instead of burning the budget window.

use std::future::Future;
use std::time::Duration;

use crate::error::RunnerError;

/// Explicit retry policy applied around each network call.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Additional attempts after the first, on transient errors only.
    pub max_retries: u32,
    /// Base delay before the first retry; doubles per attempt.
    pub backoff_base_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base_ms: 1_000,
        }
    }
}

/// Runs `operation` with up to `policy.max_retries` additional attempts on
/// transient errors.
///
/// Back-off schedule with `backoff_base_ms = 1_000`:
///
/// | Attempt | Sleep before next attempt       |
/// |---------|---------------------------------|
/// | 1       | 1 000 ms × 2⁰ ± 25 % jitter    |
/// | 2       | 1 000 ms × 2¹ ± 25 % jitter    |
/// | 3       | 1 000 ms × 2² ± 25 % jitter    |
///
/// Delay is capped at 10 s. Non-transient errors are returned immediately.
///
/// # Errors
///
/// Returns the last error once retries are exhausted, or the first
/// permanent error encountered.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: RetryPolicy,
    mut operation: F,
) -> Result<T, RunnerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RunnerError>>,
{
    const MAX_DELAY_MS: u64 = 10_000;
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_transient() || attempt >= policy.max_retries {
                    return Err(err);
                }
                attempt += 1;
                let computed = policy
                    .backoff_base_ms
                    .saturating_mul(1u64 << (attempt - 1).min(10));
                let capped = computed.min(MAX_DELAY_MS);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                tracing::warn!(
                    attempt,
                    max_retries = policy.max_retries,
                    delay_ms,
                    error = %err,
                    "transient runner error — retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
