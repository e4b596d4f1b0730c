//! Bounded retry with exponential backoff and jitter for market listing fetches.
//!
//! Only the fetch layer retries. The matching engine works on pure data and
//! never retries anything.

use anyhow::Result;
use rand::Rng;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first)
    pub max_attempts: u32,
    /// Base delay in milliseconds for exponential backoff
    pub base_delay_ms: u64,
    /// Cap for a single backoff delay in milliseconds
    pub max_delay_ms: u64,
    /// Total time budget in milliseconds across all attempts
    pub max_elapsed_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 8_000,
            max_elapsed_ms: 30_000,
        }
    }
}

impl RetryPolicy {
    /// Load retry policy from environment variables with safe defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let num = |key: &str| lookup(key).and_then(|s| s.trim().parse::<u64>().ok());
        Self {
            max_attempts: num("FETCH_RETRY_MAX_ATTEMPTS")
                .filter(|&n| n > 0 && n <= 10) // cap at 10
                .map(|n| n as u32)
                .unwrap_or(defaults.max_attempts),
            base_delay_ms: num("FETCH_RETRY_BASE_DELAY_MS")
                .filter(|&n| n > 0)
                .unwrap_or(defaults.base_delay_ms),
            max_delay_ms: num("FETCH_RETRY_MAX_DELAY_MS")
                .filter(|&n| n > 0)
                .unwrap_or(defaults.max_delay_ms),
            max_elapsed_ms: num("FETCH_RETRY_MAX_ELAPSED_MS")
                .filter(|&n| n > 0)
                .unwrap_or(defaults.max_elapsed_ms),
        }
    }

    /// Backoff cap for an attempt: `min(max_delay, base * 2^(attempt-1))`
    fn backoff_cap_ms(&self, attempt: u32) -> u64 {
        let exponent = attempt.saturating_sub(1);
        let multiplier = 1u64.checked_shl(exponent).unwrap_or(u64::MAX);
        self.base_delay_ms
            .saturating_mul(multiplier)
            .min(self.max_delay_ms)
    }

    /// Backoff delay with full jitter in `[0, cap)`
    pub fn backoff_ms(&self, attempt: u32) -> u64 {
        match self.backoff_cap_ms(attempt) {
            0 => 0,
            cap => rand::thread_rng().gen_range(0..cap),
        }
    }
}

/// HTTP statuses worth another attempt
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 425 | 429 | 500..=599)
}

/// Classify an error from a fetch attempt.
///
/// Network failures and retryable HTTP statuses are retried; anything else
/// (4xx, payload decoding) fails immediately.
pub fn is_retryable(err: &anyhow::Error) -> bool {
    match err.downcast_ref::<reqwest::Error>() {
        Some(http_err) => match http_err.status() {
            Some(status) => is_retryable_status(status.as_u16()),
            None => !http_err.is_decode(),
        },
        None => false,
    }
}

/// Retry an async operation with exponential backoff and jitter
pub async fn retry_async<T, Fut, F>(policy: &RetryPolicy, op_name: &str, operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    retry_async_with(policy, op_name, is_retryable, operation).await
}

/// [`retry_async`] with a caller-supplied error classifier
pub async fn retry_async_with<T, Fut, F, C>(
    policy: &RetryPolicy,
    op_name: &str,
    classify: C,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
    C: Fn(&anyhow::Error) -> bool,
{
    let start = Instant::now();
    let mut attempt = 1;

    loop {
        let err = match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(
                        "retry op={} succeeded after {} attempts (elapsed={}ms)",
                        op_name,
                        attempt,
                        start.elapsed().as_millis()
                    );
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        if !classify(&err) {
            debug!("retry op={} non-retryable error: {:#}", op_name, err);
            return Err(err);
        }

        let elapsed_ms = start.elapsed().as_millis() as u64;
        if attempt >= policy.max_attempts || elapsed_ms >= policy.max_elapsed_ms {
            warn!(
                "retry op={} giving up after {} attempts (elapsed={}ms): {:#}",
                op_name, attempt, elapsed_ms, err
            );
            return Err(err);
        }

        let backoff_ms = policy
            .backoff_ms(attempt)
            .min(policy.max_elapsed_ms.saturating_sub(elapsed_ms));
        debug!(
            "retry op={} attempt={} backoff_ms={} error={:#}",
            op_name, attempt, backoff_ms, err
        );
        if backoff_ms > 0 {
            tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
        }
        attempt += 1;
    }
}
