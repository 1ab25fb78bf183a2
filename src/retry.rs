//! Bounded retry with exponential backoff for upstream operations.

use std::time::Duration;

use anyhow::{Result, anyhow};
use log::{debug, warn};

use crate::http::NonRetryableError;

/// Maximum number of attempts for an upstream fetch.
pub const MAX_RETRIES: usize = 3;

/// Delay before the first retry in milliseconds.
pub const RETRY_DELAY_MS: u64 = 1000;

/// Upper bound for a single backoff delay in milliseconds.
pub const MAX_RETRY_DELAY_MS: u64 = 8000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_RETRIES,
            base_delay: Duration::from_millis(RETRY_DELAY_MS),
            max_delay: Duration::from_millis(MAX_RETRY_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// Policy without waiting between attempts, for tests and local upstreams.
    pub fn immediate(max_attempts: usize) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16) as u32;
        self.base_delay
            .saturating_mul(2u32.saturating_pow(exponent))
            .min(self.max_delay)
    }
}

/// Checks if an anyhow::Error is retryable.
fn is_retryable_error(e: &anyhow::Error) -> bool {
    e.downcast_ref::<NonRetryableError>().is_none()
}

/// Executes an async operation with retry logic.
///
/// Errors carrying a [`NonRetryableError`] fail immediately; everything else
/// is retried until the policy's attempts are exhausted.
pub async fn with_retry<F, Fut, T>(operation_name: &str, policy: &RetryPolicy, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=max_attempts {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if !is_retryable_error(&e) {
                    debug!("{}: non-retryable error: {}", operation_name, e);
                    return Err(e);
                }

                if attempt < max_attempts {
                    let delay = policy.delay_for(attempt);
                    warn!(
                        "{}: attempt {}/{} failed ({}), retrying in {}ms...",
                        operation_name,
                        attempt,
                        max_attempts,
                        e,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        anyhow!("{}: failed after {} attempts", operation_name, max_attempts)
    }))
}
