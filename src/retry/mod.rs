//! Classified retry with exponential backoff
//!
//! Every external call a cycle makes (fetch, generate, publish) runs through
//! [`with_retry`]. Only errors classified [`ErrorClass::Transient`] are
//! retried; anything else is returned on the first occurrence. The retry
//! budget bounds the extra attempts, so total attempts = budget + 1.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::RetryConfig;
use crate::error::{Classify, EngineError, ErrorClass, Result};

impl RetryConfig {
    /// Delay before the given attempt. Attempt 0 never waits; each later
    /// attempt doubles the delay, capped at `max_delay_ms`.
    pub(crate) fn calculate_delay(&self, attempt: u32) -> Duration {
        let delay_ms = if attempt == 0 {
            0
        } else {
            let exponential = self.base_delay_ms.saturating_mul(1 << (attempt - 1).min(32));
            exponential.min(self.max_delay_ms)
        };

        Duration::from_millis(delay_ms)
    }
}

/// Execute an operation, retrying transient failures with exponential backoff
///
/// Non-transient errors are returned immediately without consuming budget.
/// Returns the last error when the budget is exhausted.
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, label: &str, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_error = None;

    for attempt in 0..=config.budget {
        if attempt > 0 {
            let delay = config.calculate_delay(attempt);
            debug!(
                operation = label,
                attempt = attempt,
                delay_ms = delay.as_millis() as u64,
                "Retrying after delay"
            );
            tokio::time::sleep(delay).await;
        }

        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!(operation = label, attempt = attempt, "Succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) => {
                if e.class() != ErrorClass::Transient {
                    warn!(operation = label, error = %e, "Non-retryable error");
                    return Err(e);
                }

                warn!(
                    operation = label,
                    attempt = attempt,
                    budget = config.budget,
                    error = %e,
                    "Transient failure"
                );
                last_error = Some(e);
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| EngineError::cache_io("retry loop ended without an error".to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PublishError, SourceError};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn config(budget: u32) -> RetryConfig {
        RetryConfig {
            budget,
            base_delay_ms: 1,
            max_delay_ms: 10,
        }
    }

    #[tokio::test]
    async fn test_success_first_attempt() {
        let result = with_retry(&config(3), "op", || async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_transient_retried_until_success() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = Arc::clone(&attempts);

        let result = with_retry(&config(2), "op", move || {
            let attempts = Arc::clone(&attempts_clone);
            async move {
                let count = attempts.fetch_add(1, Ordering::SeqCst);
                if count < 2 {
                    return Err(SourceError::Timeout.into());
                }
                Ok(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_budget_bounds_attempts() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = Arc::clone(&attempts);

        let result: Result<()> = with_retry(&config(2), "op", move || {
            let attempts = Arc::clone(&attempts_clone);
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(PublishError::RateLimit.into())
            }
        })
        .await;

        assert!(result.is_err());
        // budget + 1 total attempts
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fatal_not_retried() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = Arc::clone(&attempts);

        let result: Result<()> = with_retry(&config(5), "op", move || {
            let attempts = Arc::clone(&attempts_clone);
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(PublishError::InvalidCredentials.into())
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_calculate_delay_doubles() {
        let config = RetryConfig {
            budget: 5,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
        };

        assert_eq!(config.calculate_delay(0), Duration::from_millis(0));
        assert_eq!(config.calculate_delay(1), Duration::from_millis(1000));
        assert_eq!(config.calculate_delay(2), Duration::from_millis(2000));
        assert_eq!(config.calculate_delay(3), Duration::from_millis(4000));
    }

    #[test]
    fn test_max_delay_cap() {
        let config = RetryConfig {
            budget: 10,
            base_delay_ms: 1000,
            max_delay_ms: 5000,
        };
        assert_eq!(config.calculate_delay(10), Duration::from_millis(5000));
    }
}
