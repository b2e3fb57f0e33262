//! Retry wrapper with exponential backoff and jitter.
//!
//! Re-invokes an operation using the classifier's verdict and delay.
//! Knows nothing about idempotency keys or business semantics - it only
//! decides whether to call the operation again. The final error
//! propagates unchanged so callers can still branch on its type.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{info, warn};

use crate::domain::billing::BillingError;

use super::classifier::{ErrorClassifier, RetryVerdict};

/// Retry configuration, constructed once per gateway instance.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum attempts, including the first one.
    pub max_attempts: u32,

    /// Multiplier applied to the classified delay per prior attempt.
    pub backoff_multiplier: f64,

    /// Cap on any single backoff delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_multiplier: 2.0,
            max_delay: Duration::from_secs(10),
        }
    }
}

/// Backoff for the given attempt (1-based): the classified base delay
/// scaled exponentially, capped at the policy maximum. Strictly
/// increasing below the cap; jitter is applied separately.
pub fn backoff_delay(policy: &RetryPolicy, base: Duration, attempt: u32) -> Duration {
    let scaled = base.as_secs_f64() * policy.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);
    Duration::from_secs_f64(scaled.min(policy.max_delay.as_secs_f64()))
}

/// Add up to 25% random jitter to spread out concurrent retriers.
fn with_jitter(delay: Duration) -> Duration {
    let factor = rand::thread_rng().gen_range(1.0..1.25);
    Duration::from_secs_f64(delay.as_secs_f64() * factor)
}

/// Execute an async operation, retrying per the classifier's verdict.
///
/// Exceeding `max_attempts` surfaces the last observed error, not a
/// generic "retries exhausted" wrapper.
pub async fn retry_with_classifier<T, F, Fut>(
    policy: &RetryPolicy,
    classifier: &dyn ErrorClassifier,
    operation_name: &str,
    mut operation: F,
) -> Result<T, BillingError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, BillingError>>,
{
    // A zero-attempt policy would mean never calling the operation;
    // always make at least one attempt.
    let max_attempts = policy.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    info!(operation = operation_name, attempt, "succeeded after retry");
                }
                return Ok(value);
            }
            Err(error) => {
                let RetryVerdict { retryable, delay } = classifier.classify(&error);

                if !retryable || attempt == max_attempts {
                    warn!(
                        operation = operation_name,
                        attempt,
                        max_attempts,
                        error = %error,
                        "operation failed permanently"
                    );
                    return Err(error);
                }

                let backoff = with_jitter(backoff_delay(policy, delay, attempt));
                warn!(
                    operation = operation_name,
                    attempt,
                    max_attempts,
                    error = %error,
                    retry_in_ms = backoff.as_millis() as u64,
                    "transient failure, retrying"
                );
                tokio::time::sleep(backoff).await;
            }
        }
    }

    unreachable!("loop exits via return")
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::resilience::ProviderErrorClassifier;

    #[tokio::test(start_paused = true)]
    async fn rate_limited_call_uses_all_attempts() {
        let policy = RetryPolicy::default();
        let attempts = AtomicU32::new(0);

        let result: Result<(), _> =
            retry_with_classifier(&policy, &ProviderErrorClassifier, "test_op", || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(BillingError::provider(429, "rate limited")) }
            })
            .await;

        assert_eq!(attempts.load(Ordering::SeqCst), policy.max_attempts);
        assert!(matches!(
            result,
            Err(BillingError::Provider { status: 429, .. })
        ));
    }

    #[tokio::test]
    async fn terminal_error_makes_single_attempt() {
        let policy = RetryPolicy::default();
        let attempts = AtomicU32::new(0);

        let result: Result<(), _> =
            retry_with_classifier(&policy, &ProviderErrorClassifier, "test_op", || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(BillingError::provider(404, "not found")) }
            })
            .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(matches!(
            result,
            Err(BillingError::Provider { status: 404, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failure_then_success_returns_value() {
        let policy = RetryPolicy::default();
        let attempts = AtomicU32::new(0);

        let result = retry_with_classifier(&policy, &ProviderErrorClassifier, "test_op", || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(BillingError::transport("connection reset"))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn zero_attempt_policy_still_makes_one_attempt() {
        let policy = RetryPolicy {
            max_attempts: 0,
            ..RetryPolicy::default()
        };
        let attempts = AtomicU32::new(0);

        let result: Result<(), _> =
            retry_with_classifier(&policy, &ProviderErrorClassifier, "test_op", || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(BillingError::provider(429, "rate limited")) }
            })
            .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(matches!(
            result,
            Err(BillingError::Provider { status: 429, .. })
        ));
    }

    #[test]
    fn backoff_delays_strictly_increase_below_cap() {
        let policy = RetryPolicy::default();
        let base = Duration::from_millis(500);

        let d1 = backoff_delay(&policy, base, 1);
        let d2 = backoff_delay(&policy, base, 2);
        let d3 = backoff_delay(&policy, base, 3);

        assert_eq!(d1, base);
        assert!(d2 > d1);
        assert!(d3 > d2);
    }

    #[test]
    fn backoff_delay_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 10,
            backoff_multiplier: 2.0,
            max_delay: Duration::from_secs(1),
        };
        let delay = backoff_delay(&policy, Duration::from_secs(1), 8);
        assert_eq!(delay, Duration::from_secs(1));
    }
}
