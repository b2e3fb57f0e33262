//! Error classifier - maps a raised error to a retry verdict.
//!
//! Provider-specific (status-code driven) but pluggable. Unknown error
//! shapes fail closed: they must not be silently retried into duplicate
//! side effects.

use std::time::Duration;

use crate::domain::billing::BillingError;

/// Delay after a timeout or network-level failure.
const SHORT_DELAY: Duration = Duration::from_millis(250);

/// Delay after a 5xx response.
const MEDIUM_DELAY: Duration = Duration::from_millis(500);

/// Delay after a 429 response (rate-limit backoff).
const RATE_LIMIT_DELAY: Duration = Duration::from_secs(1);

/// Verdict for a single observed error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryVerdict {
    pub retryable: bool,
    pub delay: Duration,
}

impl RetryVerdict {
    pub fn terminal() -> Self {
        Self {
            retryable: false,
            delay: Duration::ZERO,
        }
    }

    pub fn after(delay: Duration) -> Self {
        Self {
            retryable: true,
            delay,
        }
    }
}

/// Port for error classification.
pub trait ErrorClassifier: Send + Sync {
    fn classify(&self, error: &BillingError) -> RetryVerdict;
}

/// Reference classification policy for payment-provider adapters.
///
/// - Timeout / cancellation: retryable, short delay
/// - Network-level failures: retryable, short delay
/// - HTTP 429: retryable, longer delay
/// - HTTP 5xx: retryable, medium delay
/// - Other HTTP 4xx: terminal (client/validation errors are not transient)
/// - Everything else: terminal (fail closed)
#[derive(Debug, Clone, Copy, Default)]
pub struct ProviderErrorClassifier;

impl ErrorClassifier for ProviderErrorClassifier {
    fn classify(&self, error: &BillingError) -> RetryVerdict {
        match error {
            BillingError::Timeout { .. } => RetryVerdict::after(SHORT_DELAY),
            BillingError::Transport(_) => RetryVerdict::after(SHORT_DELAY),
            BillingError::Provider { status: 429, .. } => RetryVerdict::after(RATE_LIMIT_DELAY),
            BillingError::Provider { status, .. } if *status >= 500 => {
                RetryVerdict::after(MEDIUM_DELAY)
            }
            _ => RetryVerdict::terminal(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(error: &BillingError) -> RetryVerdict {
        ProviderErrorClassifier.classify(error)
    }

    #[test]
    fn timeout_is_retryable_with_short_delay() {
        let verdict = classify(&BillingError::Timeout {
            elapsed: Duration::from_secs(5),
        });
        assert!(verdict.retryable);
        assert_eq!(verdict.delay, SHORT_DELAY);
    }

    #[test]
    fn network_failure_is_retryable() {
        let verdict = classify(&BillingError::transport("connection reset"));
        assert!(verdict.retryable);
        assert_eq!(verdict.delay, SHORT_DELAY);
    }

    #[test]
    fn rate_limit_backs_off_longer_than_server_errors() {
        let rate_limited = classify(&BillingError::provider(429, "rate limited"));
        let server_error = classify(&BillingError::provider(503, "unavailable"));

        assert!(rate_limited.retryable);
        assert!(server_error.retryable);
        assert!(rate_limited.delay > server_error.delay);
    }

    #[test]
    fn client_errors_are_terminal() {
        assert!(!classify(&BillingError::provider(404, "not found")).retryable);
        assert!(!classify(&BillingError::provider(400, "bad request")).retryable);
        assert!(!classify(&BillingError::provider(402, "card declined")).retryable);
    }

    #[test]
    fn unclassified_errors_fail_closed() {
        assert!(!classify(&BillingError::validation("bad amount")).retryable);
        assert!(!classify(&BillingError::state("no items")).retryable);
        assert!(!classify(&BillingError::configuration("bad key")).retryable);
        assert!(
            !classify(&BillingError::CircuitOpen {
                group: "stripe".to_string(),
                retry_after: Duration::from_secs(15),
            })
            .retryable
        );
    }
}
