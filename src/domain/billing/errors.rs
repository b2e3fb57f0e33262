//! Billing error taxonomy.
//!
//! Every operation exposed by the gateway returns one of these variants;
//! raw transport exceptions never reach callers. Classification into
//! retryable/terminal lives in `resilience::classifier` so providers can
//! plug their own policy.

use std::time::Duration;

use thiserror::Error;

/// Errors from billing gateway operations.
#[derive(Debug, Clone, Error)]
pub enum BillingError {
    /// Invalid gateway construction arguments. Fatal, never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Caller-supplied arguments fail business constraints.
    /// Raised before any network call; never retried.
    #[error("validation error: {0}")]
    Validation(String),

    /// Network-level failure (connection reset, DNS, unparsable body).
    #[error("transport error: {0}")]
    Transport(String),

    /// The in-flight call was cancelled after exceeding its deadline.
    #[error("provider call timed out after {elapsed:?}")]
    Timeout { elapsed: Duration },

    /// Structured non-2xx response from the provider.
    #[error("provider error (status {status}): {message}")]
    Provider {
        status: u16,
        /// Provider's machine-readable error code, if exposed.
        code: Option<String>,
        /// Request parameter the error refers to, if exposed.
        param: Option<String>,
        message: String,
    },

    /// Circuit breaker is open; no network call was attempted.
    /// Retryable at a higher time scale - callers should back off further.
    #[error("circuit open for {group}; retry after {retry_after:?}")]
    CircuitOpen { group: String, retry_after: Duration },

    /// Provider-side resource is in an unexpected shape. Terminal;
    /// indicates data inconsistency, not transient failure.
    #[error("inconsistent provider state: {0}")]
    State(String),
}

impl BillingError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn state(message: impl Into<String>) -> Self {
        Self::State(message.into())
    }

    /// Provider error without structured code/param.
    pub fn provider(status: u16, message: impl Into<String>) -> Self {
        Self::Provider {
            status,
            code: None,
            param: None,
            message: message.into(),
        }
    }

    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Provider { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether this error says the referenced customer no longer exists
    /// on the provider side (stale mapping).
    ///
    /// Matches the structured error code first; falls back to a message
    /// substring for providers that do not expose structured codes.
    pub fn is_customer_missing(&self) -> bool {
        match self {
            Self::Provider {
                code,
                param,
                message,
                ..
            } => {
                let structured = code.as_deref() == Some("resource_missing")
                    && param.as_deref() == Some("customer");
                structured || message.contains("No such customer")
            }
            _ => false,
        }
    }
}
