//! Configuration error types.

use thiserror::Error;

use crate::domain::billing::BillingError;

/// Errors from configuration validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("invalid provider API key format")]
    InvalidApiKey,

    #[error("invalid API base URL format")]
    InvalidBaseUrl,

    #[error("invalid request timeout")]
    InvalidTimeout,
}

impl From<ValidationError> for BillingError {
    fn from(err: ValidationError) -> Self {
        BillingError::configuration(err.to_string())
    }
}
