//! Transport port - a single HTTP call to the payment provider.
//!
//! The transport owns timeout enforcement, cancellation, idempotency-key
//! injection, and normalization of transport/parse failures into
//! `BillingError`. Retry and circuit breaking live above it.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::billing::{BillingError, IdempotencyKey};

/// HTTP method for a provider call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
}

impl HttpMethod {
    /// Whether this method mutates provider state and therefore carries
    /// an idempotency key.
    pub fn is_mutating(&self) -> bool {
        !matches!(self, HttpMethod::Get)
    }
}

/// A single outbound provider request.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub method: HttpMethod,

    /// Path relative to the API base URL (e.g. `/v1/customers`).
    pub path: String,

    /// Form-encoded parameters (query parameters for GET).
    pub params: Vec<(String, String)>,

    /// Idempotency key; generated by the transport for mutating calls
    /// when absent.
    pub idempotency_key: Option<IdempotencyKey>,

    /// Per-call timeout ceiling; the transport's floor still applies.
    pub timeout: Option<Duration>,
}

impl ProviderRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: Vec::new(),
            idempotency_key: None,
            timeout: None,
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl AsRef<str>) -> Self {
        self.params.push((key.into(), value.as_ref().to_string()));
        self
    }

    pub fn params(mut self, params: impl IntoIterator<Item = (String, String)>) -> Self {
        self.params.extend(params);
        self
    }

    pub fn idempotency_key(mut self, key: IdempotencyKey) -> Self {
        self.idempotency_key = Some(key);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Look up a parameter value (used by tests and compensating logic).
    pub fn param_value(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Port for issuing single provider calls.
#[async_trait]
pub trait ProviderTransport: Send + Sync {
    /// Issue one call and decode the JSON response.
    ///
    /// Never silently returns empty data: timeouts surface as
    /// `BillingError::Timeout`, non-2xx responses as
    /// `BillingError::Provider`, and unparsable bodies as errors.
    async fn request(&self, request: ProviderRequest) -> Result<serde_json::Value, BillingError>;
}
