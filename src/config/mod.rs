//! Gateway configuration.

mod error;

pub use error::ValidationError;

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

/// Minimum timeout enforced for any provider call.
pub const MIN_REQUEST_TIMEOUT: Duration = Duration::from_secs(1);

/// Billing-provider gateway configuration.
///
/// Deserializable from configuration files; every field except the API
/// key falls back to the production default. Deserialized values still
/// go through `validate()` at gateway construction.
#[derive(Clone, Deserialize)]
pub struct GatewayConfig {
    /// Provider secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Base URL for the provider API.
    #[serde(default = "default_api_base_url")]
    api_base_url: String,

    /// Default per-call timeout ceiling.
    #[serde(default = "default_request_timeout")]
    request_timeout: Duration,

    /// TTL for the customer-creation distributed lock.
    #[serde(default = "default_lock_ttl")]
    lock_ttl: Duration,

    /// Bounded retries while waiting on a contended lock.
    #[serde(default = "default_lock_retry_attempts")]
    lock_retry_attempts: u32,

    /// Wait between lock retries.
    #[serde(default = "default_lock_retry_interval")]
    lock_retry_interval: Duration,
}

fn default_api_base_url() -> String {
    "https://api.stripe.com".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_lock_ttl() -> Duration {
    Duration::from_secs(30)
}

fn default_lock_retry_attempts() -> u32 {
    5
}

fn default_lock_retry_interval() -> Duration {
    Duration::from_millis(200)
}

impl GatewayConfig {
    /// Create a new configuration with production defaults.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            api_base_url: default_api_base_url(),
            request_timeout: default_request_timeout(),
            lock_ttl: default_lock_ttl(),
            lock_retry_attempts: default_lock_retry_attempts(),
            lock_retry_interval: default_lock_retry_interval(),
        }
    }

    /// Create configuration from environment variables.
    ///
    /// Reads:
    /// - `BILLING_API_KEY`
    /// - `BILLING_API_BASE_URL` (optional)
    pub fn from_env() -> Result<Self, std::env::VarError> {
        let api_key = std::env::var("BILLING_API_KEY")?;
        let mut config = Self::new(api_key);
        if let Ok(url) = std::env::var("BILLING_API_BASE_URL") {
            config.api_base_url = url;
        }
        Ok(config)
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Set the default per-call timeout ceiling.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the customer-creation lock TTL.
    pub fn with_lock_ttl(mut self, ttl: Duration) -> Self {
        self.lock_ttl = ttl;
        self
    }

    /// Set the bounded lock-contention wait loop parameters.
    pub fn with_lock_retries(mut self, attempts: u32, interval: Duration) -> Self {
        self.lock_retry_attempts = attempts;
        self.lock_retry_interval = interval;
        self
    }

    /// Check if using provider test mode.
    pub fn is_test_mode(&self) -> bool {
        self.api_key.expose_secret().starts_with("sk_test_")
    }

    /// Check if using provider live mode.
    pub fn is_live_mode(&self) -> bool {
        self.api_key.expose_secret().starts_with("sk_live_")
    }

    /// Validate the configuration. Fatal at construction; never retried.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let key = self.api_key.expose_secret();
        if key.is_empty() {
            return Err(ValidationError::MissingRequired("BILLING_API_KEY"));
        }
        if !key.starts_with("sk_") {
            return Err(ValidationError::InvalidApiKey);
        }
        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://") {
            return Err(ValidationError::InvalidBaseUrl);
        }
        if self.request_timeout < MIN_REQUEST_TIMEOUT {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }

    pub(crate) fn api_key(&self) -> &SecretString {
        &self.api_key
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn lock_ttl(&self) -> Duration {
        self.lock_ttl
    }

    pub fn lock_retry_attempts(&self) -> u32 {
        self.lock_retry_attempts
    }

    pub fn lock_retry_interval(&self) -> Duration {
        self.lock_retry_interval
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("api_base_url", &self.api_base_url)
            .field("request_timeout", &self.request_timeout)
            .field("lock_ttl", &self.lock_ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_sets_defaults() {
        let config = GatewayConfig::new("sk_test_abc");
        assert_eq!(config.api_base_url(), "https://api.stripe.com");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_and_live_mode() {
        assert!(GatewayConfig::new("sk_test_abc").is_test_mode());
        assert!(!GatewayConfig::new("sk_test_abc").is_live_mode());
        assert!(GatewayConfig::new("sk_live_abc").is_live_mode());
    }

    #[test]
    fn validation_rejects_empty_key() {
        let config = GatewayConfig::new("");
        assert!(matches!(
            config.validate(),
            Err(ValidationError::MissingRequired(_))
        ));
    }

    #[test]
    fn validation_rejects_wrong_key_prefix() {
        let config = GatewayConfig::new("pk_test_abc");
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidApiKey)
        ));
    }

    #[test]
    fn validation_rejects_non_http_base_url() {
        let config = GatewayConfig::new("sk_test_abc").with_base_url("ftp://example.com");
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidBaseUrl)
        ));
    }

    #[test]
    fn validation_rejects_sub_floor_timeout() {
        let config =
            GatewayConfig::new("sk_test_abc").with_request_timeout(Duration::from_millis(100));
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidTimeout)
        ));
    }

    #[test]
    fn deserializes_with_defaults_for_omitted_fields() {
        let config: GatewayConfig =
            serde_json::from_str(r#"{"api_key": "sk_test_abc"}"#).unwrap();

        assert_eq!(config.api_base_url(), "https://api.stripe.com");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.lock_retry_attempts(), 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn debug_does_not_leak_api_key() {
        let config = GatewayConfig::new("sk_live_supersecret");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("supersecret"));
    }
}
