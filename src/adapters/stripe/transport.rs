//! HTTP transport for the provider API.
//!
//! Issues single calls with bounded timeout, cancellation, and
//! idempotency-key injection, and normalizes every failure into the
//! `BillingError` taxonomy. Silent defaulting is the single most
//! dangerous failure mode for a billing client: an unparsable response
//! must never look like "success with no data".

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::warn;

use crate::config::{GatewayConfig, MIN_REQUEST_TIMEOUT};
use crate::domain::billing::{BillingError, IdempotencyKey};
use crate::ports::{HttpMethod, NoOpRequestContext, ProviderRequest, ProviderTransport, RequestContext};

/// Reqwest-backed transport.
pub struct HttpTransport {
    config: GatewayConfig,
    client: reqwest::Client,
    context: Arc<dyn RequestContext>,
}

impl HttpTransport {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            context: Arc::new(NoOpRequestContext),
        }
    }

    /// Inject the ambient request context used for correlation ids.
    pub fn with_context(mut self, context: Arc<dyn RequestContext>) -> Self {
        self.context = context;
        self
    }
}

#[async_trait]
impl ProviderTransport for HttpTransport {
    async fn request(&self, request: ProviderRequest) -> Result<serde_json::Value, BillingError> {
        // Floor of 1s regardless of the caller-supplied ceiling.
        let deadline = request
            .timeout
            .unwrap_or_else(|| self.config.request_timeout())
            .max(MIN_REQUEST_TIMEOUT);

        let url = format!("{}{}", self.config.api_base_url(), request.path);
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&url).query(&request.params),
            HttpMethod::Post => self.client.post(&url).form(&request.params),
            HttpMethod::Delete => self.client.delete(&url).form(&request.params),
        };

        builder = builder.basic_auth(self.config.api_key().expose_secret(), Option::<&str>::None);

        if request.method.is_mutating() {
            let key = request
                .idempotency_key
                .clone()
                .unwrap_or_else(IdempotencyKey::random);
            builder = builder.header("Idempotency-Key", key.as_str());
        }

        let correlation_id = self
            .context
            .correlation_id()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        builder = builder.header("X-Request-Id", &correlation_id);

        let started = Instant::now();
        let exchange = async {
            let response = builder.send().await.map_err(map_reqwest_error)?;
            let status = response.status().as_u16();
            let body = response.text().await.map_err(map_reqwest_error)?;
            decode_body(status, &body)
        };

        match tokio::time::timeout(deadline, exchange).await {
            Ok(result) => result,
            Err(_) => {
                // The in-flight call is dropped (cancelled) here.
                warn!(
                    path = %request.path,
                    correlation_id = %correlation_id,
                    deadline_ms = deadline.as_millis() as u64,
                    "provider call timed out"
                );
                Err(BillingError::Timeout {
                    elapsed: started.elapsed(),
                })
            }
        }
    }
}

fn map_reqwest_error(error: reqwest::Error) -> BillingError {
    if error.is_timeout() {
        BillingError::Timeout {
            elapsed: std::time::Duration::ZERO,
        }
    } else {
        BillingError::transport(error.to_string())
    }
}

/// Structured error body: `{"error": {"message", "code", "param"}}`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    param: Option<String>,
}

/// Decode a provider response into JSON or a typed error.
pub(crate) fn decode_body(status: u16, body: &str) -> Result<serde_json::Value, BillingError> {
    if (200..300).contains(&status) {
        return serde_json::from_str(body).map_err(|e| {
            BillingError::transport(format!("success response was not valid JSON: {}", e))
        });
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => Err(BillingError::Provider {
            status,
            code: parsed.error.code,
            param: parsed.error.param,
            message: parsed
                .error
                .message
                .unwrap_or_else(|| format!("provider returned status {}", status)),
        }),
        Err(_) => Err(BillingError::Provider {
            status,
            code: None,
            param: None,
            message: format!("non-JSON error response ({} bytes)", body.len()),
        }),
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_body_decodes() {
        let value = decode_body(200, r#"{"id":"cus_1"}"#).unwrap();
        assert_eq!(value["id"], "cus_1");
    }

    #[test]
    fn success_with_unparsable_body_is_an_error_not_a_default() {
        let result = decode_body(200, "<html>oops</html>");
        assert!(matches!(result, Err(BillingError::Transport(_))));
    }

    #[test]
    fn structured_error_body_carries_code_and_param() {
        let body = r#"{"error":{"message":"No such customer: 'cus_1'","code":"resource_missing","param":"customer"}}"#;
        let err = decode_body(404, body).unwrap_err();
        match err {
            BillingError::Provider {
                status,
                code,
                param,
                message,
            } => {
                assert_eq!(status, 404);
                assert_eq!(code.as_deref(), Some("resource_missing"));
                assert_eq!(param.as_deref(), Some("customer"));
                assert!(message.contains("No such customer"));
            }
            other => panic!("expected Provider error, got {:?}", other),
        }
    }

    #[test]
    fn non_json_error_body_keeps_status_and_is_distinct() {
        let err = decode_body(502, "Bad Gateway").unwrap_err();
        match err {
            BillingError::Provider {
                status,
                code,
                message,
                ..
            } => {
                assert_eq!(status, 502);
                assert_eq!(code, None);
                assert!(message.contains("non-JSON error response"));
            }
            other => panic!("expected Provider error, got {:?}", other),
        }
    }

    #[test]
    fn error_body_without_message_gets_status_text() {
        let err = decode_body(429, r#"{"error":{"code":"rate_limited"}}"#).unwrap_err();
        match err {
            BillingError::Provider {
                status, message, ..
            } => {
                assert_eq!(status, 429);
                assert!(message.contains("429"));
            }
            other => panic!("expected Provider error, got {:?}", other),
        }
    }
}
