//! Scripted transport for testing the gateway without a network.
//!
//! Responses are consumed in FIFO order; every request is recorded for
//! assertions on parameters and idempotency keys.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::billing::BillingError;
use crate::ports::{ProviderRequest, ProviderTransport};

/// Transport that replays a script of canned responses.
///
/// # Example
///
/// ```ignore
/// let transport = ScriptedTransport::new();
/// transport.push_ok(json!({"id": "cus_1"}));
/// transport.push_err(BillingError::provider(429, "rate limited"));
///
/// // ... run the code under test ...
///
/// assert_eq!(transport.call_count(), 2);
/// ```
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<serde_json::Value, BillingError>>>,
    calls: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful JSON response.
    pub fn push_ok(&self, value: serde_json::Value) {
        self.responses.lock().unwrap().push_back(Ok(value));
    }

    /// Queue an error response.
    pub fn push_err(&self, error: BillingError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// All requests observed so far.
    pub fn calls(&self) -> Vec<ProviderRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ProviderTransport for ScriptedTransport {
    async fn request(&self, request: ProviderRequest) -> Result<serde_json::Value, BillingError> {
        self.calls.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(BillingError::state(
                    "scripted transport has no response queued",
                ))
            })
    }
}
