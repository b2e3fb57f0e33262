//! Resilience - retry with error classification and circuit breaking.
//!
//! Control flow for a billing operation:
//! breaker check -> retry wrapper -> transport call -> provider API.

mod breaker;
mod classifier;
mod retry;

pub use breaker::ProviderCircuitBreaker;
pub use classifier::{ErrorClassifier, ProviderErrorClassifier, RetryVerdict};
pub use retry::{backoff_delay, retry_with_classifier, RetryPolicy};
