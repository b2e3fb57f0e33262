//! Billing Gateway - resilient payment-provider integration.
//!
//! This crate mediates between application code and a third-party payment
//! provider's REST API under concurrent, unreliable, partially-failing
//! conditions. Mutating operations carry deterministic idempotency keys so
//! that retries, crashes, and duplicate requests collapse to a single
//! real-world effect.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod resilience;
