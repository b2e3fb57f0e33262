//! Adapters - implementations of the ports.

pub mod memory;
pub mod redis;
pub mod stripe;
