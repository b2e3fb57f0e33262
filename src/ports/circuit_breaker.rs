//! CircuitBreaker port - external service resilience.
//!
//! The circuit breaker prevents cascading failures when the payment
//! provider becomes unavailable or slow. Its scope is a logical operation
//! group (the provider's API as a whole), not individual endpoints, so a
//! provider-wide outage trips once rather than per call-site.
//!
//! ## States
//!
//! - **Closed**: normal operation, requests flow through
//! - **Open**: too many failures, requests rejected immediately
//! - **Half-Open**: testing recovery, exactly one trial call allowed
//!
//! ## Transitions
//!
//! ```text
//! Closed --[failure_threshold reached]--> Open
//! Open --[recovery_timeout elapsed]--> Half-Open
//! Half-Open --[trial success]--> Closed
//! Half-Open --[trial failure]--> Open
//! ```

use std::time::Duration;

/// Circuit breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation - requests flow through to the provider.
    Closed,

    /// Too many failures - requests rejected immediately without a
    /// network call, until recovery_timeout elapses.
    Open,

    /// Testing recovery - one trial request allowed through.
    /// Success -> Closed, failure -> Open.
    HalfOpen,
}

impl CircuitState {
    /// Check whether the circuit allows requests through.
    pub fn allows_requests(&self) -> bool {
        matches!(self, CircuitState::Closed | CircuitState::HalfOpen)
    }
}

/// Configuration for circuit breaker behavior.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens.
    ///
    /// Default: 5 failures
    pub failure_threshold: u32,

    /// Time to wait before admitting a trial call (moving to half-open).
    ///
    /// Default: 30 seconds
    pub recovery_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
        }
    }
}

impl CircuitBreakerConfig {
    /// Config tuned for payment providers: trip quickly, probe quickly.
    pub fn for_payment_provider() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(15),
        }
    }
}

/// Port for circuit breaker functionality.
///
/// State may be process-local; it must be visible to every call path
/// sharing its operation-group key within one process.
pub trait CircuitBreaker: Send + Sync {
    /// Current state of the circuit.
    fn state(&self) -> CircuitState;

    /// Check whether a request should be allowed through.
    ///
    /// Returns `true` in closed state, or when an open circuit's
    /// recovery timeout has elapsed and this caller wins the single
    /// half-open trial slot. Returns `false` otherwise.
    fn should_allow(&self) -> bool;

    /// Record a successful request. Resets the circuit to closed and
    /// zeroes the failure counter.
    fn record_success(&self);

    /// Record a failed request.
    ///
    /// In closed state this counts toward the failure threshold; in
    /// half-open state it immediately reopens the circuit.
    fn record_failure(&self);

    /// Force the circuit back to closed. Administrative use only.
    fn reset(&self);

    /// Snapshot of breaker counters.
    fn metrics(&self) -> CircuitBreakerMetrics;
}

/// Metrics about circuit breaker behavior.
#[derive(Debug, Clone, Default)]
pub struct CircuitBreakerMetrics {
    /// Current state.
    pub state: Option<CircuitState>,

    /// Consecutive failures observed in closed state.
    pub consecutive_failures: u32,

    /// Times the circuit has opened since creation.
    pub times_opened: u64,

    /// Time until the circuit admits a trial call (when open).
    pub time_until_half_open: Option<Duration>,
}
