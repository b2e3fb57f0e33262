//! Process-local circuit breaker implementation.
//!
//! Tracks consecutive failures for a named operation group and
//! short-circuits calls once the threshold is crossed, recovering
//! through a single half-open trial call.

use std::sync::Mutex;
use std::time::Instant;

use tracing::{info, warn};

use crate::ports::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerMetrics, CircuitState};

/// Circuit breaker for one provider operation group.
pub struct ProviderCircuitBreaker {
    group: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerState>,
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    times_opened: u64,
    /// Whether the single half-open trial slot is taken.
    trial_in_flight: bool,
    /// When the in-flight trial was admitted. A trial whose outcome never
    /// arrives (the caller's future was dropped mid-call) expires after
    /// the recovery timeout so the slot cannot be held forever.
    trial_started_at: Option<Instant>,
}

impl ProviderCircuitBreaker {
    pub fn new(group: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            group: group.into(),
            config,
            inner: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                times_opened: 0,
                trial_in_flight: false,
                trial_started_at: None,
            }),
        }
    }

    /// Operation group this breaker guards.
    pub fn group(&self) -> &str {
        &self.group
    }

    fn open(&self, inner: &mut BreakerState) {
        inner.state = CircuitState::Open;
        inner.opened_at = Some(Instant::now());
        inner.times_opened += 1;
        inner.trial_in_flight = false;
        inner.trial_started_at = None;
        warn!(
            group = %self.group,
            consecutive_failures = inner.consecutive_failures,
            "circuit opened"
        );
    }
}

impl CircuitBreaker for ProviderCircuitBreaker {
    fn state(&self) -> CircuitState {
        self.inner.lock().unwrap().state
    }

    fn should_allow(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|at| at.elapsed())
                    .unwrap_or(self.config.recovery_timeout);
                if elapsed >= self.config.recovery_timeout {
                    inner.state = CircuitState::HalfOpen;
                    inner.trial_in_flight = true;
                    inner.trial_started_at = Some(Instant::now());
                    info!(group = %self.group, "circuit half-open, admitting trial call");
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => {
                // One trial at a time, but an abandoned trial (no outcome
                // recorded within the recovery timeout) forfeits its slot.
                let trial_expired = inner
                    .trial_started_at
                    .map(|at| at.elapsed() >= self.config.recovery_timeout)
                    .unwrap_or(true);
                if inner.trial_in_flight && !trial_expired {
                    false
                } else {
                    if inner.trial_in_flight {
                        warn!(
                            group = %self.group,
                            "half-open trial abandoned, admitting a new trial call"
                        );
                    }
                    inner.trial_in_flight = true;
                    inner.trial_started_at = Some(Instant::now());
                    true
                }
            }
        }
    }

    fn record_success(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.state != CircuitState::Closed {
            info!(group = %self.group, "circuit closed after successful trial");
        }
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
        inner.trial_in_flight = false;
        inner.trial_started_at = None;
    }

    fn record_failure(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
        match inner.state {
            CircuitState::HalfOpen => self.open(&mut inner),
            CircuitState::Closed => {
                if inner.consecutive_failures >= self.config.failure_threshold {
                    self.open(&mut inner);
                }
            }
            CircuitState::Open => {}
        }
    }

    fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
        inner.trial_in_flight = false;
        inner.trial_started_at = None;
    }

    fn metrics(&self) -> CircuitBreakerMetrics {
        let inner = self.inner.lock().unwrap();
        let time_until_half_open = match (inner.state, inner.opened_at) {
            (CircuitState::Open, Some(at)) => Some(
                self.config
                    .recovery_timeout
                    .saturating_sub(at.elapsed()),
            ),
            _ => None,
        };
        CircuitBreakerMetrics {
            state: Some(inner.state),
            consecutive_failures: inner.consecutive_failures,
            times_opened: inner.times_opened,
            time_until_half_open,
        }
    }
}

impl std::fmt::Debug for ProviderCircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderCircuitBreaker")
            .field("group", &self.group)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn breaker(threshold: u32, recovery: Duration) -> ProviderCircuitBreaker {
        ProviderCircuitBreaker::new(
            "stripe",
            CircuitBreakerConfig {
                failure_threshold: threshold,
                recovery_timeout: recovery,
            },
        )
    }

    #[test]
    fn three_consecutive_failures_open_the_circuit() {
        let cb = breaker(3, Duration::from_secs(30));

        assert_eq!(cb.state(), CircuitState::Closed);
        cb.record_failure();
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Closed);
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);

        // Rejected without a network call.
        assert!(!cb.should_allow());
    }

    #[test]
    fn success_in_closed_state_resets_failure_count() {
        let cb = breaker(3, Duration::from_secs(30));

        cb.record_failure();
        cb.record_failure();
        cb.record_success();
        cb.record_failure();
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn recovery_timeout_admits_exactly_one_trial() {
        let cb = breaker(1, Duration::from_millis(20));

        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.should_allow());

        std::thread::sleep(Duration::from_millis(30));

        // First caller after the timeout wins the trial slot.
        assert!(cb.should_allow());
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        // Concurrent caller is still rejected.
        assert!(!cb.should_allow());
    }

    #[test]
    fn trial_success_closes_and_resets() {
        let cb = breaker(2, Duration::from_millis(10));

        cb.record_failure();
        cb.record_failure();
        std::thread::sleep(Duration::from_millis(15));
        assert!(cb.should_allow());

        cb.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.metrics().consecutive_failures, 0);
        assert!(cb.should_allow());
    }

    #[test]
    fn abandoned_trial_forfeits_its_slot() {
        let cb = breaker(1, Duration::from_millis(20));

        cb.record_failure();
        std::thread::sleep(Duration::from_millis(25));

        // Trial admitted, but the caller never records an outcome
        // (its future was dropped mid-call).
        assert!(cb.should_allow());
        assert!(!cb.should_allow());

        std::thread::sleep(Duration::from_millis(25));

        // The stale trial expires; the next caller gets the slot and the
        // breaker can still recover.
        assert!(cb.should_allow());
        cb.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn trial_failure_reopens_with_fresh_timer() {
        let cb = breaker(1, Duration::from_millis(20));

        cb.record_failure();
        std::thread::sleep(Duration::from_millis(25));
        assert!(cb.should_allow());

        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        // Freshly reopened: still inside the new recovery window.
        assert!(!cb.should_allow());
    }

    #[test]
    fn metrics_track_openings() {
        let cb = breaker(1, Duration::from_secs(30));
        cb.record_failure();

        let metrics = cb.metrics();
        assert_eq!(metrics.state, Some(CircuitState::Open));
        assert_eq!(metrics.times_opened, 1);
        assert!(metrics.time_until_half_open.is_some());
    }

    #[test]
    fn reset_forces_closed() {
        let cb = breaker(1, Duration::from_secs(30));
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);

        cb.reset();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.should_allow());
    }
}
