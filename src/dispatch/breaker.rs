//! Per-process circuit breaker.
//!
//! The breaker counts consecutive failed dispatches. Once the count reaches the
//! threshold the circuit opens and calls are rejected without touching the
//! network. After the cool-down the next call closes the circuit outright and
//! proceeds as a normal attempt; there is no half-open probe quota.

use super::config::CircuitBreakerConfig;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Externally visible circuit position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CircuitState {
    Closed,
    Open,
}

/// Decision for an incoming dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    /// Circuit is open; the cool-down ends after `retry_after`
    Rejected { retry_after: Duration },
}

#[derive(Debug, Clone, Copy)]
struct OpenedAt {
    instant: Instant,
    wall: DateTime<Utc>,
}

/// `opened` is `Some` exactly while the circuit is open.
#[derive(Debug, Default)]
struct BreakerState {
    failure_count: u32,
    opened: Option<OpenedAt>,
}

/// Point-in-time view for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub enabled: bool,
    pub state: CircuitState,
    pub failure_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opened_at: Option<DateTime<Utc>>,
}

/// Circuit breaker owned by a dispatch client and shared via `Arc`.
///
/// The lock is never held across an await point.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    /// Create a closed breaker.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        metrics::gauge!("relay_circuit_open").set(0.0);
        Self {
            config,
            state: Mutex::new(BreakerState::default()),
        }
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Decide whether a dispatch may proceed now.
    pub fn admit(&self) -> Admission {
        self.admit_at(Instant::now())
    }

    /// Decide whether a dispatch may proceed at `now`.
    ///
    /// An expired cool-down closes the circuit and resets the failure count.
    pub fn admit_at(&self, now: Instant) -> Admission {
        if !self.config.enabled {
            return Admission::Allowed;
        }

        let mut state = self.lock();
        let Some(opened) = state.opened else {
            return Admission::Allowed;
        };

        let cooldown = self.config.cooldown();
        let elapsed = now.saturating_duration_since(opened.instant);
        if elapsed < cooldown {
            return Admission::Rejected {
                retry_after: cooldown - elapsed,
            };
        }

        state.opened = None;
        state.failure_count = 0;
        metrics::gauge!("relay_circuit_open").set(0.0);
        tracing::info!(
            open_seconds = elapsed.as_secs(),
            "Circuit breaker cool-down elapsed, closing circuit"
        );
        Admission::Allowed
    }

    /// Record a successful dispatch: reset the count and close if open.
    pub fn record_success(&self) {
        let mut state = self.lock();
        state.failure_count = 0;
        if state.opened.take().is_some() {
            metrics::gauge!("relay_circuit_open").set(0.0);
            tracing::info!("Circuit breaker closed after successful dispatch");
        }
    }

    /// Record a dispatch whose whole retry budget failed.
    pub fn record_failure(&self) {
        self.record_failure_at(Instant::now());
    }

    /// Record a failed dispatch at `now`, opening the circuit at the threshold.
    pub fn record_failure_at(&self, now: Instant) {
        if !self.config.enabled {
            return;
        }

        let mut state = self.lock();
        state.failure_count = state.failure_count.saturating_add(1);

        if state.opened.is_none() && state.failure_count >= self.config.failure_threshold {
            state.opened = Some(OpenedAt {
                instant: now,
                wall: Utc::now(),
            });
            metrics::gauge!("relay_circuit_open").set(1.0);
            tracing::warn!(
                failure_count = state.failure_count,
                cooldown_seconds = self.config.timeout_seconds,
                "Circuit breaker opened"
            );
        } else {
            tracing::debug!(
                failure_count = state.failure_count,
                threshold = self.config.failure_threshold,
                "Circuit breaker failure recorded"
            );
        }
    }

    pub fn is_open(&self) -> bool {
        self.lock().opened.is_some()
    }

    pub fn failure_count(&self) -> u32 {
        self.lock().failure_count
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let state = self.lock();
        BreakerSnapshot {
            enabled: self.config.enabled,
            state: if state.opened.is_some() {
                CircuitState::Open
            } else {
                CircuitState::Closed
            },
            failure_count: state.failure_count,
            opened_at: state.opened.map(|o| o.wall),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(threshold: u32, timeout_seconds: u64) -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig {
            enabled: true,
            failure_threshold: threshold,
            timeout_seconds,
        })
    }

    #[test]
    fn test_new_breaker_is_closed() {
        let b = breaker(3, 60);
        assert!(!b.is_open());
        assert_eq!(b.failure_count(), 0);
        assert_eq!(b.admit(), Admission::Allowed);
        assert!(b.snapshot().opened_at.is_none());
    }

    #[test]
    fn test_opens_at_threshold() {
        let b = breaker(3, 60);
        b.record_failure();
        b.record_failure();
        assert!(!b.is_open());
        b.record_failure();
        assert!(b.is_open());

        let snapshot = b.snapshot();
        assert_eq!(snapshot.state, CircuitState::Open);
        assert_eq!(snapshot.failure_count, 3);
        assert!(snapshot.opened_at.is_some());
    }

    #[test]
    fn test_rejects_during_cooldown_then_closes() {
        let b = breaker(3, 60);
        let opened = Instant::now();
        for _ in 0..3 {
            b.record_failure_at(opened);
        }

        match b.admit_at(opened + Duration::from_secs(10)) {
            Admission::Rejected { retry_after } => {
                assert_eq!(retry_after, Duration::from_secs(50))
            }
            Admission::Allowed => panic!("expected rejection during cool-down"),
        }
        assert!(b.is_open());

        assert_eq!(
            b.admit_at(opened + Duration::from_secs(70)),
            Admission::Allowed
        );
        assert!(!b.is_open());
        assert_eq!(b.failure_count(), 0);
    }

    #[test]
    fn test_reopen_needs_full_threshold_after_close() {
        let b = breaker(3, 60);
        let opened = Instant::now();
        for _ in 0..3 {
            b.record_failure_at(opened);
        }
        let later = opened + Duration::from_secs(61);
        assert_eq!(b.admit_at(later), Admission::Allowed);

        b.record_failure_at(later);
        b.record_failure_at(later);
        assert!(!b.is_open());
        b.record_failure_at(later);
        assert!(b.is_open());
    }

    #[test]
    fn test_success_resets_count() {
        let b = breaker(3, 60);
        b.record_failure();
        b.record_failure();
        b.record_success();
        assert_eq!(b.failure_count(), 0);

        b.record_failure();
        b.record_failure();
        assert!(!b.is_open());
        b.record_failure();
        assert!(b.is_open());
    }

    #[test]
    fn test_success_closes_open_circuit() {
        let b = breaker(1, 60);
        b.record_failure();
        assert!(b.is_open());

        b.record_success();
        assert!(!b.is_open());
        assert!(b.snapshot().opened_at.is_none());
    }

    #[test]
    fn test_disabled_breaker_never_opens() {
        let b = CircuitBreaker::new(CircuitBreakerConfig {
            enabled: false,
            failure_threshold: 1,
            timeout_seconds: 60,
        });
        for _ in 0..5 {
            b.record_failure();
        }
        assert!(!b.is_open());
        assert_eq!(b.admit(), Admission::Allowed);
        assert!(!b.snapshot().enabled);
    }
}
