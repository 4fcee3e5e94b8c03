//! Configuration for the circuit breaker.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Circuit breaker toggles. Read once at process start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Whether the breaker guards outbound calls at all
    pub enabled: bool,
    /// Consecutive failed dispatches before the circuit opens
    pub failure_threshold: u32,
    /// Seconds the circuit stays open before the next call is let through
    pub timeout_seconds: u64,
}

impl CircuitBreakerConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_threshold: 5,
            timeout_seconds: 60,
        }
    }
}
