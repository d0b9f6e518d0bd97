//! Per-destination circuit breaker (closed / open / half-open).

use std::time::{Duration, Instant};

use careline_config::CircuitBreakerConfig;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Observable circuit state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

struct Inner {
    state: CircuitState,
    failure_count: u32,
    opened_at: Option<Instant>,
}

/// Tracks consecutive failures for one logical destination (the hospital
/// backend, the LLM provider) and opens the circuit once a threshold is
/// crossed, refusing calls until a recovery timeout elapses.
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    #[must_use]
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                failure_count: 0,
                opened_at: None,
            }),
        }
    }

    /// Whether a call may currently proceed. Transitions `Open` →
    /// `HalfOpen` as a side effect once the recovery timeout has elapsed.
    pub async fn allow_call(&self) -> bool {
        let mut inner = self.inner.lock().await;
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|t| t.elapsed())
                    .unwrap_or(Duration::MAX);
                if elapsed >= Duration::from_secs(self.config.recovery_timeout_secs) {
                    info!(destination = %self.name, "circuit half-open; allowing a trial call");
                    inner.state = CircuitState::HalfOpen;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Record a successful call: closes the circuit and resets the
    /// failure counter.
    pub async fn record_success(&self) {
        let mut inner = self.inner.lock().await;
        if inner.state != CircuitState::Closed {
            info!(destination = %self.name, "circuit closed after successful call");
        }
        inner.state = CircuitState::Closed;
        inner.failure_count = 0;
        inner.opened_at = None;
    }

    /// Record a failed call: opens the circuit once `failure_threshold`
    /// consecutive failures accumulate, or immediately re-opens from
    /// half-open.
    pub async fn record_failure(&self) {
        let mut inner = self.inner.lock().await;
        match inner.state {
            CircuitState::HalfOpen => {
                warn!(destination = %self.name, "trial call failed; re-opening circuit");
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
            }
            CircuitState::Closed | CircuitState::Open => {
                inner.failure_count = inner.failure_count.saturating_add(1);
                if inner.failure_count >= self.config.failure_threshold {
                    if inner.state != CircuitState::Open {
                        warn!(
                            destination = %self.name,
                            failures = inner.failure_count,
                            "circuit opened"
                        );
                    }
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                }
            }
        }
    }

    #[must_use]
    pub async fn state(&self) -> CircuitState {
        self.inner.lock().await.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(threshold: u32) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: threshold,
            recovery_timeout_secs: 60,
        }
    }

    #[tokio::test]
    async fn opens_after_threshold_failures() {
        let breaker = CircuitBreaker::new("backend", config(2));
        assert!(breaker.allow_call().await);
        breaker.record_failure().await;
        assert_eq!(breaker.state().await, CircuitState::Closed);
        breaker.record_failure().await;
        assert_eq!(breaker.state().await, CircuitState::Open);
        assert!(!breaker.allow_call().await);
    }

    #[tokio::test]
    async fn success_resets_failure_count() {
        let breaker = CircuitBreaker::new("backend", config(2));
        breaker.record_failure().await;
        breaker.record_success().await;
        breaker.record_failure().await;
        assert_eq!(breaker.state().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn half_open_failure_reopens_immediately() {
        let breaker = CircuitBreaker::new("backend", CircuitBreakerConfig {
            failure_threshold: 1,
            recovery_timeout_secs: 0,
        });
        breaker.record_failure().await;
        assert_eq!(breaker.state().await, CircuitState::Open);
        assert!(breaker.allow_call().await);
        assert_eq!(breaker.state().await, CircuitState::HalfOpen);
        breaker.record_failure().await;
        assert_eq!(breaker.state().await, CircuitState::Open);
    }

    #[tokio::test]
    async fn half_open_success_closes() {
        let breaker = CircuitBreaker::new("backend", CircuitBreakerConfig {
            failure_threshold: 1,
            recovery_timeout_secs: 0,
        });
        breaker.record_failure().await;
        assert!(breaker.allow_call().await);
        breaker.record_success().await;
        assert_eq!(breaker.state().await, CircuitState::Closed);
    }
}
