//! Aggregated liveness reporting for `GET /health` (spec §6), grounded on
//! the teacher's own `HealthCheck`/`HealthStatus` aggregation shape: a list
//! of independent component checks folded into one overall
//! healthy/degraded/unhealthy state.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Overall health state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Result of one component check.
#[derive(Debug, Clone, Serialize)]
pub struct HealthCheck {
    pub component: String,
    pub state: HealthState,
    pub message: Option<String>,
    pub duration_ms: u64,
}

impl HealthCheck {
    #[must_use]
    pub fn healthy(component: impl Into<String>, duration: Duration) -> Self {
        Self {
            component: component.into(),
            state: HealthState::Healthy,
            message: None,
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        }
    }

    #[must_use]
    pub fn degraded(component: impl Into<String>, message: impl Into<String>, duration: Duration) -> Self {
        Self {
            component: component.into(),
            state: HealthState::Degraded,
            message: Some(message.into()),
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        }
    }

    #[must_use]
    pub fn unhealthy(component: impl Into<String>, message: impl Into<String>, duration: Duration) -> Self {
        Self {
            component: component.into(),
            state: HealthState::Unhealthy,
            message: Some(message.into()),
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// The full body of `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub state: HealthState,
    pub checked_at: DateTime<Utc>,
    pub checks: Vec<HealthCheck>,
    pub active_sessions: usize,
}

impl HealthStatus {
    #[must_use]
    pub fn from_checks(checks: Vec<HealthCheck>, active_sessions: usize) -> Self {
        let state = Self::aggregate_state(&checks);
        Self {
            state,
            checked_at: Utc::now(),
            checks,
            active_sessions,
        }
    }

    fn aggregate_state(checks: &[HealthCheck]) -> HealthState {
        if checks.iter().any(|c| c.state == HealthState::Unhealthy) {
            HealthState::Unhealthy
        } else if checks.iter().any(|c| c.state == HealthState::Degraded) {
            HealthState::Degraded
        } else {
            HealthState::Healthy
        }
    }
}

/// Probe the hospital backend's circuit-breaker state and fold it into one
/// `HealthCheck` (spec §6: "`GET /health` ... reports backend connectivity,
/// circuit-breaker state, and active session count").
pub async fn backend_check(circuit_state: careline_backend::CircuitState) -> HealthCheck {
    let start = Instant::now();
    match circuit_state {
        careline_backend::CircuitState::Closed => HealthCheck::healthy("hospital_backend", start.elapsed()),
        careline_backend::CircuitState::HalfOpen => {
            HealthCheck::degraded("hospital_backend", "circuit half-open; probing recovery", start.elapsed())
        }
        careline_backend::CircuitState::Open => {
            HealthCheck::unhealthy("hospital_backend", "circuit open; calls are being short-circuited", start.elapsed())
        }
    }
}
