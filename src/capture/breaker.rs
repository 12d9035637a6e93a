//! Process-wide error-rate circuit breaker
//!
//! Wraps [`CircuitBreakerState`] in a mutex together with its settings so
//! every batch and task shares one breaker. Transitions are logged here; the
//! state machine itself stays pure.

use crate::state::{BreakerPhase, CircuitBreakerState};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Point-in-time view of the breaker for status reports
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircuitBreakerSnapshot {
    pub state: BreakerPhase,
    pub error_count: u32,
    pub success_count: u32,
    pub error_rate: f64,
    pub last_failure_time: Option<DateTime<Utc>>,
    /// Time left before an open breaker admits a probe
    pub open_remaining_ms: Option<u64>,
}

#[derive(Debug)]
struct Inner {
    state: CircuitBreakerState,
    threshold: f64,
    window: Duration,
}

pub struct CircuitBreaker {
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(threshold: f64, window: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: CircuitBreakerState::new(),
                threshold,
                window,
            }),
        }
    }

    /// Returns whether a batch may start, moving an expired open breaker
    /// to half-open
    pub fn can_attempt(&self) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let before = inner.state.state;
        let allowed = inner.state.can_attempt(Instant::now());
        if before == BreakerPhase::Open && inner.state.state == BreakerPhase::HalfOpen {
            tracing::info!("Circuit breaker half-open, admitting probe captures");
        }
        allowed
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let before = inner.state.state;
        inner.state.record_success();
        if before == BreakerPhase::HalfOpen && inner.state.state == BreakerPhase::Closed {
            tracing::info!("Circuit breaker closed after successful probes");
        }
    }

    pub fn record_failure(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let before = inner.state.state;
        let (threshold, window) = (inner.threshold, inner.window);
        inner.state.record_failure(threshold, window, Instant::now());

        if inner.state.state == BreakerPhase::Open && before != BreakerPhase::Open {
            tracing::warn!(
                "Circuit breaker opened: error rate {:.2} over {} outcomes, retry in {:?}",
                inner.state.error_rate(),
                inner.state.error_count + inner.state.success_count,
                window
            );
        }
    }

    pub fn phase(&self) -> BreakerPhase {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).state.state
    }

    pub fn is_open(&self) -> bool {
        self.phase() == BreakerPhase::Open
    }

    pub fn snapshot(&self) -> CircuitBreakerSnapshot {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let state = &inner.state;
        CircuitBreakerSnapshot {
            state: state.state,
            error_count: state.error_count,
            success_count: state.success_count,
            error_rate: state.error_rate(),
            last_failure_time: state.last_failure_time,
            open_remaining_ms: state
                .open_remaining(Instant::now())
                .map(|d| d.as_millis() as u64),
        }
    }

    /// Applies a new threshold and window to future transitions
    pub fn update_settings(&self, threshold: f64, window: Duration) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.threshold = threshold;
        inner.window = window;
    }
}
