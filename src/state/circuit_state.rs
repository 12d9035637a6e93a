use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::{Duration, Instant};

/// Minimum number of recorded outcomes before the breaker may open
pub const MIN_OBSERVATIONS_TO_OPEN: u32 = 5;

/// Successes needed in half-open before the breaker closes again
pub const HALF_OPEN_SUCCESSES_TO_CLOSE: u32 = 3;

/// Breaker phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BreakerPhase {
    /// Captures flow normally
    Closed,
    /// Captures are refused until the retry window elapses
    Open,
    /// Captures are allowed while the breaker watches for recovery
    HalfOpen,
}

impl BreakerPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half-open",
        }
    }
}

/// Failure-rate circuit breaker state
///
/// Counters are cumulative rather than windowed: `error_count` only resets
/// when the breaker closes from half-open, and `success_count` only resets
/// when the breaker enters half-open.
#[derive(Debug, Clone)]
pub struct CircuitBreakerState {
    pub state: BreakerPhase,
    pub error_count: u32,
    pub success_count: u32,
    pub last_failure_time: Option<DateTime<Utc>>,
    /// Only set while `state` is `Open`
    pub next_attempt_time: Option<Instant>,
}

impl CircuitBreakerState {
    pub fn new() -> Self {
        Self {
            state: BreakerPhase::Closed,
            error_count: 0,
            success_count: 0,
            last_failure_time: None,
            next_attempt_time: None,
        }
    }

    /// Records a successful capture
    pub fn record_success(&mut self) {
        self.success_count = self.success_count.saturating_add(1);

        if self.state == BreakerPhase::HalfOpen
            && self.success_count >= HALF_OPEN_SUCCESSES_TO_CLOSE
        {
            self.state = BreakerPhase::Closed;
            self.error_count = 0;
            self.next_attempt_time = None;
        }
    }

    /// Records a failed capture, opening the breaker when the error rate is
    /// at or above `threshold` over at least five observations
    pub fn record_failure(&mut self, threshold: f64, window: Duration, now: Instant) {
        self.error_count = self.error_count.saturating_add(1);
        self.last_failure_time = Some(Utc::now());

        let total = self.error_count.saturating_add(self.success_count);
        if total >= MIN_OBSERVATIONS_TO_OPEN && self.error_rate() >= threshold {
            self.state = BreakerPhase::Open;
            self.next_attempt_time = Some(now + window);
        }
    }

    /// Checks whether a capture may start, moving an expired open breaker to half-open
    pub fn can_attempt(&mut self, now: Instant) -> bool {
        if self.state != BreakerPhase::Open {
            return true;
        }

        match self.next_attempt_time {
            Some(next) if now < next => false,
            _ => {
                self.state = BreakerPhase::HalfOpen;
                self.success_count = 0;
                self.next_attempt_time = None;
                true
            }
        }
    }

    /// Fraction of recorded outcomes that were failures
    pub fn error_rate(&self) -> f64 {
        let total = self.error_count as f64 + self.success_count as f64;
        if total == 0.0 {
            0.0
        } else {
            self.error_count as f64 / total
        }
    }

    /// Time left before an open breaker lets a probe through
    pub fn open_remaining(&self, now: Instant) -> Option<Duration> {
        match (self.state, self.next_attempt_time) {
            (BreakerPhase::Open, Some(next)) if next > now => Some(next - now),
            _ => None,
        }
    }
}

impl Default for CircuitBreakerState {
    fn default() -> Self {
        Self::new()
    }
}
