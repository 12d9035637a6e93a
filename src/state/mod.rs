//! State module for the capture engine's long-lived counters
//!
//! The types here are plain state machines that take the current time as an
//! argument. The shared, lock-guarded wrappers live in [`crate::capture`].
//!
//! # Components
//!
//! - `DomainState`: last request time and request count for one domain
//! - `CircuitBreakerState`: closed/open/half-open failure-rate breaker
//! - `DailyQuota`: snapshot counter with a 24 hour reset boundary

mod circuit_state;
mod domain_state;
mod quota;

// Re-export main types
pub use circuit_state::{
    BreakerPhase, CircuitBreakerState, HALF_OPEN_SUCCESSES_TO_CLOSE, MIN_OBSERVATIONS_TO_OPEN,
};
pub use domain_state::DomainState;
pub use quota::{DailyQuota, QUOTA_RESET_INTERVAL_HOURS};
