use std::time::{Duration, Instant};

/// Tracks the politeness state of one target domain
///
/// Entries are created on first contact and kept for the life of the
/// process; the set of competitor domains is small and reused across batches.
#[derive(Debug, Clone, Default)]
pub struct DomainState {
    /// Number of completed requests to this domain
    pub request_count: u32,

    /// Timestamp of the last request to this domain
    pub last_request_time: Option<Instant>,
}

impl DomainState {
    /// Creates a new DomainState with no request history
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks if the domain is still inside its minimum request interval
    ///
    /// # Arguments
    ///
    /// * `min_interval` - The configured per-domain throttle
    /// * `now` - The current time instant
    pub fn is_throttled(&self, min_interval: Duration, now: Instant) -> bool {
        self.time_until_next_request(min_interval, now).is_some()
    }

    /// Calculates the time until the next request can be made
    ///
    /// Returns None if a request can be made now, or the duration to wait otherwise.
    pub fn time_until_next_request(&self, min_interval: Duration, now: Instant) -> Option<Duration> {
        let last = self.last_request_time?;
        let elapsed = now.saturating_duration_since(last);
        if elapsed < min_interval {
            Some(min_interval - elapsed)
        } else {
            None
        }
    }

    /// Claims the domain for a request starting now
    ///
    /// This moves the timestamp forward without counting a request, so a
    /// second task looking at the domain sees it as throttled while the
    /// first task's capture is still running.
    pub fn reserve(&mut self, now: Instant) {
        self.last_request_time = Some(now);
    }

    /// Records that a request to this domain finished
    pub fn record_request(&mut self, now: Instant) {
        self.request_count += 1;
        self.last_request_time = Some(now);
    }
}
