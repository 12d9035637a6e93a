use chrono::{DateTime, Duration, Utc};

/// Hours between automatic quota resets
pub const QUOTA_RESET_INTERVAL_HOURS: i64 = 24;

/// Daily snapshot counter
///
/// The counter lives in memory only: it starts at zero on process start and
/// rolls over once 24 hours have passed since the last reset.
#[derive(Debug, Clone)]
pub struct DailyQuota {
    pub count: u32,
    pub reset_time: DateTime<Utc>,
    pub daily_limit: u32,
}

impl DailyQuota {
    pub fn new(daily_limit: u32) -> Self {
        Self {
            count: 0,
            reset_time: Utc::now(),
            daily_limit,
        }
    }

    /// Zeroes the counter if at least 24 hours passed since the last reset
    ///
    /// Returns true when a reset happened.
    pub fn reset_if_needed(&mut self, now: DateTime<Utc>) -> bool {
        if now - self.reset_time >= Duration::hours(QUOTA_RESET_INTERVAL_HOURS) {
            self.count = 0;
            self.reset_time = now;
            true
        } else {
            false
        }
    }

    /// Checks if another batch may start
    ///
    /// Only the running count is compared with the limit; the requested
    /// size is accepted for logging but a batch is never refused because it
    /// would overshoot the limit.
    pub fn has_capacity(&self, _requested: u32) -> bool {
        self.count < self.daily_limit
    }

    /// Adds captured snapshots to the counter
    pub fn consume(&mut self, captured: u32) {
        self.count = self.count.saturating_add(captured);
    }

    pub fn remaining(&self) -> u32 {
        self.daily_limit.saturating_sub(self.count)
    }
}
