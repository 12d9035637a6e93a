use crate::state::DailyQuota;
use chrono::{DateTime, Utc};
use std::sync::Mutex;

/// Shared daily snapshot counter
pub struct DailyQuotaTracker {
    quota: Mutex<DailyQuota>,
}

impl DailyQuotaTracker {
    pub fn new(daily_limit: u32) -> Self {
        Self {
            quota: Mutex::new(DailyQuota::new(daily_limit)),
        }
    }

    /// Rolls the counter over if a day has passed, then checks capacity
    pub fn check(&self, requested: u32) -> bool {
        let mut quota = self.quota.lock().unwrap_or_else(|e| e.into_inner());
        if quota.reset_if_needed(Utc::now()) {
            tracing::info!("Daily snapshot quota reset");
        }
        quota.has_capacity(requested)
    }

    pub fn reset_if_needed(&self) -> bool {
        let mut quota = self.quota.lock().unwrap_or_else(|e| e.into_inner());
        quota.reset_if_needed(Utc::now())
    }

    pub fn has_capacity(&self, requested: u32) -> bool {
        let quota = self.quota.lock().unwrap_or_else(|e| e.into_inner());
        quota.has_capacity(requested)
    }

    pub fn consume(&self, captured: u32) {
        let mut quota = self.quota.lock().unwrap_or_else(|e| e.into_inner());
        quota.consume(captured);
        tracing::debug!(
            "Daily quota: {}/{} snapshots used",
            quota.count,
            quota.daily_limit
        );
    }

    pub fn count(&self) -> u32 {
        self.quota.lock().unwrap_or_else(|e| e.into_inner()).count
    }

    pub fn limit(&self) -> u32 {
        self.quota.lock().unwrap_or_else(|e| e.into_inner()).daily_limit
    }

    pub fn reset_time(&self) -> DateTime<Utc> {
        self.quota.lock().unwrap_or_else(|e| e.into_inner()).reset_time
    }

    pub fn set_limit(&self, daily_limit: u32) {
        self.quota.lock().unwrap_or_else(|e| e.into_inner()).daily_limit = daily_limit;
    }
}
