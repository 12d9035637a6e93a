//! Per-domain request throttle
//!
//! Requests to one domain are spaced at least `per_domain_throttle_ms` apart,
//! no matter how many tasks or batches target it. The check and the claim on
//! the domain happen under one lock, so two tasks waiting on the same domain
//! take turns instead of both waking up and firing together.

use crate::state::DomainState;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Shared per-domain politeness state
pub struct DomainThrottle {
    /// Minimum interval in milliseconds
    interval_ms: AtomicU64,

    /// Per-domain state, kept for the life of the process
    domains: Mutex<HashMap<String, DomainState>>,
}

impl DomainThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval_ms: AtomicU64::new(interval.as_millis() as u64),
            domains: Mutex::new(HashMap::new()),
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.load(Ordering::Relaxed))
    }

    pub fn set_interval(&self, interval: Duration) {
        self.interval_ms
            .store(interval.as_millis() as u64, Ordering::Relaxed);
    }

    /// True while the domain is inside its minimum request interval
    pub fn is_throttled(&self, domain: &str) -> bool {
        let interval = self.interval();
        let domains = self.domains.lock().unwrap_or_else(|e| e.into_inner());
        domains
            .get(domain)
            .map(|state| state.is_throttled(interval, Instant::now()))
            .unwrap_or(false)
    }

    /// Waits until the domain may be contacted, then claims it
    ///
    /// Returns the total time spent waiting. Must complete before the
    /// scraper call; [`record_request`](Self::record_request) runs after it.
    pub async fn wait_if_throttled(&self, domain: &str) -> Duration {
        let mut waited = Duration::ZERO;

        loop {
            let wait = {
                let interval = self.interval();
                let now = Instant::now();
                let mut domains = self.domains.lock().unwrap_or_else(|e| e.into_inner());
                let state = domains
                    .entry(domain.to_string())
                    .or_insert_with(DomainState::new);

                match state.time_until_next_request(interval, now) {
                    None => {
                        state.reserve(now);
                        return waited;
                    }
                    Some(wait) => wait,
                }
            };

            tracing::trace!("Domain {} throttled, waiting {:?}", domain, wait);
            tokio::time::sleep(wait).await;
            waited += wait;
        }
    }

    /// Records that a request to the domain finished
    pub fn record_request(&self, domain: &str) {
        let mut domains = self.domains.lock().unwrap_or_else(|e| e.into_inner());
        domains
            .entry(domain.to_string())
            .or_insert_with(DomainState::new)
            .record_request(Instant::now());
    }

    /// Number of completed requests to a domain
    pub fn request_count(&self, domain: &str) -> u32 {
        let domains = self.domains.lock().unwrap_or_else(|e| e.into_inner());
        domains.get(domain).map(|s| s.request_count).unwrap_or(0)
    }

    /// All domains currently inside their interval, sorted
    pub fn throttled_domains(&self) -> Vec<String> {
        let interval = self.interval();
        let now = Instant::now();
        let domains = self.domains.lock().unwrap_or_else(|e| e.into_inner());
        let mut throttled: Vec<String> = domains
            .iter()
            .filter(|(_, state)| state.is_throttled(interval, now))
            .map(|(domain, _)| domain.clone())
            .collect();
        throttled.sort();
        throttled
    }

    /// Number of domains seen so far
    pub fn tracked_domains(&self) -> usize {
        self.domains.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
