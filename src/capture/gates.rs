//! Global and per-project admission gates
//!
//! A capture runs only while it holds one permit from the global gate and one
//! from its project's gate, acquired in that order. Permits are released on
//! drop, which covers success, failure, cancellation and panics alike.
//!
//! Project gates are created on first use and kept for the life of the
//! process. The registry is never evicted; it grows with the number of
//! distinct projects captured since startup.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

/// Permits held by a running capture
#[derive(Debug)]
pub struct CapturePermit {
    _global: OwnedSemaphorePermit,
    _project: OwnedSemaphorePermit,
    _active: GaugeGuard,
}

/// Tracks a current and peak count of running captures
#[derive(Debug, Default)]
pub struct InFlightGauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlightGauge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one more running capture until the guard is dropped
    pub fn enter(self: &Arc<Self>) -> GaugeGuard {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        GaugeGuard {
            gauge: Arc::clone(self),
        }
    }

    pub fn current(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct GaugeGuard {
    gauge: Arc<InFlightGauge>,
}

impl Drop for GaugeGuard {
    fn drop(&mut self) {
        self.gauge.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Nested global and per-project concurrency limits
pub struct ConcurrencyController {
    global: Arc<Semaphore>,
    global_limit: AtomicUsize,
    project_limit: AtomicUsize,
    projects: Mutex<HashMap<String, Arc<Semaphore>>>,
    active: Arc<InFlightGauge>,
}

impl ConcurrencyController {
    pub fn new(global_limit: usize, project_limit: usize) -> Self {
        Self {
            global: Arc::new(Semaphore::new(global_limit)),
            global_limit: AtomicUsize::new(global_limit),
            project_limit: AtomicUsize::new(project_limit),
            projects: Mutex::new(HashMap::new()),
            active: Arc::new(InFlightGauge::new()),
        }
    }

    /// Waits for a global slot, then a slot in the project's gate
    pub async fn acquire(&self, project_id: &str) -> Result<CapturePermit, AcquireError> {
        let global = Arc::clone(&self.global).acquire_owned().await?;
        let project = self.project_gate(project_id).acquire_owned().await?;

        Ok(CapturePermit {
            _global: global,
            _project: project,
            _active: self.active.enter(),
        })
    }

    /// Returns the gate for a project, creating it on first use
    pub fn project_gate(&self, project_id: &str) -> Arc<Semaphore> {
        let mut projects = self.projects.lock().unwrap_or_else(|e| e.into_inner());
        let limit = self.project_limit.load(Ordering::SeqCst);
        Arc::clone(
            projects
                .entry(project_id.to_string())
                .or_insert_with(|| Arc::new(Semaphore::new(limit))),
        )
    }

    pub fn global_limit(&self) -> usize {
        self.global_limit.load(Ordering::SeqCst)
    }

    pub fn project_limit(&self) -> usize {
        self.project_limit.load(Ordering::SeqCst)
    }

    /// Captures currently holding both permits
    pub fn active(&self) -> usize {
        self.active.current()
    }

    /// Most captures ever running at once
    pub fn peak(&self) -> usize {
        self.active.peak()
    }

    pub fn project_count(&self) -> usize {
        self.projects.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Changes the global limit without disturbing running captures
    pub fn resize_global(&self, new_limit: usize) {
        let old_limit = self.global_limit.swap(new_limit, Ordering::SeqCst);
        resize_semaphore(&self.global, old_limit, new_limit);
        if old_limit != new_limit {
            tracing::info!("Global capture limit changed {} -> {}", old_limit, new_limit);
        }
    }

    /// Changes the per-project limit for existing and future project gates
    pub fn resize_projects(&self, new_limit: usize) {
        let old_limit = self.project_limit.swap(new_limit, Ordering::SeqCst);
        let projects = self.projects.lock().unwrap_or_else(|e| e.into_inner());
        for gate in projects.values() {
            resize_semaphore(gate, old_limit, new_limit);
        }
    }
}

/// Grows a semaphore immediately; shrinks it by retiring idle permits now
/// and the rest as running captures hand theirs back
fn resize_semaphore(semaphore: &Arc<Semaphore>, old_limit: usize, new_limit: usize) {
    if new_limit > old_limit {
        semaphore.add_permits(new_limit - old_limit);
        return;
    }

    let excess = old_limit - new_limit;
    if excess == 0 {
        return;
    }

    let retired = semaphore.forget_permits(excess);
    let outstanding = excess - retired;
    if outstanding == 0 {
        return;
    }

    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            let semaphore = Arc::clone(semaphore);
            handle.spawn(async move {
                if let Ok(permits) = semaphore.acquire_many_owned(outstanding as u32).await {
                    permits.forget();
                }
            });
        }
        Err(_) => {
            tracing::warn!(
                "No runtime available, {} permits will stay above the new limit",
                outstanding
            );
        }
    }
}
