//! Batch results and their aggregation

use crate::capture::errors::ErrorKind;
use crate::capture::traits::Competitor;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// A failure message with its kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptureError {
    pub message: String,
    pub kind: ErrorKind,
}

impl CaptureError {
    pub fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }
}

/// One competitor that could not be captured
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompetitorCaptureFailure {
    pub competitor_id: String,
    pub competitor_name: String,
    pub domain: String,
    pub error: String,
    pub error_type: ErrorKind,
    pub attempted_at: DateTime<Utc>,
    pub fallback_used: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ResourceUsage {
    /// Milliseconds per captured snapshot, 0 when nothing was captured
    pub avg_time_per_snapshot: u64,
    pub max_concurrent_reached: usize,
    pub throttled_domains: Vec<String>,
}

/// Report returned for every `capture_snapshots` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptimizedSnapshotResult {
    pub success: bool,
    pub captured_count: usize,
    pub total_competitors: usize,
    pub capture_time_ms: u64,
    pub failures: Vec<CompetitorCaptureFailure>,
    pub rate_limiting_triggered: bool,
    pub circuit_breaker_activated: bool,
    pub resource_usage: ResourceUsage,
    /// Batch-level failure, absent when the batch ran to completion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CaptureError>,
    pub snapshot_ids: Vec<String>,
}

impl OptimizedSnapshotResult {
    /// A batch that failed before any competitor was attempted
    pub fn rejected(error: CaptureError, elapsed: Duration) -> Self {
        let circuit_breaker_activated = error.kind == ErrorKind::CircuitBreaker;
        let rate_limiting_triggered = error.kind == ErrorKind::RateLimit;
        Self {
            success: false,
            captured_count: 0,
            total_competitors: 0,
            capture_time_ms: elapsed.as_millis() as u64,
            failures: Vec::new(),
            rate_limiting_triggered,
            circuit_breaker_activated,
            resource_usage: ResourceUsage::default(),
            error: Some(error),
            snapshot_ids: Vec::new(),
        }
    }

    /// A project with nothing to capture
    pub fn empty(elapsed: Duration) -> Self {
        Self {
            success: false,
            captured_count: 0,
            total_competitors: 0,
            capture_time_ms: elapsed.as_millis() as u64,
            failures: Vec::new(),
            rate_limiting_triggered: false,
            circuit_breaker_activated: false,
            resource_usage: ResourceUsage::default(),
            error: None,
            snapshot_ids: Vec::new(),
        }
    }
}

/// Result of one competitor task
#[derive(Debug, Clone)]
pub struct CaptureOutcome {
    pub competitor: Competitor,
    pub domain: String,
    pub attempted_at: DateTime<Utc>,
    pub fallback_used: bool,
    /// Whether the task had to wait on the domain throttle
    pub throttle_waited: bool,
    /// The scraper stopped because the batch was cancelled
    pub cancelled: bool,
    /// Snapshot id on success
    pub result: Result<String, CaptureError>,
}

/// Folds task outcomes into an [`OptimizedSnapshotResult`]
#[derive(Debug)]
pub struct ResultAggregator {
    total: usize,
    snapshot_ids: Vec<String>,
    failures: Vec<CompetitorCaptureFailure>,
    rate_limiting_triggered: bool,
}

impl ResultAggregator {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            snapshot_ids: Vec::new(),
            failures: Vec::new(),
            rate_limiting_triggered: false,
        }
    }

    pub fn record(&mut self, outcome: CaptureOutcome) {
        if outcome.throttle_waited {
            self.rate_limiting_triggered = true;
        }

        match outcome.result {
            Ok(snapshot_id) => self.snapshot_ids.push(snapshot_id),
            Err(error) => {
                if error.kind == ErrorKind::RateLimit {
                    self.rate_limiting_triggered = true;
                }
                self.failures.push(CompetitorCaptureFailure {
                    competitor_id: outcome.competitor.id,
                    competitor_name: outcome.competitor.name,
                    domain: outcome.domain,
                    error: error.message,
                    error_type: error.kind,
                    attempted_at: outcome.attempted_at,
                    fallback_used: outcome.fallback_used,
                });
            }
        }
    }

    /// Records a competitor whose task never reported back
    pub fn record_unfinished(&mut self, competitor: Competitor, domain: String, error: CaptureError) {
        self.failures.push(CompetitorCaptureFailure {
            competitor_id: competitor.id,
            competitor_name: competitor.name,
            domain,
            error: error.message,
            error_type: error.kind,
            attempted_at: Utc::now(),
            fallback_used: false,
        });
    }

    pub fn captured_count(&self) -> usize {
        self.snapshot_ids.len()
    }

    pub fn finish(
        self,
        elapsed: Duration,
        max_concurrent_reached: usize,
        throttled_domains: Vec<String>,
        circuit_breaker_activated: bool,
        error: Option<CaptureError>,
    ) -> OptimizedSnapshotResult {
        let captured_count = self.snapshot_ids.len();
        let capture_time_ms = elapsed.as_millis() as u64;
        let avg_time_per_snapshot = if captured_count == 0 {
            0
        } else {
            capture_time_ms / captured_count as u64
        };

        OptimizedSnapshotResult {
            success: captured_count > 0 && error.is_none(),
            captured_count,
            total_competitors: self.total,
            capture_time_ms,
            failures: self.failures,
            rate_limiting_triggered: self.rate_limiting_triggered,
            circuit_breaker_activated,
            resource_usage: ResourceUsage {
                avg_time_per_snapshot,
                max_concurrent_reached,
                throttled_domains,
            },
            error,
            snapshot_ids: self.snapshot_ids,
        }
    }
}
