//! Capture orchestration
//!
//! This module ties the shared engine state together and runs one batch per
//! `capture_snapshots` call:
//! - Checks the circuit breaker and the daily quota before doing any work
//! - Spawns one task per competitor, each passing the global gate, the
//!   project gate and the domain throttle before calling the scraper
//! - Races the batch against its time budget, cancelling in-flight captures
//!   when the budget runs out
//! - Folds the outcomes into the breaker, the quota and the batch result

use crate::capture::breaker::{CircuitBreaker, CircuitBreakerSnapshot};
use crate::capture::errors::ErrorKind;
use crate::capture::gates::{ConcurrencyController, InFlightGauge};
use crate::capture::quota::DailyQuotaTracker;
use crate::capture::result::{
    CaptureError, CaptureOutcome, OptimizedSnapshotResult, ResultAggregator,
};
use crate::capture::throttle::DomainThrottle;
use crate::capture::traits::{
    CaptureOptions, Competitor, ProgressSink, ProjectRepository, Scraper, TracingProgressSink,
};
use crate::config::{validate_capture_config, CaptureConfig, CaptureConfigPatch};
use crate::profile::rules::settings_for;
use crate::profile::{WebsiteProfileClassifier, WebsiteType};
use crate::state::BreakerPhase;
use crate::url::domain_of;
use crate::ConfigError;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Caller-supplied batch priority
///
/// Batches are not reordered by priority; it is carried through to the logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapturePriority {
    Low,
    #[default]
    Normal,
    High,
}

impl CapturePriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
        }
    }
}

impl fmt::Display for CapturePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CapturePriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "normal" => Ok(Self::Normal),
            "high" => Ok(Self::High),
            other => Err(format!("unknown priority '{}'", other)),
        }
    }
}

/// Per-call options for [`CaptureOrchestrator::capture_snapshots`]
#[derive(Debug, Clone, Default)]
pub struct CaptureRequestOptions {
    pub priority: CapturePriority,
    /// Overrides `max_total_capture_time_ms` for this batch
    pub max_wait_time: Option<Duration>,
}

impl CaptureRequestOptions {
    pub fn with_priority(mut self, priority: CapturePriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_max_wait_time(mut self, max_wait_time: Duration) -> Self {
        self.max_wait_time = Some(max_wait_time);
        self
    }
}

/// Snapshot of the engine's shared state
#[derive(Debug, Clone, Serialize)]
pub struct SystemStatus {
    pub circuit_breaker_state: BreakerPhase,
    pub circuit_breaker: CircuitBreakerSnapshot,
    pub daily_snapshot_count: u32,
    pub daily_limit: u32,
    pub active_throttled_domains: Vec<String>,
    pub global_concurrency_limit: usize,
    pub active_captures: usize,
    pub tracked_domains: usize,
    pub config: CaptureConfig,
}

/// Everything a competitor task needs, cloned once per task
#[derive(Clone)]
struct TaskContext {
    project_id: Arc<str>,
    total: usize,
    gates: Arc<ConcurrencyController>,
    throttle: Arc<DomainThrottle>,
    classifier: Arc<WebsiteProfileClassifier>,
    breaker: Arc<CircuitBreaker>,
    scraper: Arc<dyn Scraper>,
    progress: Arc<dyn ProgressSink>,
    batch_gauge: Arc<InFlightGauge>,
    cancel: CancellationToken,
    fallback_on_timeout: bool,
}

/// Runs capture batches under shared concurrency, politeness and failure limits
pub struct CaptureOrchestrator {
    config: Mutex<CaptureConfig>,
    classifier: Arc<WebsiteProfileClassifier>,
    throttle: Arc<DomainThrottle>,
    gates: Arc<ConcurrencyController>,
    breaker: Arc<CircuitBreaker>,
    quota: DailyQuotaTracker,
    scraper: Arc<dyn Scraper>,
    repository: Arc<dyn ProjectRepository>,
    progress: Arc<dyn ProgressSink>,
}

impl CaptureOrchestrator {
    /// Creates an orchestrator with fresh shared state
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if the capture limits are invalid.
    pub fn new(
        config: CaptureConfig,
        scraper: Arc<dyn Scraper>,
        repository: Arc<dyn ProjectRepository>,
    ) -> Result<Self, ConfigError> {
        validate_capture_config(&config)?;

        Ok(Self {
            classifier: Arc::new(WebsiteProfileClassifier::new()),
            throttle: Arc::new(DomainThrottle::new(config.per_domain_throttle())),
            gates: Arc::new(ConcurrencyController::new(
                config.max_global_concurrent as usize,
                config.max_concurrent_per_project as usize,
            )),
            breaker: Arc::new(CircuitBreaker::new(
                config.circuit_breaker_error_threshold,
                config.circuit_breaker_window(),
            )),
            quota: DailyQuotaTracker::new(config.daily_snapshot_limit),
            scraper,
            repository,
            progress: Arc::new(TracingProgressSink),
            config: Mutex::new(config),
        })
    }

    pub fn with_progress_sink(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_classifier(mut self, classifier: WebsiteProfileClassifier) -> Self {
        self.classifier = Arc::new(classifier);
        self
    }

    pub fn config(&self) -> CaptureConfig {
        self.config.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn quota(&self) -> &DailyQuotaTracker {
        &self.quota
    }

    pub fn throttle(&self) -> &DomainThrottle {
        &self.throttle
    }

    pub fn classifier(&self) -> &WebsiteProfileClassifier {
        &self.classifier
    }

    /// Captures a snapshot of every competitor of a project
    ///
    /// Never fails: precondition failures, timeouts and repository errors
    /// are all reported through the returned result.
    pub async fn capture_snapshots(
        &self,
        project_id: &str,
        options: CaptureRequestOptions,
    ) -> OptimizedSnapshotResult {
        let started = Instant::now();
        let config = self.config();

        tracing::info!(
            "Starting capture batch for project {} (priority {})",
            project_id,
            options.priority
        );

        if !self.breaker.can_attempt() {
            tracing::warn!(
                "Refusing batch for project {}: circuit breaker is open",
                project_id
            );
            return OptimizedSnapshotResult::rejected(
                CaptureError::new(
                    "Circuit breaker is open: snapshot capture temporarily disabled",
                    ErrorKind::CircuitBreaker,
                ),
                started.elapsed(),
            );
        }

        let project = match self.repository.get_project_with_competitors(project_id).await {
            Ok(project) => project,
            Err(e) => {
                tracing::error!("Failed to load project {}: {}", project_id, e);
                return OptimizedSnapshotResult::rejected(
                    CaptureError::new(
                        format!("Failed to load project {}: {}", project_id, e),
                        ErrorKind::Unknown,
                    ),
                    started.elapsed(),
                );
            }
        };

        let competitors = project.map(|p| p.competitors).unwrap_or_default();
        let total = competitors.len();

        if !self.quota.check(total as u32) {
            let limit = self.quota.limit();
            tracing::warn!(
                "Refusing batch for project {}: daily limit of {} snapshots reached",
                project_id,
                limit
            );
            return OptimizedSnapshotResult {
                total_competitors: total,
                ..OptimizedSnapshotResult::rejected(
                    CaptureError::new(
                        format!(
                            "Daily snapshot limit reached ({}/{})",
                            self.quota.count(),
                            limit
                        ),
                        ErrorKind::RateLimit,
                    ),
                    started.elapsed(),
                )
            };
        }

        if competitors.is_empty() {
            tracing::info!("Project {} has no competitors to capture", project_id);
            return OptimizedSnapshotResult::empty(started.elapsed());
        }

        let budget = options
            .max_wait_time
            .unwrap_or_else(|| config.max_total_capture_time());

        let context = TaskContext {
            project_id: Arc::from(project_id),
            total,
            gates: Arc::clone(&self.gates),
            throttle: Arc::clone(&self.throttle),
            classifier: Arc::clone(&self.classifier),
            breaker: Arc::clone(&self.breaker),
            scraper: Arc::clone(&self.scraper),
            progress: Arc::clone(&self.progress),
            batch_gauge: Arc::new(InFlightGauge::new()),
            cancel: CancellationToken::new(),
            fallback_on_timeout: config.fallback_on_timeout,
        };

        let mut pending = BTreeMap::new();
        let mut batch_domains = BTreeSet::new();
        let mut tasks = JoinSet::new();

        for (index, competitor) in competitors.into_iter().enumerate() {
            let domain = domain_of(&competitor.website).unwrap_or_else(|e| {
                tracing::debug!("Using raw website as domain key: {}", e);
                competitor.website.trim().to_lowercase()
            });
            batch_domains.insert(domain.clone());
            pending.insert(index, (competitor.clone(), domain.clone()));

            let ctx = context.clone();
            tasks.spawn(async move { (index, run_capture(ctx, index, competitor, domain).await) });
        }

        let mut aggregator = ResultAggregator::new(total);
        let deadline = tokio::time::sleep(budget);
        tokio::pin!(deadline);
        let mut timed_out = false;

        loop {
            tokio::select! {
                joined = tasks.join_next() => match joined {
                    None => break,
                    Some(Ok((index, outcome))) => {
                        pending.remove(&index);
                        aggregator.record(outcome);
                    }
                    Some(Err(e)) => {
                        tracing::error!("Capture task for project {} died: {}", project_id, e);
                    }
                },
                _ = &mut deadline => {
                    timed_out = true;
                    break;
                }
            }
        }

        let batch_error = if timed_out {
            context.cancel.cancel();
            tasks.abort_all();
            // Tasks that finished before the abort already touched the
            // breaker and the store, so their outcomes are kept
            while let Some(joined) = tasks.join_next().await {
                if let Ok((index, outcome)) = joined {
                    if !outcome.cancelled {
                        pending.remove(&index);
                        aggregator.record(outcome);
                    }
                }
            }

            tracing::warn!(
                "Batch for project {} exceeded its {}ms budget, abandoning {} captures",
                project_id,
                budget.as_millis(),
                pending.len()
            );
            for (_, (competitor, domain)) in std::mem::take(&mut pending) {
                aggregator.record_unfinished(
                    competitor,
                    domain,
                    CaptureError::new(
                        format!(
                            "Capture abandoned: batch exceeded {}ms time budget",
                            budget.as_millis()
                        ),
                        ErrorKind::Timeout,
                    ),
                );
            }

            Some(CaptureError::new(
                format!("Snapshot capture timed out after {}ms", budget.as_millis()),
                ErrorKind::Timeout,
            ))
        } else {
            None
        };

        // Whatever is left panicked before reporting back
        for (_, (competitor, domain)) in pending {
            aggregator.record_unfinished(
                competitor,
                domain,
                CaptureError::new("Capture task terminated unexpectedly", ErrorKind::Unknown),
            );
        }

        let captured = aggregator.captured_count();
        self.quota.consume(captured as u32);

        let throttled_domains = batch_domains
            .into_iter()
            .filter(|domain| self.throttle.is_throttled(domain))
            .collect();

        let result = aggregator.finish(
            started.elapsed(),
            context.batch_gauge.peak(),
            throttled_domains,
            self.breaker.is_open(),
            batch_error,
        );

        tracing::info!(
            "Batch for project {} finished: {}/{} captured, {} failed in {}ms",
            project_id,
            result.captured_count,
            result.total_competitors,
            result.failures.len(),
            result.capture_time_ms
        );

        result
    }

    pub fn get_system_status(&self) -> SystemStatus {
        let breaker = self.breaker.snapshot();
        SystemStatus {
            circuit_breaker_state: breaker.state,
            circuit_breaker: breaker,
            daily_snapshot_count: self.quota.count(),
            daily_limit: self.quota.limit(),
            active_throttled_domains: self.throttle.throttled_domains(),
            global_concurrency_limit: self.gates.global_limit(),
            active_captures: self.gates.active(),
            tracked_domains: self.throttle.tracked_domains(),
            config: self.config(),
        }
    }

    /// Applies a partial config change to the running engine
    ///
    /// The merged config is validated first; nothing changes if it is
    /// invalid. Gate shrinks take effect as running captures finish.
    pub fn update_config(&self, patch: &CaptureConfigPatch) -> Result<CaptureConfig, ConfigError> {
        let mut config = self.config.lock().unwrap_or_else(|e| e.into_inner());
        let merged = config.merged(patch);
        validate_capture_config(&merged)?;

        self.gates
            .resize_global(merged.max_global_concurrent as usize);
        self.gates
            .resize_projects(merged.max_concurrent_per_project as usize);
        self.throttle.set_interval(merged.per_domain_throttle());
        self.breaker.update_settings(
            merged.circuit_breaker_error_threshold,
            merged.circuit_breaker_window(),
        );
        self.quota.set_limit(merged.daily_snapshot_limit);

        *config = merged.clone();
        tracing::info!("Capture config updated: {:?}", merged);
        Ok(merged)
    }
}

/// Body of one competitor task
async fn run_capture(
    ctx: TaskContext,
    index: usize,
    competitor: Competitor,
    domain: String,
) -> CaptureOutcome {
    ctx.progress
        .notify(&ctx.project_id, index, ctx.total, &competitor.name);

    let _permit = match ctx.gates.acquire(&ctx.project_id).await {
        Ok(permit) => permit,
        Err(e) => {
            return CaptureOutcome {
                competitor,
                domain,
                attempted_at: Utc::now(),
                fallback_used: false,
                throttle_waited: false,
                cancelled: false,
                result: Err(CaptureError::new(
                    format!("Capture gate closed: {}", e),
                    ErrorKind::Unknown,
                )),
            };
        }
    };
    let _running = ctx.batch_gauge.enter();

    let mut throttle_waited = !ctx.throttle.wait_if_throttled(&domain).await.is_zero();
    let profile = ctx.classifier.classify(&competitor.website);
    let options = CaptureOptions::from_profile(&profile);

    tracing::debug!(
        "Capturing {} ({}) as {} with {}ms timeout",
        competitor.name,
        domain,
        profile.website_type,
        options.timeout_ms
    );

    let attempted_at = Utc::now();
    let mut result = ctx.scraper.capture(&competitor, &options, &ctx.cancel).await;
    ctx.throttle.record_request(&domain);

    let mut fallback_used = false;
    let wants_fallback = match &result {
        Err(e) => {
            ctx.fallback_on_timeout
                && options.enable_javascript
                && !e.cancelled
                && !ctx.cancel.is_cancelled()
                && e.resolved_kind() == ErrorKind::Timeout
        }
        Ok(_) => false,
    };

    if wants_fallback {
        let fallback = CaptureOptions {
            timeout_ms: settings_for(WebsiteType::Basic).timeout_ms,
            enable_javascript: false,
            ..options
        };
        tracing::debug!(
            "Capture of {} timed out, retrying without JavaScript",
            competitor.name
        );

        fallback_used = true;
        throttle_waited |= !ctx.throttle.wait_if_throttled(&domain).await.is_zero();
        result = ctx.scraper.capture(&competitor, &fallback, &ctx.cancel).await;
        ctx.throttle.record_request(&domain);
    }

    let cancelled = matches!(&result, Err(e) if e.cancelled);
    let result = match result {
        Ok(snapshot_id) => {
            ctx.breaker.record_success();
            tracing::debug!("Captured {} as snapshot {}", competitor.name, snapshot_id);
            Ok(snapshot_id)
        }
        Err(e) => {
            // A cancelled capture says nothing about the target's health
            if !e.cancelled {
                ctx.breaker.record_failure();
            }
            let kind = e.resolved_kind();
            tracing::warn!(
                "Capture failed for {} ({}): {} [{}]",
                competitor.name,
                domain,
                e.message,
                kind
            );
            Err(CaptureError::new(e.message, kind))
        }
    };

    CaptureOutcome {
        competitor,
        domain,
        attempted_at,
        fallback_used,
        throttle_waited,
        cancelled,
        result,
    }
}
