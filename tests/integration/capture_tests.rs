//! End-to-end tests for the capture orchestrator
//!
//! The fake scraper records every call with its start time and tracks how
//! many calls are in flight, globally and per project, so the concurrency
//! and politeness limits can be checked from the outside.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use sumi_snapshot::capture::{
    CaptureOptions, CaptureOrchestrator, CaptureRequestOptions, Competitor, ErrorKind,
    InMemoryProjectRepository, ProgressSink, Project, ProjectRepository, ScrapeError, Scraper,
};
use sumi_snapshot::config::{CaptureConfig, CaptureConfigPatch};
use sumi_snapshot::state::BreakerPhase;
use sumi_snapshot::SnapshotError;
use tokio_util::sync::CancellationToken;

/// How the fake scraper treats one website
#[derive(Clone)]
enum Behavior {
    Succeed,
    Fail(ScrapeError),
    /// Sleeps far longer than any test budget, honouring cancellation
    Hang,
}

#[derive(Debug, Clone)]
struct Call {
    website: String,
    started: Instant,
    options: CaptureOptions,
}

#[derive(Default)]
struct Gauge {
    current: usize,
    peak: usize,
}

struct FakeScraper {
    delay: Duration,
    behaviors: HashMap<String, Behavior>,
    calls: Mutex<Vec<Call>>,
    global: Mutex<Gauge>,
    per_project: Mutex<HashMap<String, Gauge>>,
}

impl FakeScraper {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            behaviors: HashMap::new(),
            calls: Mutex::new(Vec::new()),
            global: Mutex::new(Gauge::default()),
            per_project: Mutex::new(HashMap::new()),
        }
    }

    fn with(mut self, website: &str, behavior: Behavior) -> Self {
        self.behaviors.insert(website.to_string(), behavior);
        self
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn global_peak(&self) -> usize {
        self.global.lock().unwrap().peak
    }

    fn project_peak(&self, project_id: &str) -> usize {
        self.per_project
            .lock()
            .unwrap()
            .get(project_id)
            .map(|g| g.peak)
            .unwrap_or(0)
    }

    fn enter(&self, project_id: &str) {
        let mut global = self.global.lock().unwrap();
        global.current += 1;
        global.peak = global.peak.max(global.current);

        let mut projects = self.per_project.lock().unwrap();
        let gauge = projects.entry(project_id.to_string()).or_default();
        gauge.current += 1;
        gauge.peak = gauge.peak.max(gauge.current);
    }

    fn exit(&self, project_id: &str) {
        self.global.lock().unwrap().current -= 1;
        if let Some(gauge) = self.per_project.lock().unwrap().get_mut(project_id) {
            gauge.current -= 1;
        }
    }
}

#[async_trait]
impl Scraper for FakeScraper {
    async fn capture(
        &self,
        competitor: &Competitor,
        options: &CaptureOptions,
        cancel: &CancellationToken,
    ) -> Result<String, ScrapeError> {
        self.calls.lock().unwrap().push(Call {
            website: competitor.website.clone(),
            started: Instant::now(),
            options: options.clone(),
        });

        let project = competitor.project_id.clone();
        self.enter(&project);

        let behavior = self
            .behaviors
            .get(&competitor.website)
            .cloned()
            .unwrap_or(Behavior::Succeed);

        let wait = match behavior {
            Behavior::Hang => Duration::from_secs(30),
            _ => self.delay,
        };

        let finished = tokio::select! {
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(wait) => true,
        };
        self.exit(&project);

        if !finished {
            return Err(ScrapeError::cancelled());
        }

        match behavior {
            Behavior::Fail(error) => Err(error),
            Behavior::Hang => Err(ScrapeError::new("unreachable")),
            _ => Ok(format!("snap-{}", competitor.id)),
        }
    }
}

/// Fake scraper that fails every JavaScript capture with a timeout
struct JavascriptTimeoutScraper {
    calls: Mutex<Vec<CaptureOptions>>,
    fallback_succeeds: bool,
}

#[async_trait]
impl Scraper for JavascriptTimeoutScraper {
    async fn capture(
        &self,
        competitor: &Competitor,
        options: &CaptureOptions,
        _cancel: &CancellationToken,
    ) -> Result<String, ScrapeError> {
        self.calls.lock().unwrap().push(options.clone());
        if options.enable_javascript || !self.fallback_succeeds {
            Err(ScrapeError::new("Navigation timeout of 20000 ms exceeded"))
        } else {
            Ok(format!("snap-{}", competitor.id))
        }
    }
}

struct FailingRepository;

#[async_trait]
impl ProjectRepository for FailingRepository {
    async fn get_project_with_competitors(
        &self,
        _project_id: &str,
    ) -> sumi_snapshot::Result<Option<Project>> {
        Err(SnapshotError::Repository("connection pool exhausted".to_string()))
    }
}

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<(String, usize, usize, String)>>,
}

impl ProgressSink for RecordingSink {
    fn notify(&self, project_id: &str, index: usize, total: usize, competitor_name: &str) {
        self.events.lock().unwrap().push((
            project_id.to_string(),
            index,
            total,
            competitor_name.to_string(),
        ));
    }
}

fn project(id: &str, websites: &[&str]) -> Project {
    Project {
        id: id.to_string(),
        name: format!("Project {}", id),
        competitors: websites
            .iter()
            .enumerate()
            .map(|(i, website)| Competitor {
                project_id: id.to_string(),
                id: format!("{}-{}", id, i),
                name: format!("Competitor {}", i),
                website: website.to_string(),
            })
            .collect(),
    }
}

fn test_config() -> CaptureConfig {
    CaptureConfig {
        max_concurrent_per_project: 3,
        max_global_concurrent: 10,
        per_domain_throttle_ms: 10,
        daily_snapshot_limit: 1_000,
        circuit_breaker_error_threshold: 0.5,
        circuit_breaker_window_ms: 60_000,
        max_total_capture_time_ms: 10_000,
        fallback_on_timeout: true,
    }
}

fn build(
    config: CaptureConfig,
    scraper: Arc<dyn Scraper>,
    projects: Vec<Project>,
) -> CaptureOrchestrator {
    let repo = Arc::new(InMemoryProjectRepository::new(projects));
    CaptureOrchestrator::new(config, scraper, repo).unwrap()
}

#[tokio::test]
async fn test_two_competitors_both_succeed() {
    let scraper = Arc::new(FakeScraper::new(Duration::from_millis(5)));
    let orch = build(
        test_config(),
        scraper.clone(),
        vec![project("p1", &["https://alpha.com", "https://beta.com"])],
    );

    let result = orch
        .capture_snapshots("p1", CaptureRequestOptions::default())
        .await;

    assert!(result.success);
    assert_eq!(result.captured_count, 2);
    assert_eq!(result.total_competitors, 2);
    assert!(result.failures.is_empty());
    assert!(result.error.is_none());
    assert!(!result.circuit_breaker_activated);

    let mut ids = result.snapshot_ids.clone();
    ids.sort();
    assert_eq!(ids, vec!["snap-p1-0", "snap-p1-1"]);
    assert_eq!(scraper.call_count(), 2);
    assert_eq!(orch.get_system_status().daily_snapshot_count, 2);
}

#[tokio::test]
async fn test_one_of_two_fails() {
    let scraper = Arc::new(
        FakeScraper::new(Duration::from_millis(5))
            .with("https://beta.com", Behavior::Fail(ScrapeError::new("Capture failed"))),
    );
    let orch = build(
        test_config(),
        scraper.clone(),
        vec![project("p1", &["https://alpha.com", "https://beta.com"])],
    );

    let result = orch
        .capture_snapshots("p1", CaptureRequestOptions::default())
        .await;

    assert!(result.success);
    assert_eq!(result.captured_count, 1);
    assert_eq!(result.failures.len(), 1);

    let failure = &result.failures[0];
    assert_eq!(failure.error, "Capture failed");
    assert_eq!(failure.error_type, ErrorKind::Unknown);
    assert_eq!(failure.competitor_id, "p1-1");
    assert_eq!(failure.domain, "beta.com");
    assert!(!failure.fallback_used);
}

#[tokio::test]
async fn test_structured_kind_wins_over_text() {
    let scraper = Arc::new(FakeScraper::new(Duration::from_millis(1)).with(
        "https://alpha.com",
        Behavior::Fail(ScrapeError::with_kind(
            "Capture failed",
            ErrorKind::Permission,
        )),
    ));
    let orch = build(
        test_config(),
        scraper,
        vec![project("p1", &["https://alpha.com"])],
    );

    let result = orch
        .capture_snapshots("p1", CaptureRequestOptions::default())
        .await;

    assert!(!result.success);
    assert_eq!(result.failures[0].error_type, ErrorKind::Permission);
}

#[tokio::test]
async fn test_daily_limit_reached_before_start() {
    let scraper = Arc::new(FakeScraper::new(Duration::from_millis(1)));
    let config = CaptureConfig {
        daily_snapshot_limit: 2,
        ..test_config()
    };
    let orch = build(
        config,
        scraper.clone(),
        vec![project("p1", &["https://alpha.com", "https://beta.com"])],
    );

    let first = orch
        .capture_snapshots("p1", CaptureRequestOptions::default())
        .await;
    assert_eq!(first.captured_count, 2);
    assert_eq!(scraper.call_count(), 2);

    let second = orch
        .capture_snapshots("p1", CaptureRequestOptions::default())
        .await;

    assert!(!second.success);
    assert_eq!(second.captured_count, 0);
    let error = second.error.expect("quota failure should carry an error");
    assert_eq!(error.kind, ErrorKind::RateLimit);
    assert!(error.message.contains('2'), "message should name the limit: {}", error.message);
    assert_eq!(scraper.call_count(), 2);
}

#[tokio::test]
async fn test_open_breaker_refuses_batch() {
    let scraper = Arc::new(FakeScraper::new(Duration::from_millis(1)));
    let orch = build(
        test_config(),
        scraper.clone(),
        vec![project("p1", &["https://alpha.com"])],
    );

    for _ in 0..5 {
        orch.breaker().record_failure();
    }
    assert_eq!(orch.breaker().phase(), BreakerPhase::Open);

    let result = orch
        .capture_snapshots("p1", CaptureRequestOptions::default())
        .await;

    assert!(!result.success);
    assert!(result.circuit_breaker_activated);
    assert_eq!(result.error.unwrap().kind, ErrorKind::CircuitBreaker);
    assert_eq!(scraper.call_count(), 0);
    assert_eq!(orch.get_system_status().daily_snapshot_count, 0);
}

#[tokio::test]
async fn test_failures_open_breaker_after_five_outcomes() {
    let sites = [
        "https://a1.com",
        "https://a2.com",
        "https://a3.com",
        "https://a4.com",
        "https://a5.com",
    ];
    let mut scraper = FakeScraper::new(Duration::from_millis(1));
    for site in &sites {
        scraper = scraper.with(site, Behavior::Fail(ScrapeError::new("DNS lookup failed")));
    }
    let scraper = Arc::new(scraper);

    let orch = build(
        test_config(),
        scraper.clone(),
        vec![project("four", &sites[..4]), project("five", &sites)],
    );

    let result = orch
        .capture_snapshots("four", CaptureRequestOptions::default())
        .await;
    assert_eq!(result.failures.len(), 4);
    assert!(result
        .failures
        .iter()
        .all(|f| f.error_type == ErrorKind::Network));
    assert!(!result.circuit_breaker_activated);
    assert_eq!(orch.breaker().phase(), BreakerPhase::Closed);

    // The fifth failure crosses the minimum observation count
    let result = orch
        .capture_snapshots("five", CaptureRequestOptions::default())
        .await;
    assert!(result.circuit_breaker_activated);
    assert_eq!(orch.breaker().phase(), BreakerPhase::Open);

    let calls_before = scraper.call_count();
    let refused = orch
        .capture_snapshots("four", CaptureRequestOptions::default())
        .await;
    assert_eq!(refused.error.unwrap().kind, ErrorKind::CircuitBreaker);
    assert_eq!(scraper.call_count(), calls_before);
}

#[tokio::test]
async fn test_breaker_recovers_after_window() {
    let scraper = Arc::new(FakeScraper::new(Duration::from_millis(1)));
    let config = CaptureConfig {
        circuit_breaker_window_ms: 50,
        ..test_config()
    };
    let orch = build(
        config,
        scraper.clone(),
        vec![project(
            "p1",
            &["https://a.com", "https://b.com", "https://c.com"],
        )],
    );

    for _ in 0..5 {
        orch.breaker().record_failure();
    }
    tokio::time::sleep(Duration::from_millis(80)).await;

    // Half-open admits the batch; three successes close the breaker again
    let result = orch
        .capture_snapshots("p1", CaptureRequestOptions::default())
        .await;
    assert!(result.success);
    assert_eq!(result.captured_count, 3);
    assert_eq!(orch.breaker().phase(), BreakerPhase::Closed);
}

#[tokio::test]
async fn test_missing_or_empty_project_is_not_an_error() {
    let scraper = Arc::new(FakeScraper::new(Duration::from_millis(1)));
    let orch = build(test_config(), scraper.clone(), vec![project("empty", &[])]);

    for project_id in ["empty", "missing"] {
        let result = orch
            .capture_snapshots(project_id, CaptureRequestOptions::default())
            .await;
        assert!(!result.success);
        assert_eq!(result.captured_count, 0);
        assert!(result.error.is_none());
        assert!(result.failures.is_empty());
    }
    assert_eq!(scraper.call_count(), 0);
}

#[tokio::test]
async fn test_repository_error_becomes_failed_result() {
    let scraper = Arc::new(FakeScraper::new(Duration::from_millis(1)));
    let orch =
        CaptureOrchestrator::new(test_config(), scraper.clone(), Arc::new(FailingRepository))
            .unwrap();

    let result = orch
        .capture_snapshots("p1", CaptureRequestOptions::default())
        .await;

    assert!(!result.success);
    let error = result.error.unwrap();
    assert_eq!(error.kind, ErrorKind::Unknown);
    assert!(error.message.contains("connection pool exhausted"));
    assert_eq!(scraper.call_count(), 0);
}

#[tokio::test]
async fn test_global_and_project_limits_hold_across_batches() {
    let scraper = Arc::new(FakeScraper::new(Duration::from_millis(30)));
    let config = CaptureConfig {
        max_concurrent_per_project: 1,
        max_global_concurrent: 2,
        ..test_config()
    };

    let projects: Vec<Project> = ["p1", "p2", "p3"]
        .iter()
        .map(|id| {
            let sites: Vec<String> = (0..4).map(|i| format!("https://{}-site{}.com", id, i)).collect();
            let refs: Vec<&str> = sites.iter().map(|s| s.as_str()).collect();
            project(id, &refs)
        })
        .collect();
    let orch = build(config, scraper.clone(), projects);

    let (r1, r2, r3) = tokio::join!(
        orch.capture_snapshots("p1", CaptureRequestOptions::default()),
        orch.capture_snapshots("p2", CaptureRequestOptions::default()),
        orch.capture_snapshots("p3", CaptureRequestOptions::default()),
    );

    for result in [&r1, &r2, &r3] {
        assert!(result.success);
        assert_eq!(result.captured_count, 4);
        assert_eq!(result.resource_usage.max_concurrent_reached, 1);
    }
    assert_eq!(scraper.call_count(), 12);
    assert!(scraper.global_peak() <= 2);
    for id in ["p1", "p2", "p3"] {
        assert_eq!(scraper.project_peak(id), 1);
    }
}

#[tokio::test]
async fn test_project_limit_caps_single_batch() {
    let scraper = Arc::new(FakeScraper::new(Duration::from_millis(30)));
    let config = CaptureConfig {
        max_concurrent_per_project: 2,
        ..test_config()
    };
    let sites: Vec<String> = (0..6).map(|i| format!("https://site{}.com", i)).collect();
    let refs: Vec<&str> = sites.iter().map(|s| s.as_str()).collect();
    let orch = build(config, scraper.clone(), vec![project("p1", &refs)]);

    let result = orch
        .capture_snapshots("p1", CaptureRequestOptions::default())
        .await;

    assert_eq!(result.captured_count, 6);
    assert!(result.resource_usage.max_concurrent_reached <= 2);
    assert!(scraper.project_peak("p1") <= 2);
}

#[tokio::test]
async fn test_same_domain_calls_are_spaced() {
    let interval = Duration::from_millis(100);
    let scraper = Arc::new(FakeScraper::new(Duration::from_millis(5)));
    let config = CaptureConfig {
        per_domain_throttle_ms: interval.as_millis() as u64,
        ..test_config()
    };
    let orch = build(
        config,
        scraper.clone(),
        vec![project(
            "p1",
            &[
                "https://same.com/a",
                "https://www.same.com/b",
                "https://same.com/c",
            ],
        )],
    );

    let result = orch
        .capture_snapshots("p1", CaptureRequestOptions::default())
        .await;

    assert_eq!(result.captured_count, 3);
    assert!(result.rate_limiting_triggered);
    assert_eq!(result.resource_usage.throttled_domains, vec!["same.com"]);

    let mut starts: Vec<Instant> = scraper.calls().iter().map(|c| c.started).collect();
    starts.sort();
    for pair in starts.windows(2) {
        assert!(
            pair[1] - pair[0] >= interval,
            "calls only {:?} apart",
            pair[1] - pair[0]
        );
    }
}

#[tokio::test]
async fn test_batch_timeout_abandons_slow_captures() {
    let scraper = Arc::new(
        FakeScraper::new(Duration::from_millis(5)).with("https://slow.com", Behavior::Hang),
    );
    let orch = build(
        test_config(),
        scraper.clone(),
        vec![project("p1", &["https://fast.com", "https://slow.com"])],
    );

    let started = Instant::now();
    let result = orch
        .capture_snapshots(
            "p1",
            CaptureRequestOptions::default().with_max_wait_time(Duration::from_millis(200)),
        )
        .await;

    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(!result.success);
    assert_eq!(result.captured_count, 1);
    assert_eq!(result.error.as_ref().unwrap().kind, ErrorKind::Timeout);

    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].domain, "slow.com");
    assert_eq!(result.failures[0].error_type, ErrorKind::Timeout);

    // Only completed captures count against the quota and the breaker
    let status = orch.get_system_status();
    assert_eq!(status.daily_snapshot_count, 1);
    assert_eq!(status.circuit_breaker.error_count, 0);
    assert_eq!(status.active_captures, 0);
}

#[tokio::test]
async fn test_config_budget_applies_without_override() {
    let scraper =
        Arc::new(FakeScraper::new(Duration::from_millis(5)).with("https://slow.com", Behavior::Hang));
    let config = CaptureConfig {
        max_total_capture_time_ms: 150,
        ..test_config()
    };
    let orch = build(config, scraper, vec![project("p1", &["https://slow.com"])]);

    let result = orch
        .capture_snapshots("p1", CaptureRequestOptions::default())
        .await;

    assert!(!result.success);
    assert!(result.error.unwrap().message.contains("150ms"));
}

#[tokio::test]
async fn test_timeout_falls_back_without_javascript() {
    let scraper = Arc::new(JavascriptTimeoutScraper {
        calls: Mutex::new(Vec::new()),
        fallback_succeeds: true,
    });
    // "shop" classifies as ecommerce, which requires JavaScript
    let orch = build(
        test_config(),
        scraper.clone(),
        vec![project("p1", &["https://shop.example.com"])],
    );

    let result = orch
        .capture_snapshots("p1", CaptureRequestOptions::default())
        .await;

    assert!(result.success);
    assert_eq!(result.captured_count, 1);

    let calls = scraper.calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].enable_javascript);
    assert_eq!(calls[0].timeout_ms, 20_000);
    assert!(!calls[1].enable_javascript);
    assert_eq!(calls[1].timeout_ms, 15_000);
}

#[tokio::test]
async fn test_failed_fallback_is_reported() {
    let scraper = Arc::new(JavascriptTimeoutScraper {
        calls: Mutex::new(Vec::new()),
        fallback_succeeds: false,
    });
    let orch = build(
        test_config(),
        scraper.clone(),
        vec![project("p1", &["https://shop.example.com"])],
    );

    let result = orch
        .capture_snapshots("p1", CaptureRequestOptions::default())
        .await;

    assert!(!result.success);
    assert_eq!(result.failures.len(), 1);
    assert!(result.failures[0].fallback_used);
    assert_eq!(result.failures[0].error_type, ErrorKind::Timeout);
    assert_eq!(scraper.calls.lock().unwrap().len(), 2);

    // One competitor, one breaker outcome
    assert_eq!(orch.get_system_status().circuit_breaker.error_count, 1);
}

#[tokio::test]
async fn test_fallback_can_be_disabled() {
    let scraper = Arc::new(JavascriptTimeoutScraper {
        calls: Mutex::new(Vec::new()),
        fallback_succeeds: true,
    });
    let config = CaptureConfig {
        fallback_on_timeout: false,
        ..test_config()
    };
    let orch = build(
        config,
        scraper.clone(),
        vec![project("p1", &["https://shop.example.com"])],
    );

    let result = orch
        .capture_snapshots("p1", CaptureRequestOptions::default())
        .await;

    assert!(!result.success);
    assert!(!result.failures[0].fallback_used);
    assert_eq!(scraper.calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_profile_drives_capture_options() {
    let scraper = Arc::new(FakeScraper::new(Duration::from_millis(1)));
    let orch = build(
        test_config(),
        scraper.clone(),
        vec![project(
            "p1",
            &["uber.com", "https://blog.example.com", "https://crmhub.io"],
        )],
    );

    orch.capture_snapshots("p1", CaptureRequestOptions::default())
        .await;

    let calls = scraper.calls();
    let options_for = |website: &str| {
        calls
            .iter()
            .find(|c| c.website == website)
            .map(|c| c.options.clone())
            .unwrap()
    };

    let uber = options_for("uber.com");
    assert_eq!(uber.timeout_ms, 30_000);
    assert!(uber.enable_javascript);

    let blog = options_for("https://blog.example.com");
    assert_eq!(blog.timeout_ms, 15_000);
    assert_eq!(blog.retries, 1);
    assert!(!blog.enable_javascript);

    let crm = options_for("https://crmhub.io");
    assert_eq!(crm.timeout_ms, 25_000);
}

#[tokio::test]
async fn test_progress_is_reported_per_competitor() {
    let scraper = Arc::new(FakeScraper::new(Duration::from_millis(1)));
    let sink = Arc::new(RecordingSink::default());
    let orch = build(
        test_config(),
        scraper,
        vec![project("p1", &["https://a.com", "https://b.com", "https://c.com"])],
    )
    .with_progress_sink(sink.clone());

    orch.capture_snapshots("p1", CaptureRequestOptions::default())
        .await;

    let mut events = sink.events.lock().unwrap().clone();
    events.sort_by_key(|e| e.1);
    assert_eq!(events.len(), 3);
    for (i, (project_id, index, total, _)) in events.iter().enumerate() {
        assert_eq!(project_id, "p1");
        assert_eq!(*index, i);
        assert_eq!(*total, 3);
    }
}

#[tokio::test]
async fn test_update_config_shrinks_global_limit() {
    let scraper = Arc::new(FakeScraper::new(Duration::from_millis(20)));
    let sites: Vec<String> = (0..4).map(|i| format!("https://site{}.com", i)).collect();
    let refs: Vec<&str> = sites.iter().map(|s| s.as_str()).collect();
    let orch = build(test_config(), scraper.clone(), vec![project("p1", &refs)]);

    let patch = CaptureConfigPatch {
        max_concurrent_per_project: Some(1),
        max_global_concurrent: Some(1),
        ..Default::default()
    };
    orch.update_config(&patch).unwrap();

    let result = orch
        .capture_snapshots("p1", CaptureRequestOptions::default())
        .await;

    assert_eq!(result.captured_count, 4);
    assert_eq!(result.resource_usage.max_concurrent_reached, 1);
    assert_eq!(scraper.global_peak(), 1);
    assert_eq!(orch.get_system_status().global_concurrency_limit, 1);
}

#[tokio::test]
async fn test_update_config_rejects_per_project_above_global() {
    let scraper = Arc::new(FakeScraper::new(Duration::from_millis(1)));
    let orch = build(test_config(), scraper, vec![]);

    let patch = CaptureConfigPatch {
        max_global_concurrent: Some(2),
        ..Default::default()
    };
    assert!(orch.update_config(&patch).is_err());
    assert_eq!(orch.get_system_status().global_concurrency_limit, 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_captures_finishing_at_the_deadline_are_counted_once() {
    let delay = Duration::from_millis(40);
    let scraper = Arc::new(FakeScraper::new(delay));
    let sites: Vec<String> = (0..8).map(|i| format!("https://edge{}.com", i)).collect();
    let refs: Vec<&str> = sites.iter().map(|s| s.as_str()).collect();
    let config = CaptureConfig {
        max_concurrent_per_project: 8,
        ..test_config()
    };
    let orch = build(config, scraper, vec![project("p1", &refs)]);

    let mut captured_total = 0;
    for round in 0..20 {
        let result = orch
            .capture_snapshots(
                "p1",
                CaptureRequestOptions::default().with_max_wait_time(delay),
            )
            .await;

        assert_eq!(
            result.captured_count + result.failures.len(),
            8,
            "round {} lost or double counted a competitor",
            round
        );
        assert_eq!(result.snapshot_ids.len(), result.captured_count);
        captured_total += result.captured_count;

        let status = orch.get_system_status();
        assert_eq!(status.circuit_breaker.success_count as usize, captured_total);
        assert_eq!(status.daily_snapshot_count as usize, captured_total);
        assert_eq!(status.circuit_breaker.error_count, 0);
    }
}
