//! Snapshot capture engine
//!
//! This module contains the capture pipeline, including:
//! - Global and per-project concurrency gates
//! - Per-domain request throttling
//! - The shared circuit breaker and daily quota
//! - Error classification and result aggregation
//! - Batch orchestration
//! - An HTTP reference scraper

mod breaker;
mod errors;
mod fetcher;
mod gates;
mod orchestrator;
mod quota;
mod result;
mod throttle;
mod traits;

pub use breaker::{CircuitBreaker, CircuitBreakerSnapshot};
pub use errors::{classify_error, ErrorKind, ScrapeError};
pub use fetcher::{build_http_client, content_hash, extract_title, fetch_url, FetchResult, HttpScraper};
pub use gates::{CapturePermit, ConcurrencyController, InFlightGauge};
pub use orchestrator::{CaptureOrchestrator, CapturePriority, CaptureRequestOptions, SystemStatus};
pub use quota::DailyQuotaTracker;
pub use result::{
    CaptureError, CaptureOutcome, CompetitorCaptureFailure, OptimizedSnapshotResult,
    ResourceUsage, ResultAggregator,
};
pub use throttle::DomainThrottle;
pub use traits::{
    CaptureOptions, Competitor, InMemoryProjectRepository, ProgressSink, Project,
    ProjectRepository, Scraper, TracingProgressSink, UserAgentHint,
};
