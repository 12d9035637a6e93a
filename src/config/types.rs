use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure for Sumi-Snapshot
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub storage: StorageConfig,
    #[serde(default, rename = "project")]
    pub projects: Vec<ProjectEntry>,
}

/// Resource and politeness limits for the capture engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Maximum number of in-flight captures for a single project
    #[serde(rename = "max-concurrent-per-project")]
    pub max_concurrent_per_project: u32,

    /// Maximum number of in-flight captures across all projects
    #[serde(rename = "max-global-concurrent")]
    pub max_global_concurrent: u32,

    /// Minimum time between requests to the same domain (milliseconds)
    #[serde(rename = "per-domain-throttle-ms")]
    pub per_domain_throttle_ms: u64,

    /// Maximum number of snapshots captured per rolling 24 hours
    #[serde(rename = "daily-snapshot-limit")]
    pub daily_snapshot_limit: u32,

    /// Error rate (0, 1] at which the circuit breaker opens
    #[serde(rename = "circuit-breaker-error-threshold")]
    pub circuit_breaker_error_threshold: f64,

    /// How long the breaker stays open before probing again (milliseconds)
    #[serde(rename = "circuit-breaker-window-ms")]
    pub circuit_breaker_window_ms: u64,

    /// Time budget for a whole batch (milliseconds)
    #[serde(rename = "max-total-capture-time-ms")]
    pub max_total_capture_time_ms: u64,

    /// Retry a timed-out JavaScript capture once without JavaScript
    #[serde(rename = "fallback-on-timeout", default = "default_fallback_on_timeout")]
    pub fallback_on_timeout: bool,
}

fn default_fallback_on_timeout() -> bool {
    true
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_concurrent_per_project: 3,
            max_global_concurrent: 10,
            per_domain_throttle_ms: 2_000,
            daily_snapshot_limit: 1_000,
            circuit_breaker_error_threshold: 0.5,
            circuit_breaker_window_ms: 300_000,
            max_total_capture_time_ms: 600_000,
            fallback_on_timeout: true,
        }
    }
}

impl CaptureConfig {
    pub fn per_domain_throttle(&self) -> Duration {
        Duration::from_millis(self.per_domain_throttle_ms)
    }

    pub fn circuit_breaker_window(&self) -> Duration {
        Duration::from_millis(self.circuit_breaker_window_ms)
    }

    pub fn max_total_capture_time(&self) -> Duration {
        Duration::from_millis(self.max_total_capture_time_ms)
    }

    /// Returns a copy of this config with every field set in `patch` replaced
    pub fn merged(&self, patch: &CaptureConfigPatch) -> CaptureConfig {
        CaptureConfig {
            max_concurrent_per_project: patch
                .max_concurrent_per_project
                .unwrap_or(self.max_concurrent_per_project),
            max_global_concurrent: patch
                .max_global_concurrent
                .unwrap_or(self.max_global_concurrent),
            per_domain_throttle_ms: patch
                .per_domain_throttle_ms
                .unwrap_or(self.per_domain_throttle_ms),
            daily_snapshot_limit: patch
                .daily_snapshot_limit
                .unwrap_or(self.daily_snapshot_limit),
            circuit_breaker_error_threshold: patch
                .circuit_breaker_error_threshold
                .unwrap_or(self.circuit_breaker_error_threshold),
            circuit_breaker_window_ms: patch
                .circuit_breaker_window_ms
                .unwrap_or(self.circuit_breaker_window_ms),
            max_total_capture_time_ms: patch
                .max_total_capture_time_ms
                .unwrap_or(self.max_total_capture_time_ms),
            fallback_on_timeout: patch
                .fallback_on_timeout
                .unwrap_or(self.fallback_on_timeout),
        }
    }
}

/// Partial update applied at runtime through `CaptureOrchestrator::update_config`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CaptureConfigPatch {
    #[serde(rename = "max-concurrent-per-project")]
    pub max_concurrent_per_project: Option<u32>,
    #[serde(rename = "max-global-concurrent")]
    pub max_global_concurrent: Option<u32>,
    #[serde(rename = "per-domain-throttle-ms")]
    pub per_domain_throttle_ms: Option<u64>,
    #[serde(rename = "daily-snapshot-limit")]
    pub daily_snapshot_limit: Option<u32>,
    #[serde(rename = "circuit-breaker-error-threshold")]
    pub circuit_breaker_error_threshold: Option<f64>,
    #[serde(rename = "circuit-breaker-window-ms")]
    pub circuit_breaker_window_ms: Option<u64>,
    #[serde(rename = "max-total-capture-time-ms")]
    pub max_total_capture_time_ms: Option<u64>,
    #[serde(rename = "fallback-on-timeout")]
    pub fallback_on_timeout: Option<bool>,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the capture bot
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the capture bot
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the bot
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for bot-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the desktop user agent: `Name/Version (+ContactURL; ContactEmail)`
    pub fn desktop(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }

    /// Same as [`desktop`](Self::desktop) with a trailing `Mobile` token
    pub fn mobile(&self) -> String {
        format!("{} Mobile", self.desktop())
    }
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// A project and the competitors it tracks
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectEntry {
    pub id: String,
    pub name: String,
    #[serde(default, rename = "competitor")]
    pub competitors: Vec<CompetitorEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompetitorEntry {
    pub id: String,
    pub name: String,
    pub website: String,
}
