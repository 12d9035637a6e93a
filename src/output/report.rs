//! Plain-text report formatting
//!
//! Every report is built as a `String` so the CLI can print it and tests
//! can inspect it.

use crate::capture::{OptimizedSnapshotResult, SystemStatus};
use crate::storage::{BatchRecord, ProjectSummary};

/// Formats the result of one capture batch
pub fn format_result(project_id: &str, result: &OptimizedSnapshotResult) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== Capture: {} ===\n\n", project_id));
    out.push_str(&format!(
        "Status: {}\n",
        if result.success { "success" } else { "failed" }
    ));
    if let Some(error) = &result.error {
        out.push_str(&format!("Error: {} [{}]\n", error.message, error.kind));
    }
    out.push_str(&format!(
        "Captured: {}/{}\n",
        result.captured_count, result.total_competitors
    ));
    out.push_str(&format!("Time: {}ms\n", result.capture_time_ms));
    out.push_str(&format!(
        "Average per snapshot: {}ms\n",
        result.resource_usage.avg_time_per_snapshot
    ));
    out.push_str(&format!(
        "Max concurrent: {}\n",
        result.resource_usage.max_concurrent_reached
    ));

    if result.rate_limiting_triggered {
        out.push_str("Rate limiting was triggered\n");
    }
    if result.circuit_breaker_activated {
        out.push_str("Circuit breaker is active\n");
    }

    if !result.resource_usage.throttled_domains.is_empty() {
        out.push_str(&format!(
            "\nThrottled domains ({}):\n",
            result.resource_usage.throttled_domains.len()
        ));
        for domain in &result.resource_usage.throttled_domains {
            out.push_str(&format!("  - {}\n", domain));
        }
    }

    if !result.failures.is_empty() {
        out.push_str(&format!("\nFailures ({}):\n", result.failures.len()));
        for failure in &result.failures {
            out.push_str(&format!(
                "  - {} ({}): {} [{}]{}\n",
                failure.competitor_name,
                failure.domain,
                failure.error,
                failure.error_type,
                if failure.fallback_used {
                    " (fallback used)"
                } else {
                    ""
                }
            ));
        }
    }

    if !result.snapshot_ids.is_empty() {
        out.push_str(&format!("\nSnapshots: {}\n", result.snapshot_ids.join(", ")));
    }

    out
}

/// Formats the engine status
pub fn format_status(status: &SystemStatus) -> String {
    let mut out = String::new();

    out.push_str("=== System Status ===\n\n");
    out.push_str(&format!("Circuit breaker: {}\n", status.circuit_breaker_state.as_str()));
    out.push_str(&format!(
        "  Errors: {}, successes: {}, error rate: {:.1}%\n",
        status.circuit_breaker.error_count,
        status.circuit_breaker.success_count,
        status.circuit_breaker.error_rate * 100.0
    ));
    if let Some(remaining) = status.circuit_breaker.open_remaining_ms {
        out.push_str(&format!("  Next attempt in: {}ms\n", remaining));
    }
    out.push_str(&format!(
        "Daily snapshots: {}/{}\n",
        status.daily_snapshot_count, status.daily_limit
    ));
    out.push_str(&format!(
        "Concurrency: {} active, global limit {}, per project {}\n",
        status.active_captures,
        status.global_concurrency_limit,
        status.config.max_concurrent_per_project
    ));
    out.push_str(&format!(
        "Domains: {} tracked, {} throttled\n",
        status.tracked_domains,
        status.active_throttled_domains.len()
    ));
    for domain in &status.active_throttled_domains {
        out.push_str(&format!("  - {}\n", domain));
    }

    out
}

/// Formats the batch history table
pub fn format_batches(batches: &[BatchRecord]) -> String {
    let mut out = String::new();

    if batches.is_empty() {
        out.push_str("No capture batches recorded\n");
        return out;
    }

    out.push_str("=== Capture History ===\n\n");
    for batch in batches {
        out.push_str(&format!(
            "#{} {} {} {}: {}/{} captured, {} failed, {}ms",
            batch.id,
            batch.started_at,
            batch.project_id,
            batch.status.to_db_string(),
            batch.captured_count,
            batch.total_competitors,
            batch.failure_count,
            batch.capture_time_ms
        ));
        if let (Some(kind), Some(message)) = (&batch.error_kind, &batch.error_message) {
            out.push_str(&format!(" ({}: {})", kind, message));
        }
        out.push('\n');
    }

    out
}

/// Formats the project list
pub fn format_projects(projects: &[ProjectSummary]) -> String {
    let mut out = String::new();

    out.push_str(&format!("Projects ({}):\n", projects.len()));
    for project in projects {
        out.push_str(&format!(
            "  - {} ({}): {} competitors, {} snapshots, last capture {}\n",
            project.id,
            project.name,
            project.competitor_count,
            project.snapshot_count,
            project.last_captured_at.as_deref().unwrap_or("never")
        ));
    }

    out
}
