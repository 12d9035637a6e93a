//! Output module for capture results and reports
//!
//! This module handles:
//! - Human-readable reports for batches, status, history and projects
//! - JSON output of batch results and engine status

mod report;

pub use report::{format_batches, format_projects, format_result, format_status};

use crate::capture::{OptimizedSnapshotResult, SystemStatus};
use crate::storage::{BatchRecord, ProjectSummary};
use serde::Serialize;

/// Serializes any report value as pretty JSON
pub fn to_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}

/// Prints a batch result to stdout
pub fn print_result(
    project_id: &str,
    result: &OptimizedSnapshotResult,
    json: bool,
) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", to_json(result)?);
    } else {
        print!("{}", format_result(project_id, result));
    }
    Ok(())
}

/// Prints the engine status to stdout
pub fn print_status(status: &SystemStatus, json: bool) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", to_json(status)?);
    } else {
        print!("{}", format_status(status));
    }
    Ok(())
}

pub fn print_batches(batches: &[BatchRecord]) {
    print!("{}", format_batches(batches));
}

pub fn print_projects(projects: &[ProjectSummary]) {
    print!("{}", format_projects(projects));
}
