//! Storage module for persisting capture data
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Projects and competitors seeded from the config file
//! - Snapshot records written by the HTTP scraper
//! - Batch history for the `history` command

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{SnapshotStore, Storage, StorageError, StorageResult};

use crate::capture::OptimizedSnapshotResult;
use crate::SnapshotError;
use std::path::Path;

/// Opens or creates a storage database
pub fn open_storage(path: &Path) -> Result<SqliteStorage, SnapshotError> {
    SqliteStorage::new(path)
}

/// A snapshot about to be stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSnapshot {
    pub project_id: String,
    pub competitor_id: String,
    pub url: String,
    pub final_url: String,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub title: Option<String>,
    /// SHA-256 of the body, hex encoded
    pub content_hash: String,
    pub content_length: usize,
    pub user_agent: String,
    pub javascript_requested: bool,
}

/// A stored snapshot
#[derive(Debug, Clone)]
pub struct SnapshotRecord {
    pub id: i64,
    pub project_id: String,
    pub competitor_id: String,
    pub url: String,
    pub final_url: String,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub title: Option<String>,
    pub content_hash: String,
    pub content_length: usize,
    pub user_agent: String,
    pub javascript_requested: bool,
    pub captured_at: String,
}

/// A project with capture totals
#[derive(Debug, Clone)]
pub struct ProjectSummary {
    pub id: String,
    pub name: String,
    pub competitor_count: usize,
    pub snapshot_count: u64,
    pub last_captured_at: Option<String>,
}

/// A persisted batch summary
#[derive(Debug, Clone)]
pub struct BatchRecord {
    pub id: i64,
    pub project_id: String,
    pub started_at: String,
    pub status: BatchStatus,
    pub captured_count: usize,
    pub total_competitors: usize,
    pub failure_count: usize,
    pub capture_time_ms: u64,
    pub error_kind: Option<String>,
    pub error_message: Option<String>,
}

/// How a batch ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    /// Every competitor captured
    Completed,
    /// Some competitors captured, some failed
    Partial,
    /// Nothing captured, or the batch was refused or timed out
    Failed,
}

impl BatchStatus {
    pub fn from_result(result: &OptimizedSnapshotResult) -> Self {
        if !result.success {
            Self::Failed
        } else if result.failures.is_empty() {
            Self::Completed
        } else {
            Self::Partial
        }
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Partial => "partial",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "completed" => Some(Self::Completed),
            "partial" => Some(Self::Partial),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
