//! Storage traits and error types

use crate::capture::{OptimizedSnapshotResult, Project};
use crate::config::ProjectEntry;
use crate::storage::{BatchRecord, NewSnapshot, ProjectSummary, SnapshotRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Snapshot not found: {0}")]
    SnapshotNotFound(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Methods take `&self`; implementations serialize access internally so one
/// store can be shared by the engine, the scraper and the CLI.
pub trait Storage {
    // ===== Projects =====

    /// Inserts or replaces a project and its competitor list
    fn upsert_project(&self, project: &ProjectEntry) -> StorageResult<()>;

    /// Loads a project with its competitors in config order
    fn get_project(&self, project_id: &str) -> StorageResult<Option<Project>>;

    /// Lists every project with capture totals
    fn list_projects(&self) -> StorageResult<Vec<ProjectSummary>>;

    // ===== Snapshots =====

    /// Stores a snapshot and returns its row id
    fn insert_snapshot(&self, snapshot: &NewSnapshot) -> StorageResult<i64>;

    fn get_snapshot(&self, id: i64) -> StorageResult<SnapshotRecord>;

    /// Most recent snapshot of a competitor
    fn latest_snapshot(
        &self,
        project_id: &str,
        competitor_id: &str,
    ) -> StorageResult<Option<SnapshotRecord>>;

    fn count_snapshots(&self) -> StorageResult<u64>;

    // ===== Batches =====

    /// Persists the summary of a finished batch
    fn record_batch(
        &self,
        project_id: &str,
        started_at: DateTime<Utc>,
        result: &OptimizedSnapshotResult,
    ) -> StorageResult<i64>;

    /// Most recent batches, newest first
    fn recent_batches(&self, limit: usize) -> StorageResult<Vec<BatchRecord>>;
}

/// Destination for snapshots produced by a scraper
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Saves a snapshot and returns its id
    async fn save_snapshot(&self, snapshot: NewSnapshot) -> StorageResult<String>;
}
