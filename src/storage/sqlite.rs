//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait,
//! and plugs it into the capture engine as both its project repository and
//! the scraper's snapshot store.

use crate::capture::{Competitor, OptimizedSnapshotResult, Project, ProjectRepository};
use crate::config::ProjectEntry;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{SnapshotStore, Storage, StorageError, StorageResult};
use crate::storage::{BatchRecord, BatchStatus, NewSnapshot, ProjectSummary, SnapshotRecord};
use crate::SnapshotError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SNAPSHOT_COLUMNS: &str = "id, project_id, competitor_id, url, final_url, status_code, content_type, \
     title, content_hash, content_length, user_agent, javascript_requested, captured_at";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Opens or creates the database at `path`
    pub fn new(path: &Path) -> Result<Self, SnapshotError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, SnapshotError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn snapshot_from_row(row: &Row<'_>) -> rusqlite::Result<SnapshotRecord> {
    Ok(SnapshotRecord {
        id: row.get(0)?,
        project_id: row.get(1)?,
        competitor_id: row.get(2)?,
        url: row.get(3)?,
        final_url: row.get(4)?,
        status_code: row.get(5)?,
        content_type: row.get(6)?,
        title: row.get(7)?,
        content_hash: row.get(8)?,
        content_length: row.get::<_, i64>(9)? as usize,
        user_agent: row.get(10)?,
        javascript_requested: row.get(11)?,
        captured_at: row.get(12)?,
    })
}

impl Storage for SqliteStorage {
    // ===== Projects =====

    fn upsert_project(&self, project: &ProjectEntry) -> StorageResult<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();

        tx.execute(
            "INSERT INTO projects (id, name, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, updated_at = excluded.updated_at",
            params![project.id, project.name, now],
        )?;

        // The config file is the source of truth for the competitor list
        tx.execute(
            "DELETE FROM competitors WHERE project_id = ?1",
            params![project.id],
        )?;

        for (position, competitor) in project.competitors.iter().enumerate() {
            tx.execute(
                "INSERT INTO competitors (project_id, id, name, website, position)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    project.id,
                    competitor.id,
                    competitor.name,
                    competitor.website,
                    position as i64
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn get_project(&self, project_id: &str) -> StorageResult<Option<Project>> {
        let conn = self.conn();

        let name: Option<String> = conn
            .query_row(
                "SELECT name FROM projects WHERE id = ?1",
                params![project_id],
                |row| row.get(0),
            )
            .optional()?;

        let Some(name) = name else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT id, name, website FROM competitors WHERE project_id = ?1 ORDER BY position",
        )?;
        let competitors = stmt
            .query_map(params![project_id], |row| {
                Ok(Competitor {
                    project_id: project_id.to_string(),
                    id: row.get(0)?,
                    name: row.get(1)?,
                    website: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(Project {
            id: project_id.to_string(),
            name,
            competitors,
        }))
    }

    fn list_projects(&self) -> StorageResult<Vec<ProjectSummary>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT p.id, p.name,
                    (SELECT COUNT(*) FROM competitors c WHERE c.project_id = p.id),
                    (SELECT COUNT(*) FROM snapshots s
                       JOIN competitors c
                         ON c.project_id = s.project_id AND c.id = s.competitor_id
                      WHERE c.project_id = p.id),
                    (SELECT MAX(s.captured_at) FROM snapshots s
                       JOIN competitors c
                         ON c.project_id = s.project_id AND c.id = s.competitor_id
                      WHERE c.project_id = p.id)
             FROM projects p
             ORDER BY p.id",
        )?;

        let projects = stmt
            .query_map([], |row| {
                Ok(ProjectSummary {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    competitor_count: row.get::<_, i64>(2)? as usize,
                    snapshot_count: row.get::<_, i64>(3)? as u64,
                    last_captured_at: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(projects)
    }

    // ===== Snapshots =====

    fn insert_snapshot(&self, snapshot: &NewSnapshot) -> StorageResult<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO snapshots (project_id, competitor_id, url, final_url, status_code,
                                    content_type, title, content_hash, content_length,
                                    user_agent, javascript_requested, captured_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                snapshot.project_id,
                snapshot.competitor_id,
                snapshot.url,
                snapshot.final_url,
                snapshot.status_code,
                snapshot.content_type,
                snapshot.title,
                snapshot.content_hash,
                snapshot.content_length as i64,
                snapshot.user_agent,
                snapshot.javascript_requested,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn get_snapshot(&self, id: i64) -> StorageResult<SnapshotRecord> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {} FROM snapshots WHERE id = ?1", SNAPSHOT_COLUMNS),
            params![id],
            snapshot_from_row,
        )
        .optional()?
        .ok_or(StorageError::SnapshotNotFound(id))
    }

    fn latest_snapshot(
        &self,
        project_id: &str,
        competitor_id: &str,
    ) -> StorageResult<Option<SnapshotRecord>> {
        let conn = self.conn();
        let snapshot = conn
            .query_row(
                &format!(
                    "SELECT {} FROM snapshots
                     WHERE project_id = ?1 AND competitor_id = ?2
                     ORDER BY id DESC LIMIT 1",
                    SNAPSHOT_COLUMNS
                ),
                params![project_id, competitor_id],
                snapshot_from_row,
            )
            .optional()?;
        Ok(snapshot)
    }

    fn count_snapshots(&self) -> StorageResult<u64> {
        let conn = self.conn();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM snapshots", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Batches =====

    fn record_batch(
        &self,
        project_id: &str,
        started_at: DateTime<Utc>,
        result: &OptimizedSnapshotResult,
    ) -> StorageResult<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO capture_batches (project_id, started_at, status, captured_count,
                                          total_competitors, failure_count, capture_time_ms,
                                          error_kind, error_message)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                project_id,
                started_at.to_rfc3339(),
                BatchStatus::from_result(result).to_db_string(),
                result.captured_count as i64,
                result.total_competitors as i64,
                result.failures.len() as i64,
                result.capture_time_ms as i64,
                result.error.as_ref().map(|e| e.kind.as_str()),
                result.error.as_ref().map(|e| e.message.as_str()),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn recent_batches(&self, limit: usize) -> StorageResult<Vec<BatchRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, project_id, started_at, status, captured_count, total_competitors,
                    failure_count, capture_time_ms, error_kind, error_message
             FROM capture_batches
             ORDER BY id DESC
             LIMIT ?1",
        )?;

        let batches = stmt
            .query_map(params![limit as i64], |row| {
                Ok(BatchRecord {
                    id: row.get(0)?,
                    project_id: row.get(1)?,
                    started_at: row.get(2)?,
                    status: BatchStatus::from_db_string(&row.get::<_, String>(3)?)
                        .unwrap_or(BatchStatus::Failed),
                    captured_count: row.get::<_, i64>(4)? as usize,
                    total_competitors: row.get::<_, i64>(5)? as usize,
                    failure_count: row.get::<_, i64>(6)? as usize,
                    capture_time_ms: row.get::<_, i64>(7)? as u64,
                    error_kind: row.get(8)?,
                    error_message: row.get(9)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(batches)
    }
}

#[async_trait]
impl ProjectRepository for SqliteStorage {
    async fn get_project_with_competitors(
        &self,
        project_id: &str,
    ) -> crate::Result<Option<Project>> {
        Ok(self.get_project(project_id)?)
    }
}

#[async_trait]
impl SnapshotStore for SqliteStorage {
    async fn save_snapshot(&self, snapshot: NewSnapshot) -> StorageResult<String> {
        let id = self.insert_snapshot(&snapshot)?;
        Ok(id.to_string())
    }
}
