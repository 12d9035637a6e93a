//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Sumi-Snapshot database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Projects seeded from the config file
CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Competitors tracked by each project, in config order
CREATE TABLE IF NOT EXISTS competitors (
    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    id TEXT NOT NULL,
    name TEXT NOT NULL,
    website TEXT NOT NULL,
    position INTEGER NOT NULL,
    PRIMARY KEY (project_id, id)
);

CREATE INDEX IF NOT EXISTS idx_competitors_project ON competitors(project_id);

-- Captured snapshots, keyed to (project_id, competitor_id); not a foreign
-- key so ad-hoc competitors can be captured too
CREATE TABLE IF NOT EXISTS snapshots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id TEXT NOT NULL,
    competitor_id TEXT NOT NULL,
    url TEXT NOT NULL,
    final_url TEXT NOT NULL,
    status_code INTEGER NOT NULL,
    content_type TEXT,
    title TEXT,
    content_hash TEXT NOT NULL,
    content_length INTEGER NOT NULL,
    user_agent TEXT NOT NULL,
    javascript_requested INTEGER NOT NULL DEFAULT 0,
    captured_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_snapshots_competitor ON snapshots(project_id, competitor_id);
CREATE INDEX IF NOT EXISTS idx_snapshots_captured_at ON snapshots(captured_at);

-- One row per capture_snapshots call
CREATE TABLE IF NOT EXISTS capture_batches (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id TEXT NOT NULL,
    started_at TEXT NOT NULL,
    status TEXT NOT NULL,
    captured_count INTEGER NOT NULL,
    total_competitors INTEGER NOT NULL,
    failure_count INTEGER NOT NULL,
    capture_time_ms INTEGER NOT NULL,
    error_kind TEXT,
    error_message TEXT
);

CREATE INDEX IF NOT EXISTS idx_capture_batches_project ON capture_batches(project_id);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
