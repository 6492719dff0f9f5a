//! SQLite schema creation and versioning.

use rusqlite::Connection;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Database schema version {found} is newer than supported version {expected}")]
    VersionMismatch { expected: i32, found: i32 },
}

/// Current schema version. Increment when adding migrations.
pub const CURRENT_VERSION: i32 = 1;

/// Create all tables and indexes if they don't exist.
///
/// This is idempotent: safe to call on an existing database.
pub fn create_schema(conn: &Connection) -> Result<(), SchemaError> {
    conn.execute_batch(SCHEMA_SQL)?;
    set_schema_version(conn, CURRENT_VERSION)?;
    Ok(())
}

/// Open or create a catalog database at the given path.
pub fn open_database(path: &std::path::Path) -> Result<Connection, SchemaError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                log::debug!("Cannot create {}: {}", parent.display(), e);
            }
        }
    }

    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

    let version = get_schema_version(&conn)?;
    if version == 0 {
        create_schema(&conn)?;
    } else if version > CURRENT_VERSION {
        return Err(SchemaError::VersionMismatch {
            expected: CURRENT_VERSION,
            found: version,
        });
    }

    log::debug!(
        "Opened catalog database {} (schema v{})",
        path.display(),
        version.max(CURRENT_VERSION)
    );
    Ok(conn)
}

/// Open an in-memory database with the full schema. Useful for testing.
pub fn open_memory() -> Result<Connection, SchemaError> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    create_schema(&conn)?;
    Ok(conn)
}

/// Get the current schema version, or 0 if no schema exists.
pub fn get_schema_version(conn: &Connection) -> Result<i32, SchemaError> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<(), SchemaError> {
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

const SCHEMA_SQL: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One row per discovered game file
CREATE TABLE IF NOT EXISTS catalog_entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    file_path TEXT NOT NULL,
    size INTEGER NOT NULL,
    version TEXT,
    title TEXT NOT NULL,
    sort_title TEXT NOT NULL,
    release_date TEXT,
    game_type TEXT NOT NULL DEFAULT 'undetected',
    early_access BOOLEAN NOT NULL DEFAULT 0,
    deleted_at TEXT,
    metadata_id INTEGER REFERENCES game_metadata(id) ON DELETE SET NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
-- Soft-deleted rows may share a path with the live row
CREATE UNIQUE INDEX IF NOT EXISTS idx_entries_live_path
    ON catalog_entries(file_path) WHERE deleted_at IS NULL;
CREATE INDEX IF NOT EXISTS idx_entries_title_release ON catalog_entries(title, release_date);
CREATE INDEX IF NOT EXISTS idx_entries_sort_title ON catalog_entries(sort_title);

-- Provider, user, and merged metadata share one table
CREATE TABLE IF NOT EXISTS game_metadata (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    entry_id INTEGER NOT NULL REFERENCES catalog_entries(id) ON DELETE CASCADE,
    kind TEXT NOT NULL,
    provider_slug TEXT NOT NULL,
    provider_data_id TEXT NOT NULL,
    title TEXT,
    description TEXT,
    notes TEXT,
    release_date TEXT,
    age_rating INTEGER,
    average_playtime INTEGER,
    rating REAL,
    early_access BOOLEAN,
    cover_url TEXT,
    background_url TEXT,
    url_websites TEXT NOT NULL DEFAULT '[]',
    url_screenshots TEXT NOT NULL DEFAULT '[]',
    url_trailers TEXT NOT NULL DEFAULT '[]',
    url_gameplays TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_metadata_provider
    ON game_metadata(entry_id, provider_slug, provider_data_id) WHERE kind = 'provider';
CREATE UNIQUE INDEX IF NOT EXISTS idx_metadata_user
    ON game_metadata(entry_id) WHERE kind = 'user';
CREATE UNIQUE INDEX IF NOT EXISTS idx_metadata_merged
    ON game_metadata(entry_id) WHERE kind = 'merged';

-- Developers, publishers, genres, tags
CREATE TABLE IF NOT EXISTS named_entities (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    kind TEXT NOT NULL,
    provider_slug TEXT NOT NULL,
    provider_data_id TEXT NOT NULL,
    name TEXT NOT NULL,
    UNIQUE(kind, provider_slug, provider_data_id)
);

CREATE TABLE IF NOT EXISTS metadata_relations (
    metadata_id INTEGER NOT NULL REFERENCES game_metadata(id) ON DELETE CASCADE,
    entity_id INTEGER NOT NULL REFERENCES named_entities(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    PRIMARY KEY (metadata_id, entity_id)
);
CREATE INDEX IF NOT EXISTS idx_relations_entity ON metadata_relations(entity_id);
"#;
