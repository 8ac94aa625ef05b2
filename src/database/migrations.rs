//! Schema migrations for the watchlog SQLite database.
//!
//! Uses a `schema_version` table to track which migrations have been applied.
//! Each migration runs exactly once and is recorded with a timestamp.

use rusqlite::Connection;

/// Current schema version. Bump this when adding a new migration.
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Returns the current schema version from the database (0 if table doesn't exist).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .unwrap_or(0)
}

/// Runs all pending schema migrations against the provided connection.
///
/// Safe to call on every startup.
///
/// # Errors
/// Returns `rusqlite::Error` if any SQL statement fails.
pub fn run_all(conn: &Connection) -> Result<(), rusqlite::Error> {
    // Enable WAL and foreign keys (always, not versioned)
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         CREATE TABLE IF NOT EXISTS schema_version (
             version INTEGER PRIMARY KEY,
             applied_at INTEGER NOT NULL,
             description TEXT NOT NULL
         );",
    )?;

    let current = get_schema_version(conn);

    if current < 1 {
        migration_v1(conn)?;
        record_version(conn, 1, "Initial schema: streams, stream history, search history")?;
    }

    if current < 2 {
        migration_v2(conn)?;
        record_version(conn, 2, "Add stream_state for playback progress")?;
    }

    Ok(())
}

fn record_version(conn: &Connection, version: i32, description: &str) -> Result<(), rusqlite::Error> {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at, description) VALUES (?1, ?2, ?3)",
        rusqlite::params![version, now, description],
    )?;
    Ok(())
}

/// V1: streams, one history row per stream, and the search log.
fn migration_v1(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS streams (
            uid INTEGER PRIMARY KEY AUTOINCREMENT,
            service_id INTEGER NOT NULL,
            url TEXT NOT NULL,
            title TEXT NOT NULL DEFAULT '',
            uploader TEXT NOT NULL DEFAULT '',
            duration INTEGER NOT NULL DEFAULT 0,
            thumbnail_url TEXT,
            UNIQUE(service_id, url)
        );

        CREATE TABLE IF NOT EXISTS stream_history (
            stream_id INTEGER PRIMARY KEY,
            access_date INTEGER NOT NULL,
            repeat_count INTEGER NOT NULL DEFAULT 1,
            FOREIGN KEY (stream_id) REFERENCES streams(uid) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_stream_history_access_date ON stream_history(access_date);

        CREATE TABLE IF NOT EXISTS search_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            creation_date INTEGER NOT NULL,
            service_id INTEGER NOT NULL,
            search TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_search_history_search ON search_history(search);
        CREATE INDEX IF NOT EXISTS idx_search_history_creation_date ON search_history(creation_date);
        ",
    )?;
    Ok(())
}

/// V2: saved playback positions.
fn migration_v2(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS stream_state (
            stream_id INTEGER PRIMARY KEY,
            progress_millis INTEGER NOT NULL,
            FOREIGN KEY (stream_id) REFERENCES streams(uid) ON DELETE CASCADE
        );
        ",
    )?;
    Ok(())
}
