//! Unit tests for the watchlog database layer (connection + migrations).

use rusqlite::params;
use tempfile::TempDir;

use watchlog::database::migrations::{get_schema_version, CURRENT_SCHEMA_VERSION};
use watchlog::database::Database;

fn object_exists(db: &Database, kind: &str, name: &str) -> bool {
    db.connection()
        .query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = ?1 AND name = ?2",
            params![kind, name],
            |row| row.get(0),
        )
        .unwrap_or(false)
}

#[test]
fn test_open_in_memory_succeeds() {
    let db = Database::open_in_memory();
    assert!(db.is_ok(), "open_in_memory should succeed");
}

#[test]
fn test_migrations_create_all_tables() {
    let db = Database::open_in_memory().expect("open_in_memory failed");
    for table in ["streams", "stream_history", "search_history", "stream_state", "schema_version"] {
        assert!(object_exists(&db, "table", table), "Table '{}' should exist", table);
    }
}

#[test]
fn test_migrations_create_indexes() {
    let db = Database::open_in_memory().expect("open_in_memory failed");
    for index in [
        "idx_stream_history_access_date",
        "idx_search_history_search",
        "idx_search_history_creation_date",
    ] {
        assert!(object_exists(&db, "index", index), "Index '{}' should exist", index);
    }
}

#[test]
fn test_schema_version_is_current() {
    let db = Database::open_in_memory().unwrap();
    assert_eq!(get_schema_version(db.connection()), CURRENT_SCHEMA_VERSION);
}

/// Reopening a file database keeps data and does not re-run migrations.
#[test]
fn test_reopen_on_disk_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("watchlog.db");

    {
        let db = Database::open(&path).unwrap();
        db.connection()
            .execute(
                "INSERT INTO search_history (creation_date, service_id, search) VALUES (1, 0, 'kept')",
                [],
            )
            .unwrap();
    }

    let db = Database::open(&path).unwrap();
    let count: i64 = db
        .connection()
        .query_row("SELECT COUNT(*) FROM search_history", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);

    let versions: i64 = db
        .connection()
        .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
        .unwrap();
    assert_eq!(versions, CURRENT_SCHEMA_VERSION as i64);
}

/// Deleting a stream row removes its history and state rows.
#[test]
fn test_stream_delete_cascades() {
    let db = Database::open_in_memory().unwrap();
    let conn = db.connection();

    conn.execute(
        "INSERT INTO streams (service_id, url) VALUES (0, 'https://example.com/v')",
        [],
    )
    .unwrap();
    let uid = conn.last_insert_rowid();
    conn.execute(
        "INSERT INTO stream_history (stream_id, access_date, repeat_count) VALUES (?1, 1, 1)",
        params![uid],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO stream_state (stream_id, progress_millis) VALUES (?1, 100)",
        params![uid],
    )
    .unwrap();

    conn.execute("DELETE FROM streams WHERE uid = ?1", params![uid]).unwrap();

    let remaining: i64 = conn
        .query_row(
            "SELECT (SELECT COUNT(*) FROM stream_history) + (SELECT COUNT(*) FROM stream_state)",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(remaining, 0);
}

#[test]
fn test_stream_identity_is_unique() {
    let db = Database::open_in_memory().unwrap();
    let conn = db.connection();
    conn.execute(
        "INSERT INTO streams (service_id, url) VALUES (0, 'https://example.com/v')",
        [],
    )
    .unwrap();
    let dup = conn.execute(
        "INSERT INTO streams (service_id, url) VALUES (0, 'https://example.com/v')",
        [],
    );
    assert!(dup.is_err());
}
