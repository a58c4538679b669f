//! SQLite schema definitions and migrations.

use rusqlite::{Connection, OptionalExtension};

use crate::error::StoreResult;

use super::backend::internal_error;

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema.
pub fn initialize_schema(conn: &Connection) -> StoreResult<()> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        create_schema_v1(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version > SCHEMA_VERSION {
        return Err(internal_error(format!(
            "Database schema version {} is newer than supported version {}",
            current_version, SCHEMA_VERSION
        )));
    }

    Ok(())
}

/// Get the current schema version, or 0 for a fresh database.
fn get_schema_version(conn: &Connection) -> StoreResult<i32> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER NOT NULL
        )",
        [],
    )
    .map_err(|e| internal_error(format!("Failed to create schema_version table: {}", e)))?;

    let version: Option<i32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .optional()
        .map_err(|e| internal_error(format!("Failed to read schema_version: {}", e)))?;

    Ok(version.unwrap_or(0))
}

fn set_schema_version(conn: &Connection, version: i32) -> StoreResult<()> {
    conn.execute("DELETE FROM schema_version", [])
        .map_err(|e| internal_error(format!("Failed to clear schema_version: {}", e)))?;

    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])
        .map_err(|e| internal_error(format!("Failed to set schema_version: {}", e)))?;

    Ok(())
}

/// Create the initial schema (version 1).
fn create_schema_v1(conn: &Connection) -> StoreResult<()> {
    // `seq` preserves insertion order; AUTOINCREMENT keeps it from reusing
    // values of purged rows.
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS annotations (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            image_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            version INTEGER NOT NULL,
            payload TEXT NOT NULL,
            study_id TEXT,
            patient_id TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            is_deleted INTEGER NOT NULL DEFAULT 0,
            deleted_by TEXT,
            deleted_at TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_annotations_image_version
            ON annotations(image_id, version);
        CREATE INDEX IF NOT EXISTS idx_annotations_study
            ON annotations(study_id);
        CREATE INDEX IF NOT EXISTS idx_annotations_patient
            ON annotations(patient_id);

        CREATE TABLE IF NOT EXISTS version_counters (
            image_id TEXT PRIMARY KEY,
            version INTEGER NOT NULL
        );",
    )
    .map_err(|e| internal_error(format!("Failed to create annotation tables: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_exists(conn: &Connection, name: &str) -> bool {
        conn.query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |_| Ok(()),
        )
        .is_ok()
    }

    #[test]
    fn test_fresh_schema() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        assert!(table_exists(&conn, "annotations"));
        assert!(table_exists(&conn, "version_counters"));
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        initialize_schema(&conn).unwrap();

        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_newer_schema_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        set_schema_version(&conn, SCHEMA_VERSION + 1).unwrap();

        assert!(initialize_schema(&conn).is_err());
    }
}
