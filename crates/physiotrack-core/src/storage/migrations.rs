//! Database schema migrations for physiotrack.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};
use tracing::warn;

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (initial database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: exercise library, session definitions and instances.
///
/// Definitions and instances keep their ordered exercise lists as JSON text.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS exercises (
            id                      TEXT PRIMARY KEY,
            name                    TEXT NOT NULL,
            description             TEXT NOT NULL DEFAULT '',
            exercise_type           TEXT NOT NULL,
            target_duration_secs    INTEGER,
            reps                    INTEGER,
            sets                    INTEGER,
            rep_duration_secs       INTEGER,
            pause_between_reps_secs INTEGER,
            rest_between_sets_secs  INTEGER,
            side_mode               TEXT NOT NULL DEFAULT 'bilateral',
            created_at              TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS session_definitions (
            id           TEXT PRIMARY KEY,
            name         TEXT NOT NULL,
            exercises    TEXT NOT NULL DEFAULT '[]',
            auto_advance INTEGER NOT NULL DEFAULT 0,
            created_at   TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS session_instances (
            id           TEXT PRIMARY KEY,
            session_id   TEXT NOT NULL,
            session_name TEXT NOT NULL DEFAULT '',
            date         TEXT NOT NULL,
            status       TEXT NOT NULL DEFAULT 'planned',
            started_at   TEXT,
            ended_at     TEXT,
            exercises    TEXT NOT NULL DEFAULT '[]'
        );",
    )?;

    set_schema_version(&tx, 1)?;
    tx.commit()?;
    Ok(())
}

/// Migration v2: track accumulated playback seconds for resume, and index
/// the history queries.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    let has_elapsed: bool = tx
        .query_row(
            "SELECT COUNT(*) FROM pragma_table_info('session_instances') WHERE name = 'elapsed_secs'",
            [],
            |row| row.get::<_, i32>(0),
        )
        .unwrap_or(0)
        > 0;

    if !has_elapsed {
        tx.execute_batch(
            "ALTER TABLE session_instances ADD COLUMN elapsed_secs INTEGER NOT NULL DEFAULT 0;",
        )?;
    }

    tx.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_session_instances_date ON session_instances(date);
         CREATE INDEX IF NOT EXISTS idx_session_instances_status ON session_instances(status);",
    )?;

    set_schema_version(&tx, 2)?;
    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_from_scratch() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);

        conn.execute(
            "INSERT INTO session_instances (id, session_id, date, status)
             VALUES ('i1', 's1', '2024-01-01', 'in_progress')",
            [],
        )
        .unwrap();
        let elapsed: i64 = conn
            .query_row("SELECT elapsed_secs FROM session_instances WHERE id = 'i1'", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(elapsed, 0);
    }

    #[test]
    fn test_migrate_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);
    }

    #[test]
    fn test_incremental_migration_keeps_rows() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema_version_table(&conn).unwrap();
        migrate_v1(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), 1);

        conn.execute(
            "INSERT INTO session_instances (id, session_id, session_name, date, status, exercises)
             VALUES ('old', 's1', 'Knee', '2023-12-31', 'completed', '[]')",
            [],
        )
        .unwrap();

        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), 2);

        let (name, elapsed): (String, i64) = conn
            .query_row(
                "SELECT session_name, elapsed_secs FROM session_instances WHERE id = 'old'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(name, "Knee");
        assert_eq!(elapsed, 0);
    }
}
