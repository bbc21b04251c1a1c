//! Database schema migrations for cipher-academy.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
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

/// Returns 0 for a fresh database.
pub fn get_schema_version(conn: &Connection) -> SqliteResult<i32> {
    match conn.query_row("SELECT version FROM schema_version", [], |row| row.get::<_, i32>(0)) {
        Ok(v) => Ok(v),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => Err(e),
    }
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: users, progress, the submission log, summaries and kv.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(indoc::indoc! {"
        CREATE TABLE IF NOT EXISTS users (
            id                INTEGER PRIMARY KEY,
            enrolled_at       TEXT NOT NULL,
            tz_offset_minutes INTEGER NOT NULL DEFAULT 0,
            plan              TEXT NOT NULL DEFAULT 'free_trial'
        );

        CREATE TABLE IF NOT EXISTS progress_records (
            user_id          INTEGER NOT NULL REFERENCES users(id),
            week_number      INTEGER NOT NULL,
            slot_kind        TEXT NOT NULL,
            completed        INTEGER NOT NULL DEFAULT 0,
            completed_at     TEXT,
            submitted_answer TEXT NOT NULL DEFAULT '',
            correct          INTEGER NOT NULL DEFAULT 0,
            attempts         INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (user_id, week_number, slot_kind)
        );

        CREATE TABLE IF NOT EXISTS submissions (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id      INTEGER NOT NULL REFERENCES users(id),
            week_number  INTEGER NOT NULL,
            slot_kind    TEXT NOT NULL,
            answer       TEXT NOT NULL,
            correct      INTEGER NOT NULL,
            submitted_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_submissions_user_slot
            ON submissions(user_id, week_number, slot_kind);

        CREATE TABLE IF NOT EXISTS progress_summaries (
            user_id        INTEGER PRIMARY KEY REFERENCES users(id),
            current_week   INTEGER NOT NULL,
            total_solved   INTEGER NOT NULL,
            current_streak INTEGER NOT NULL,
            longest_streak INTEGER NOT NULL,
            total_points   INTEGER NOT NULL,
            last_solved_at TEXT
        );

        CREATE TABLE IF NOT EXISTS kv (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
    "})?;

    set_schema_version(&tx, 1)?;
    tx.commit()
}
