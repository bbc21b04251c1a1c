//! SQLite-backed storage for users, progress and engine state.
//!
//! Provides persistent storage for:
//! - Enrolled users and their plans
//! - Per-slot progress records and the submission log
//! - Cached progress summaries
//! - Key-value store for engine state (release scan cursor)

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::migrations;
use crate::catalog::SlotKind;
use crate::error::DatabaseError;
use crate::progress::{AttemptRecord, ProgressRecord, UserProgressSummary};
use crate::user::{Plan, User, UserId};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite database shared across threads.
///
/// All access goes through one connection guarded by a mutex; writes that
/// must be atomic run inside a transaction while the guard is held.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a database file at `path`.
    pub fn open_path(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
        Self::init(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, DatabaseError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, DatabaseError> {
        conn.pragma_update(None, "foreign_keys", true)?;
        migrations::migrate(&conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub(super) fn lock(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::Poisoned)
    }

    /// Cheap liveness check.
    pub fn ping(&self) -> Result<(), DatabaseError> {
        let conn = self.lock()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    /// Insert a user. Returns `false` when the id is already taken.
    pub fn insert_user(&self, user: &User) -> Result<bool, DatabaseError> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "INSERT OR IGNORE INTO users (id, enrolled_at, tz_offset_minutes, plan)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                user.id.0,
                timestamp(user.enrolled_at),
                user.tz_offset_minutes,
                user.plan.as_str(),
            ],
        )?;
        Ok(changed == 1)
    }

    pub fn user(&self, id: UserId) -> Result<Option<User>, DatabaseError> {
        let conn = self.lock()?;
        let user = conn
            .query_row(
                "SELECT id, enrolled_at, tz_offset_minutes, plan FROM users WHERE id = ?1",
                [id.0],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    /// Returns `false` when the user does not exist.
    pub fn update_plan(&self, id: UserId, plan: Plan) -> Result<bool, DatabaseError> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE users SET plan = ?2 WHERE id = ?1",
            params![id.0, plan.as_str()],
        )?;
        Ok(changed == 1)
    }

    pub fn users(&self) -> Result<Vec<User>, DatabaseError> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT id, enrolled_at, tz_offset_minutes, plan FROM users ORDER BY id")?;
        let users = stmt
            .query_map([], user_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    /// Get a value from the key-value store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let conn = self.lock()?;
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    /// Set a value in the key-value store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

pub(super) fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_column<T, E>(idx: usize, raw: &str, parse: impl Fn(&str) -> Result<T, E>) -> rusqlite::Result<T>
where
    E: std::error::Error + Send + Sync + 'static,
{
    parse(raw).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn slot_kind(idx: usize, raw: &str) -> rusqlite::Result<SlotKind> {
    SlotKind::parse(raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("unknown slot kind '{raw}'").into(),
        )
    })
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let enrolled: String = row.get(1)?;
    let plan: String = row.get(3)?;
    Ok(User {
        id: UserId(row.get(0)?),
        enrolled_at: parse_timestamp(1, &enrolled)?,
        tz_offset_minutes: row.get(2)?,
        plan: parse_column(3, &plan, str::parse::<Plan>)?,
    })
}

/// Columns: user_id, week_number, slot_kind, completed, completed_at,
/// submitted_answer, correct, attempts.
pub(super) fn record_from_row(row: &Row<'_>) -> rusqlite::Result<ProgressRecord> {
    let kind: String = row.get(2)?;
    let completed_at: Option<String> = row.get(4)?;
    Ok(ProgressRecord {
        user_id: UserId(row.get(0)?),
        week: row.get(1)?,
        kind: slot_kind(2, &kind)?,
        completed: row.get(3)?,
        completed_at: completed_at.map(|raw| parse_timestamp(4, &raw)).transpose()?,
        submitted_answer: row.get(5)?,
        correct: row.get(6)?,
        attempts: row.get(7)?,
    })
}

/// Columns: user_id, week_number, slot_kind, answer, correct, submitted_at.
pub(super) fn attempt_from_row(row: &Row<'_>) -> rusqlite::Result<AttemptRecord> {
    let kind: String = row.get(2)?;
    let submitted_at: String = row.get(5)?;
    Ok(AttemptRecord {
        user_id: UserId(row.get(0)?),
        week: row.get(1)?,
        kind: slot_kind(2, &kind)?,
        answer: row.get(3)?,
        correct: row.get(4)?,
        submitted_at: parse_timestamp(5, &submitted_at)?,
    })
}

/// Columns: user_id, current_week, total_solved, current_streak,
/// longest_streak, total_points, last_solved_at.
pub(super) fn summary_from_row(row: &Row<'_>) -> rusqlite::Result<UserProgressSummary> {
    let last: Option<String> = row.get(6)?;
    Ok(UserProgressSummary {
        user_id: UserId(row.get(0)?),
        current_week: row.get(1)?,
        total_solved: row.get(2)?,
        current_streak: row.get(3)?,
        longest_streak: row.get(4)?,
        total_points: row.get(5)?,
        last_solved_at: last.map(|raw| parse_timestamp(6, &raw)).transpose()?,
    })
}
