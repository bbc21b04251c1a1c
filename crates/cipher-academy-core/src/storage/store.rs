//! The storage seam the engine depends on.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::database::{attempt_from_row, record_from_row, summary_from_row, timestamp, Database};
use crate::catalog::SlotKey;
use crate::error::DatabaseError;
use crate::progress::{AttemptRecord, ProgressRecord, UserProgressSummary};
use crate::user::{Plan, User, UserId};

/// One evaluated answer, ready to be recorded.
#[derive(Debug, Clone, Copy)]
pub struct Submission<'a> {
    pub user_id: UserId,
    pub key: SlotKey,
    pub answer: &'a str,
    pub correct: bool,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// The attempt was counted. `summary` is set when the answer was correct.
    Recorded {
        record: ProgressRecord,
        summary: Option<UserProgressSummary>,
    },
    /// The slot was already completed when the write happened; nothing changed.
    AlreadyCompleted,
}

/// Durable per-user state.
///
/// Implementations must make [`ProgressStore::apply_submission`] atomic per
/// (user, slot): the completed check, the attempt increment, the log append
/// and the summary write happen as one unit, and at most one concurrent
/// correct submission may complete a slot.
pub trait ProgressStore: Send + Sync {
    /// Returns `false` if a user with the same id exists.
    fn insert_user(&self, user: &User) -> Result<bool, DatabaseError>;

    fn user(&self, id: UserId) -> Result<Option<User>, DatabaseError>;

    /// Returns `false` if the user does not exist.
    fn update_plan(&self, id: UserId, plan: Plan) -> Result<bool, DatabaseError>;

    fn users(&self) -> Result<Vec<User>, DatabaseError>;

    fn record(&self, user_id: UserId, key: SlotKey) -> Result<Option<ProgressRecord>, DatabaseError>;

    /// All records for a user, in global slot order.
    fn records(&self, user_id: UserId) -> Result<Vec<ProgressRecord>, DatabaseError>;

    /// Record one attempt. `summarize` runs on the user's updated record set
    /// inside the same unit of work when the answer is correct.
    fn apply_submission(
        &self,
        submission: &Submission<'_>,
        summarize: &dyn Fn(&[ProgressRecord]) -> UserProgressSummary,
    ) -> Result<SubmissionOutcome, DatabaseError>;

    fn summary(&self, user_id: UserId) -> Result<Option<UserProgressSummary>, DatabaseError>;

    fn store_summary(&self, summary: &UserProgressSummary) -> Result<(), DatabaseError>;

    /// Submission log for one slot, oldest first.
    fn attempts(&self, user_id: UserId, key: SlotKey) -> Result<Vec<AttemptRecord>, DatabaseError>;

    fn ping(&self) -> Result<(), DatabaseError>;
}

const RECORD_COLUMNS: &str = "user_id, week_number, slot_kind, completed, completed_at, \
                              submitted_answer, correct, attempts";

fn load_records(conn: &Connection, user_id: UserId) -> rusqlite::Result<Vec<ProgressRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECORD_COLUMNS} FROM progress_records WHERE user_id = ?1
         ORDER BY week_number,
                  CASE slot_kind WHEN 'opener' THEN 0 WHEN 'midweek' THEN 1 ELSE 2 END"
    ))?;
    let records = stmt
        .query_map([user_id.0], record_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

fn write_summary(conn: &Connection, summary: &UserProgressSummary) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO progress_summaries
             (user_id, current_week, total_solved, current_streak, longest_streak,
              total_points, last_solved_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(user_id) DO UPDATE SET
             current_week = excluded.current_week,
             total_solved = excluded.total_solved,
             current_streak = excluded.current_streak,
             longest_streak = excluded.longest_streak,
             total_points = excluded.total_points,
             last_solved_at = excluded.last_solved_at",
        params![
            summary.user_id.0,
            summary.current_week,
            summary.total_solved,
            summary.current_streak,
            summary.longest_streak,
            summary.total_points,
            summary.last_solved_at.map(timestamp),
        ],
    )?;
    Ok(())
}

impl ProgressStore for Database {
    fn insert_user(&self, user: &User) -> Result<bool, DatabaseError> {
        Database::insert_user(self, user)
    }

    fn user(&self, id: UserId) -> Result<Option<User>, DatabaseError> {
        Database::user(self, id)
    }

    fn update_plan(&self, id: UserId, plan: Plan) -> Result<bool, DatabaseError> {
        Database::update_plan(self, id, plan)
    }

    fn users(&self) -> Result<Vec<User>, DatabaseError> {
        Database::users(self)
    }

    fn record(&self, user_id: UserId, key: SlotKey) -> Result<Option<ProgressRecord>, DatabaseError> {
        let conn = self.lock()?;
        let record = conn
            .query_row(
                &format!(
                    "SELECT {RECORD_COLUMNS} FROM progress_records
                     WHERE user_id = ?1 AND week_number = ?2 AND slot_kind = ?3"
                ),
                params![user_id.0, key.week, key.kind.as_str()],
                record_from_row,
            )
            .optional()?;
        Ok(record)
    }

    fn records(&self, user_id: UserId) -> Result<Vec<ProgressRecord>, DatabaseError> {
        let conn = self.lock()?;
        Ok(load_records(&conn, user_id)?)
    }

    fn apply_submission(
        &self,
        submission: &Submission<'_>,
        summarize: &dyn Fn(&[ProgressRecord]) -> UserProgressSummary,
    ) -> Result<SubmissionOutcome, DatabaseError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let at = timestamp(submission.at);
        let completed_at = submission.correct.then(|| at.clone());

        // The conditional upsert is the gate: a completed row is never touched.
        let record = tx
            .query_row(
                &format!(
                    "INSERT INTO progress_records ({RECORD_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?4, 1)
                     ON CONFLICT(user_id, week_number, slot_kind) DO UPDATE SET
                         completed = excluded.completed,
                         completed_at = excluded.completed_at,
                         submitted_answer = excluded.submitted_answer,
                         correct = excluded.correct,
                         attempts = progress_records.attempts + 1
                     WHERE progress_records.completed = 0
                     RETURNING {RECORD_COLUMNS}"
                ),
                params![
                    submission.user_id.0,
                    submission.key.week,
                    submission.key.kind.as_str(),
                    submission.correct,
                    completed_at,
                    submission.answer,
                ],
                record_from_row,
            )
            .optional()?;

        let Some(record) = record else {
            return Ok(SubmissionOutcome::AlreadyCompleted);
        };

        tx.execute(
            "INSERT INTO submissions (user_id, week_number, slot_kind, answer, correct, submitted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                submission.user_id.0,
                submission.key.week,
                submission.key.kind.as_str(),
                submission.answer,
                submission.correct,
                at,
            ],
        )?;

        let summary = if submission.correct {
            let summary = summarize(&load_records(&tx, submission.user_id)?);
            write_summary(&tx, &summary)?;
            Some(summary)
        } else {
            None
        };

        tx.commit()?;
        Ok(SubmissionOutcome::Recorded { record, summary })
    }

    fn summary(&self, user_id: UserId) -> Result<Option<UserProgressSummary>, DatabaseError> {
        let conn = self.lock()?;
        let summary = conn
            .query_row(
                "SELECT user_id, current_week, total_solved, current_streak, longest_streak,
                        total_points, last_solved_at
                 FROM progress_summaries WHERE user_id = ?1",
                [user_id.0],
                summary_from_row,
            )
            .optional()?;
        Ok(summary)
    }

    fn store_summary(&self, summary: &UserProgressSummary) -> Result<(), DatabaseError> {
        let conn = self.lock()?;
        Ok(write_summary(&conn, summary)?)
    }

    fn attempts(&self, user_id: UserId, key: SlotKey) -> Result<Vec<AttemptRecord>, DatabaseError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT user_id, week_number, slot_kind, answer, correct, submitted_at
             FROM submissions
             WHERE user_id = ?1 AND week_number = ?2 AND slot_kind = ?3
             ORDER BY id",
        )?;
        let attempts = stmt
            .query_map(params![user_id.0, key.week, key.kind.as_str()], attempt_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(attempts)
    }

    fn ping(&self) -> Result<(), DatabaseError> {
        Database::ping(self)
    }
}
