//! Challenge engine: gating, answer evaluation and progress.
//!
//! The engine holds no per-request state. Every decision is derived from the
//! catalog, the user's record set in the store, and the `now` the caller
//! passes in.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::catalog::{Catalog, Slot, SlotKey, SlotKind, TOTAL_WEEKS};
use crate::clock::ReleaseSchedule;
use crate::error::{
    CatalogError, DatabaseError, EngineError, NotSubmittableReason, Result, ValidationError,
};
use crate::events::{EngineEvent, EventSink, NullSink};
use crate::progress::{summarize, AttemptRecord, ProgressRecord, UserProgressSummary};
use crate::storage::{Config, ProgressStore, Submission, SubmissionOutcome};
use crate::user::{Plan, User, UserId};

/// Gate state of one slot for one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Locked,
    Available,
    Completed,
}

/// Why a slot is locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LockReason {
    NotReleased,
    /// The week is past what the user's plan may see.
    BeyondPlan { max_week: u32 },
    /// Prior-completion chaining is on and this slot waits on `prior`.
    PriorIncomplete { prior: SlotKey },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub key: SlotKey,
    pub status: SlotStatus,
    pub release_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_reason: Option<LockReason>,
}

/// One row of a user's weekly board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardEntry {
    pub slot: Slot,
    pub classification: Classification,
    pub record: Option<ProgressRecord>,
}

/// A week's three slots in day order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub user_id: UserId,
    pub week: u32,
    pub entries: Vec<BoardEntry>,
}

impl Board {
    /// First slot that can be answered right now, in day order.
    pub fn first_available(&self) -> Option<&BoardEntry> {
        self.entries
            .iter()
            .find(|e| e.classification.status == SlotStatus::Available)
    }

    pub fn is_complete(&self) -> bool {
        self.entries
            .iter()
            .all(|e| e.classification.status == SlotStatus::Completed)
    }
}

/// Result of one accepted submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Evaluation {
    Correct {
        points_awarded: u32,
        new_streak: u32,
        attempts: u32,
    },
    Incorrect {
        attempts: u32,
    },
}

impl Evaluation {
    pub fn is_correct(&self) -> bool {
        matches!(self, Evaluation::Correct { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Evaluation::Correct { attempts, .. } | Evaluation::Incorrect { attempts } => *attempts,
        }
    }
}

/// Engine knobs taken from [`Config`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub require_prior_completion: bool,
    pub max_answer_len: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for EngineSettings {
    fn from(config: &Config) -> Self {
        Self {
            require_prior_completion: config.gating.require_prior_completion,
            max_answer_len: config.answers.max_answer_len as usize,
        }
    }
}

pub struct ChallengeEngine<S> {
    catalog: Arc<Catalog>,
    store: S,
    sink: Arc<dyn EventSink>,
    settings: EngineSettings,
}

impl<S: ProgressStore> ChallengeEngine<S> {
    pub fn new(catalog: Arc<Catalog>, store: S) -> Self {
        Self {
            catalog,
            store,
            sink: Arc::new(NullSink),
            settings: EngineSettings::default(),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> EngineSettings {
        self.settings
    }

    // ── users ──────────────────────────────────────────────────────────

    /// # Errors
    /// `Validation` for a bad timezone, `DuplicateUser` if the id is taken.
    pub fn enroll(&self, user: User) -> Result<User> {
        user.validate()?;
        if !self.store.insert_user(&user).map_err(|e| storage_error(user.id, None, e))? {
            warn!(user_id = %user.id, "enrollment rejected: id already exists");
            return Err(EngineError::DuplicateUser(user.id));
        }
        info!(user_id = %user.id, plan = %user.plan, enrolled_at = %user.enrolled_at, "user enrolled");
        Ok(user)
    }

    pub fn user(&self, id: UserId) -> Result<User> {
        self.store
            .user(id)
            .map_err(|e| storage_error(id, None, e))?
            .ok_or(EngineError::UnknownUser(id))
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        self.store.users().map_err(|e| store_failure("list_users", e))
    }

    /// Hook for the subscription service.
    pub fn set_plan(&self, id: UserId, plan: Plan) -> Result<User> {
        if !self.store.update_plan(id, plan).map_err(|e| storage_error(id, None, e))? {
            return Err(EngineError::UnknownUser(id));
        }
        info!(user_id = %id, plan = %plan, "plan changed");
        self.user(id)
    }

    pub fn schedule(&self, id: UserId) -> Result<ReleaseSchedule> {
        Ok(ReleaseSchedule::for_user(&self.user(id)?)?)
    }

    /// Next slot to release for the user within their plan.
    pub fn next_release(&self, id: UserId, now: DateTime<Utc>) -> Result<Option<(SlotKey, DateTime<Utc>)>> {
        let user = self.user(id)?;
        let next = ReleaseSchedule::for_user(&user)?.next_release(now);
        Ok(next.filter(|(key, _)| user.plan.allows_week(key.week)))
    }

    // ── gating ─────────────────────────────────────────────────────────

    /// `Locked`, `Available` or `Completed` for one slot.
    pub fn classify(&self, id: UserId, key: SlotKey, now: DateTime<Utc>) -> Result<SlotStatus> {
        Ok(self.explain(id, key, now)?.status)
    }

    /// Like [`ChallengeEngine::classify`], with the release instant and lock reason.
    pub fn explain(&self, id: UserId, key: SlotKey, now: DateTime<Utc>) -> Result<Classification> {
        self.catalog.slot(key)?;
        let user = self.user(id)?;
        let schedule = ReleaseSchedule::for_user(&user)?;
        let solved = self.solved_keys(id)?;
        Ok(self.gate(&user, &schedule, key, &solved, now))
    }

    fn solved_keys(&self, id: UserId) -> Result<BTreeSet<SlotKey>> {
        let records = self.store.records(id).map_err(|e| storage_error(id, None, e))?;
        Ok(records
            .iter()
            .filter(|r| r.is_completed())
            .map(ProgressRecord::key)
            .collect())
    }

    fn gate(
        &self,
        user: &User,
        schedule: &ReleaseSchedule,
        key: SlotKey,
        solved: &BTreeSet<SlotKey>,
        now: DateTime<Utc>,
    ) -> Classification {
        let release_at = schedule.release_instant(key);
        let locked = |reason| Classification {
            key,
            status: SlotStatus::Locked,
            release_at,
            lock_reason: Some(reason),
        };

        let classification = if solved.contains(&key) {
            Classification {
                key,
                status: SlotStatus::Completed,
                release_at,
                lock_reason: None,
            }
        } else if !user.plan.allows_week(key.week) {
            locked(LockReason::BeyondPlan {
                max_week: user.plan.max_visible_week(),
            })
        } else if now < release_at {
            locked(LockReason::NotReleased)
        } else if let Some(prior) = key
            .previous()
            .filter(|p| self.settings.require_prior_completion && !solved.contains(p))
        {
            locked(LockReason::PriorIncomplete { prior })
        } else {
            Classification {
                key,
                status: SlotStatus::Available,
                release_at,
                lock_reason: None,
            }
        };

        debug!(
            user_id = %user.id,
            week = key.week,
            slot = %key.kind,
            status = ?classification.status,
            "classified slot"
        );
        classification
    }

    /// Board for the user's current week (lowest week with an unsolved slot).
    pub fn board(&self, id: UserId, now: DateTime<Utc>) -> Result<Board> {
        let solved = self.solved_keys(id)?;
        let week = current_week(&solved);
        self.board_with(id, week, &solved, now)
    }

    pub fn board_for_week(&self, id: UserId, week: u32, now: DateTime<Utc>) -> Result<Board> {
        if !(1..=TOTAL_WEEKS).contains(&week) {
            return Err(CatalogError::WeekOutOfRange { week }.into());
        }
        let solved = self.solved_keys(id)?;
        self.board_with(id, week, &solved, now)
    }

    fn board_with(
        &self,
        id: UserId,
        week: u32,
        solved: &BTreeSet<SlotKey>,
        now: DateTime<Utc>,
    ) -> Result<Board> {
        let user = self.user(id)?;
        let schedule = ReleaseSchedule::for_user(&user)?;
        let slots = self.catalog.week(week)?;

        let mut entries = Vec::with_capacity(slots.len());
        for slot in slots {
            let key = slot.key();
            let record = self.store.record(id, key).map_err(|e| storage_error(id, Some(key), e))?;
            entries.push(BoardEntry {
                slot: slot.clone(),
                classification: self.gate(&user, &schedule, key, solved, now),
                record,
            });
        }
        Ok(Board {
            user_id: id,
            week,
            entries,
        })
    }

    // ── evaluation ─────────────────────────────────────────────────────

    /// Evaluate an answer for a slot the user can currently submit to.
    ///
    /// # Errors
    /// - `Validation` if the answer is empty or too long
    /// - `Catalog` if the slot does not exist
    /// - `SlotNotSubmittable` if the slot is locked or already completed
    /// - `StorageUnavailable` if the write failed; safe to retry
    pub fn submit(
        &self,
        id: UserId,
        key: SlotKey,
        raw_answer: &str,
        now: DateTime<Utc>,
    ) -> Result<Evaluation> {
        self.validate_answer(raw_answer)?;
        let slot = self.catalog.slot(key)?;
        let user = self.user(id)?;
        let schedule = ReleaseSchedule::for_user(&user)?;
        let solved = self.solved_keys(id)?;

        match self.gate(&user, &schedule, key, &solved, now).status {
            SlotStatus::Available => {}
            SlotStatus::Locked => return Err(self.rejected(id, key, NotSubmittableReason::Locked)),
            SlotStatus::Completed => {
                return Err(self.rejected(id, key, NotSubmittableReason::AlreadyCompleted))
            }
        }

        let correct = slot.puzzle.accepts(raw_answer);
        let submission = Submission {
            user_id: id,
            key,
            answer: raw_answer,
            correct,
            at: now,
        };
        let catalog = &self.catalog;
        let outcome = self
            .store
            .apply_submission(&submission, &|records: &[ProgressRecord]| {
                summarize(catalog, &schedule, id, records, now)
            })
            .map_err(|e| storage_error(id, Some(key), e))?;

        let (record, summary) = match outcome {
            SubmissionOutcome::Recorded { record, summary } => (record, summary),
            // Lost the race to a concurrent correct submission.
            SubmissionOutcome::AlreadyCompleted => {
                return Err(self.rejected(id, key, NotSubmittableReason::AlreadyCompleted))
            }
        };

        self.sink.publish(EngineEvent::answer_evaluated(
            id,
            key.week,
            key.kind,
            correct,
            record.attempts,
            now,
        ));

        if !correct {
            info!(user_id = %id, week = key.week, slot = %key.kind, attempts = record.attempts, "incorrect answer");
            return Ok(Evaluation::Incorrect {
                attempts: record.attempts,
            });
        }

        let new_streak = summary.map_or(0, |s| s.current_streak);
        info!(
            user_id = %id,
            week = key.week,
            slot = %key.kind,
            attempts = record.attempts,
            points = slot.reward_points,
            streak = new_streak,
            "slot completed"
        );
        self.sink.publish(EngineEvent::slot_completed(
            id,
            key.week,
            key.kind,
            slot.reward_points,
            new_streak,
            now,
        ));
        Ok(Evaluation::Correct {
            points_awarded: slot.reward_points,
            new_streak,
            attempts: record.attempts,
        })
    }

    fn validate_answer(&self, raw_answer: &str) -> Result<(), ValidationError> {
        if raw_answer.trim().is_empty() {
            return Err(ValidationError::EmptyAnswer);
        }
        let len = raw_answer.chars().count();
        if len > self.settings.max_answer_len {
            return Err(ValidationError::AnswerTooLong {
                len,
                max: self.settings.max_answer_len,
            });
        }
        Ok(())
    }

    fn rejected(&self, id: UserId, key: SlotKey, reason: NotSubmittableReason) -> EngineError {
        warn!(user_id = %id, week = key.week, slot = %key.kind, %reason, "submission rejected");
        EngineError::not_submittable(reason)
    }

    // ── progress ───────────────────────────────────────────────────────

    /// Summary recomputed from the user's records as of `now`.
    pub fn summary(&self, id: UserId, now: DateTime<Utc>) -> Result<UserProgressSummary> {
        let user = self.user(id)?;
        let schedule = ReleaseSchedule::for_user(&user)?;
        let records = self.store.records(id).map_err(|e| storage_error(id, None, e))?;
        Ok(summarize(&self.catalog, &schedule, id, &records, now))
    }

    /// Last summary written by a completion or a rebuild.
    pub fn cached_summary(&self, id: UserId) -> Result<Option<UserProgressSummary>> {
        self.user(id)?;
        Ok(self.store.summary(id).map_err(|e| storage_error(id, None, e))?)
    }

    /// Recompute the summary from records and overwrite the cache.
    pub fn rebuild_summary(&self, id: UserId, now: DateTime<Utc>) -> Result<UserProgressSummary> {
        let summary = self.summary(id, now)?;
        self.store
            .store_summary(&summary)
            .map_err(|e| storage_error(id, None, e))?;
        info!(user_id = %id, total_solved = summary.total_solved, "summary rebuilt");
        Ok(summary)
    }

    pub fn record(&self, id: UserId, key: SlotKey) -> Result<Option<ProgressRecord>> {
        self.catalog.slot(key)?;
        self.user(id)?;
        Ok(self.store.record(id, key).map_err(|e| storage_error(id, Some(key), e))?)
    }

    pub fn attempt_history(&self, id: UserId, key: SlotKey) -> Result<Vec<AttemptRecord>> {
        self.catalog.slot(key)?;
        self.user(id)?;
        Ok(self
            .store
            .attempts(id, key)
            .map_err(|e| storage_error(id, Some(key), e))?)
    }

    // ── releases ───────────────────────────────────────────────────────

    /// Publish `SlotAvailable` for every slot released in `(since, until]`
    /// within each user's plan. Returns what was published.
    pub fn scan_releases(&self, since: DateTime<Utc>, until: DateTime<Utc>) -> Result<Vec<EngineEvent>> {
        let mut events = Vec::new();
        for user in self.store.users().map_err(|e| store_failure("scan_releases", e))? {
            let schedule = match ReleaseSchedule::for_user(&user) {
                Ok(schedule) => schedule,
                Err(e) => {
                    warn!(user_id = %user.id, error = %e, "skipping user with invalid timezone");
                    continue;
                }
            };
            for (key, released_at) in schedule.releases_between(since, until) {
                if !user.plan.allows_week(key.week) {
                    continue;
                }
                let event = EngineEvent::slot_available(user.id, key.week, key.kind, released_at);
                self.sink.publish(event.clone());
                events.push(event);
            }
        }
        info!(%since, %until, released = events.len(), "release scan finished");
        Ok(events)
    }

    /// Storage liveness.
    pub fn health(&self) -> Result<()> {
        self.store.ping().map_err(|e| store_failure("health", e))
    }
}

/// Smallest week with an unsolved slot; the last week once all are solved.
fn current_week(solved: &BTreeSet<SlotKey>) -> u32 {
    (1..=TOTAL_WEEKS)
        .find(|week| {
            SlotKind::ALL
                .iter()
                .any(|kind| !solved.contains(&SlotKey::new(*week, *kind)))
        })
        .unwrap_or(TOTAL_WEEKS)
}

fn storage_error(id: UserId, key: Option<SlotKey>, err: DatabaseError) -> EngineError {
    match key {
        Some(key) => error!(user_id = %id, week = key.week, slot = %key.kind, error = %err, "storage failure"),
        None => error!(user_id = %id, error = %err, "storage failure"),
    }
    EngineError::StorageUnavailable(err)
}

/// Same as [`storage_error`] for operations not tied to one user.
fn store_failure(operation: &'static str, err: DatabaseError) -> EngineError {
    error!(operation, error = %err, "storage failure");
    EngineError::StorageUnavailable(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MemorySink;
    use crate::storage::Database;
    use chrono::Duration;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    const ENROLLED: &str = "2024-01-01T09:00:00Z";
    const WEEK1_OPEN: &str = "2024-01-07T08:00:00Z";

    fn engine() -> ChallengeEngine<Database> {
        let engine = ChallengeEngine::new(Arc::new(Catalog::builtin()), Database::open_memory().unwrap());
        engine
            .enroll(User::new(UserId(1), at(ENROLLED)).with_plan(Plan::Full))
            .unwrap();
        engine
    }

    fn answer(engine: &ChallengeEngine<Database>, key: SlotKey) -> String {
        engine.catalog().slot(key).unwrap().puzzle.expected_answer.clone()
    }

    #[test]
    fn enroll_rejects_duplicates_and_bad_offsets() {
        let engine = engine();
        let dup = engine.enroll(User::new(UserId(1), at(ENROLLED)));
        assert!(matches!(dup, Err(EngineError::DuplicateUser(UserId(1)))));

        let bad = engine.enroll(User::new(UserId(2), at(ENROLLED)).with_tz_offset(900));
        assert!(matches!(bad, Err(EngineError::Validation(_))));
        assert!(matches!(engine.user(UserId(2)), Err(EngineError::UnknownUser(_))));
    }

    #[test]
    fn classify_follows_release_then_completion() {
        let engine = engine();
        let key = SlotKey::new(1, SlotKind::Opener);

        assert_eq!(engine.classify(UserId(1), key, at(ENROLLED)).unwrap(), SlotStatus::Locked);
        let open = at(WEEK1_OPEN) + Duration::seconds(1);
        assert_eq!(engine.classify(UserId(1), key, open).unwrap(), SlotStatus::Available);

        let result = engine.submit(UserId(1), key, &answer(&engine, key), open).unwrap();
        assert!(result.is_correct());
        assert_eq!(engine.classify(UserId(1), key, open).unwrap(), SlotStatus::Completed);
    }

    #[test]
    fn plan_horizon_locks_later_weeks() {
        let engine = engine();
        engine.set_plan(UserId(1), Plan::FreeTrial).unwrap();
        let far = at("2030-01-01T00:00:00Z");

        let explained = engine.explain(UserId(1), SlotKey::new(2, SlotKind::Opener), far).unwrap();
        assert_eq!(explained.status, SlotStatus::Locked);
        assert_eq!(explained.lock_reason, Some(LockReason::BeyondPlan { max_week: 1 }));
        assert_eq!(
            engine.classify(UserId(1), SlotKey::new(1, SlotKind::Closer), far).unwrap(),
            SlotStatus::Available
        );
    }

    #[test]
    fn prior_completion_chaining() {
        let engine = engine().with_settings(EngineSettings {
            require_prior_completion: true,
            max_answer_len: 500,
        });
        let far = at("2030-01-01T00:00:00Z");
        let opener = SlotKey::new(1, SlotKind::Opener);
        let midweek = SlotKey::new(1, SlotKind::Midweek);

        let explained = engine.explain(UserId(1), midweek, far).unwrap();
        assert_eq!(explained.lock_reason, Some(LockReason::PriorIncomplete { prior: opener }));
        assert_eq!(engine.classify(UserId(1), opener, far).unwrap(), SlotStatus::Available);

        engine.submit(UserId(1), opener, &answer(&engine, opener), far).unwrap();
        assert_eq!(engine.classify(UserId(1), midweek, far).unwrap(), SlotStatus::Available);
    }

    #[test]
    fn submit_rejections_carry_reason() {
        let engine = engine();
        let key = SlotKey::new(1, SlotKind::Opener);

        let early = engine.submit(UserId(1), key, "anything", at(ENROLLED));
        assert!(matches!(
            early,
            Err(EngineError::SlotNotSubmittable { reason: NotSubmittableReason::Locked })
        ));

        let open = at(WEEK1_OPEN);
        engine.submit(UserId(1), key, &answer(&engine, key), open).unwrap();
        let again = engine.submit(UserId(1), key, &answer(&engine, key), open);
        assert!(matches!(
            again,
            Err(EngineError::SlotNotSubmittable { reason: NotSubmittableReason::AlreadyCompleted })
        ));
    }

    #[test]
    fn submit_validates_answer_shape() {
        let engine = engine();
        let key = SlotKey::new(1, SlotKind::Opener);
        let open = at(WEEK1_OPEN);

        assert!(matches!(
            engine.submit(UserId(1), key, "   ", open),
            Err(EngineError::Validation(ValidationError::EmptyAnswer))
        ));
        let long = "A".repeat(501);
        assert!(matches!(
            engine.submit(UserId(1), key, &long, open),
            Err(EngineError::Validation(ValidationError::AnswerTooLong { len: 501, max: 500 }))
        ));
        assert!(matches!(
            engine.submit(UserId(1), SlotKey::new(92, SlotKind::Opener), "x", open),
            Err(EngineError::Catalog(_))
        ));
    }

    #[test]
    fn answers_are_normalized() {
        let engine = engine();
        let key = SlotKey::new(1, SlotKind::Midweek);
        let open = at("2024-01-10T18:00:00Z");
        let typed = format!("  {}  ", answer(&engine, key).to_lowercase());

        let wrong = engine.submit(UserId(1), key, "definitely wrong", open).unwrap();
        assert_eq!(wrong, Evaluation::Incorrect { attempts: 1 });
        let right = engine.submit(UserId(1), key, &typed, open).unwrap();
        assert!(right.is_correct());
        assert_eq!(right.attempts(), 2);
    }

    #[test]
    fn board_advances_with_completion() {
        let engine = engine();
        let friday = at("2024-01-12T15:00:00Z");

        let board = engine.board(UserId(1), friday).unwrap();
        assert_eq!(board.week, 1);
        assert_eq!(board.entries.len(), 3);
        assert_eq!(board.first_available().unwrap().slot.kind, SlotKind::Opener);

        for kind in SlotKind::ALL {
            let key = SlotKey::new(1, kind);
            engine.submit(UserId(1), key, &answer(&engine, key), friday).unwrap();
        }
        let board = engine.board(UserId(1), friday).unwrap();
        assert_eq!(board.week, 2);
        assert!(board.first_available().is_none());
        assert!(engine.board_for_week(UserId(1), 1, friday).unwrap().is_complete());
        assert!(engine.board_for_week(UserId(1), 0, friday).is_err());
    }

    #[test]
    fn completion_publishes_events_and_updates_cache() {
        let sink = Arc::new(MemorySink::new());
        let engine = engine().with_sink(sink.clone());
        let key = SlotKey::new(1, SlotKind::Opener);
        let open = at(WEEK1_OPEN);

        engine.submit(UserId(1), key, "nope", open).unwrap();
        engine.submit(UserId(1), key, &answer(&engine, key), open).unwrap();

        let events = sink.drain();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], EngineEvent::AnswerEvaluated { correct: false, attempts: 1, .. }));
        assert!(matches!(events[2], EngineEvent::SlotCompleted { .. }));

        let cached = engine.cached_summary(UserId(1)).unwrap().unwrap();
        assert_eq!(cached, engine.summary(UserId(1), open).unwrap());
        assert_eq!(engine.attempt_history(UserId(1), key).unwrap().len(), 2);
    }

    #[test]
    fn scan_releases_respects_window_and_plan() {
        let sink = Arc::new(MemorySink::new());
        let engine = engine().with_sink(sink.clone());
        engine
            .enroll(User::new(UserId(2), at(ENROLLED)).with_plan(Plan::FreeTrial))
            .unwrap();

        let events = engine
            .scan_releases(at("2024-01-12T15:00:00Z"), at("2024-01-14T08:00:00Z"))
            .unwrap();
        // Week 2 opener for the full plan user only; the window start is exclusive.
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].user_id(), UserId(1));
        assert_eq!(sink.events().len(), 1);

        let next = engine.next_release(UserId(2), at("2024-01-13T00:00:00Z")).unwrap();
        assert!(next.is_none());
    }
}
