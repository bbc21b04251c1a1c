//! Per-user progress: records, attempt history, and the derived summary.
//!
//! `UserProgressSummary` is a cache. [`summarize`] rebuilds it from the
//! record set alone, and every stored summary must equal what `summarize`
//! returns for the same inputs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, SlotKey, SlotKind, TOTAL_WEEKS};
use crate::clock::ReleaseSchedule;
use crate::user::UserId;

/// One per (user, slot), created on first submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub user_id: UserId,
    pub week: u32,
    pub kind: SlotKind,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    /// Most recent submitted answer, as typed.
    pub submitted_answer: String,
    pub correct: bool,
    pub attempts: u32,
}

impl ProgressRecord {
    pub fn key(&self) -> SlotKey {
        SlotKey::new(self.week, self.kind)
    }

    /// Terminal: a correct answer has been recorded.
    pub fn is_completed(&self) -> bool {
        self.completed && self.correct
    }
}

/// One row of the submission log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub user_id: UserId,
    pub week: u32,
    pub kind: SlotKind,
    pub answer: String,
    pub correct: bool,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProgressSummary {
    pub user_id: UserId,
    pub current_week: u32,
    pub total_solved: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub total_points: u32,
    pub last_solved_at: Option<DateTime<Utc>>,
}

/// Rebuild a user's summary from their records as of `now`.
///
/// Streaks walk forward through released weeks. A week before the latest
/// released one counts only if all three slots were solved before the next
/// week's opener; the latest released week counts once fully solved. Solving
/// an old week late never repairs a broken streak.
pub fn summarize(
    catalog: &Catalog,
    schedule: &ReleaseSchedule,
    user_id: UserId,
    records: &[ProgressRecord],
    now: DateTime<Utc>,
) -> UserProgressSummary {
    let solved: BTreeMap<SlotKey, DateTime<Utc>> = records
        .iter()
        .filter(|r| r.is_completed())
        .filter_map(|r| r.completed_at.map(|at| (r.key(), at)))
        .collect();

    let total_points = solved
        .keys()
        .filter_map(|key| catalog.slot(*key).ok())
        .map(|slot| slot.reward_points)
        .sum();

    let current_week = (1..=TOTAL_WEEKS)
        .find(|week| {
            SlotKind::ALL
                .iter()
                .any(|kind| !solved.contains_key(&SlotKey::new(*week, *kind)))
        })
        .unwrap_or(TOTAL_WEEKS);

    let latest = schedule.latest_released_week(now);
    let mut run = 0u32;
    let mut longest = 0u32;
    for week in 1..=latest {
        let deadline = if week < latest {
            Some(schedule.release_instant(SlotKey::new(week + 1, SlotKind::Opener)))
        } else {
            None
        };
        let counts = SlotKind::ALL.iter().all(|kind| {
            solved
                .get(&SlotKey::new(week, *kind))
                .is_some_and(|at| deadline.map_or(true, |d| *at < d))
        });
        if counts {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }

    UserProgressSummary {
        user_id,
        current_week,
        total_solved: solved.len() as u32,
        current_streak: run,
        longest_streak: longest,
        total_points,
        last_solved_at: solved.values().max().copied(),
    }
}
