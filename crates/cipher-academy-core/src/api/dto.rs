//! Request and response bodies, field names as the web client expects them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::SlotKind;
use crate::engine::{BoardEntry, Evaluation, SlotStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateMessageRequest {
    pub user_id: i64,
    pub week_number: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateMessageResponse {
    pub message: String,
    /// 0 = opener, 1 = midweek, 2 = closer.
    pub puzzle_index: u32,
    pub week_number: u32,
    pub day_of_week: String,
    pub title: String,
    pub cipher_type: String,
    pub hint: String,
    pub difficulty_level: u8,
    pub reward_points: u32,
}

impl GenerateMessageResponse {
    pub fn from_entry(entry: &BoardEntry) -> Self {
        let slot = &entry.slot;
        Self {
            message: slot.puzzle.prompt.clone(),
            puzzle_index: slot.kind.day_rank(),
            week_number: slot.week,
            day_of_week: slot.kind.day_name().to_string(),
            title: slot.puzzle.title.clone(),
            cipher_type: slot.puzzle.cipher_type.label().to_string(),
            hint: slot.puzzle.hint.clone(),
            difficulty_level: slot.difficulty_level,
            reward_points: slot.reward_points,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAnswerRequest {
    pub user_id: i64,
    pub week_number: u32,
    pub puzzle_index: u32,
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAnswerResponse {
    /// `"correct"` or `"incorrect"`.
    pub result: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points_awarded: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_streak: Option<u32>,
    pub attempts: u32,
}

impl From<Evaluation> for SubmitAnswerResponse {
    fn from(evaluation: Evaluation) -> Self {
        match evaluation {
            Evaluation::Correct {
                points_awarded,
                new_streak,
                attempts,
            } => Self {
                result: "correct".into(),
                points_awarded: Some(points_awarded),
                new_streak: Some(new_streak),
                attempts,
            },
            Evaluation::Incorrect { attempts } => Self {
                result: "incorrect".into(),
                points_awarded: None,
                new_streak: None,
                attempts,
            },
        }
    }
}

/// One slot of a week, as shown on the weekly board.
///
/// Locked slots carry no puzzle text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageView {
    /// Global slot ordinal, 1-273.
    pub id: u32,
    pub week_number: u32,
    pub puzzle_index: u32,
    pub slot: SlotKind,
    pub day_of_week: String,
    pub title: String,
    pub message: Option<String>,
    pub preview: String,
    pub status: SlotStatus,
    pub is_completed: bool,
    pub user_solution: Option<String>,
    pub attempts: u32,
    pub difficulty_level: u8,
    pub reward_points: u32,
    pub release_at: DateTime<Utc>,
}

impl From<&BoardEntry> for MessageView {
    fn from(entry: &BoardEntry) -> Self {
        let slot = &entry.slot;
        let status = entry.classification.status;
        let is_completed = status == SlotStatus::Completed;
        Self {
            id: slot.key().ordinal(),
            week_number: slot.week,
            puzzle_index: slot.kind.day_rank(),
            slot: slot.kind,
            day_of_week: slot.kind.day_name().to_string(),
            title: slot.puzzle.title.clone(),
            message: (status != SlotStatus::Locked).then(|| slot.puzzle.prompt.clone()),
            preview: format!(
                "{} cipher, difficulty {}",
                slot.puzzle.cipher_type.label(),
                slot.difficulty_level
            ),
            status,
            is_completed,
            user_solution: entry
                .record
                .as_ref()
                .filter(|_| is_completed)
                .map(|r| r.submitted_answer.clone()),
            attempts: entry.record.as_ref().map_or(0, |r| r.attempts),
            difficulty_level: slot.difficulty_level,
            reward_points: slot.reward_points,
            release_at: entry.classification.release_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub database: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
