//! Core error types for cipher-academy-core.
//!
//! The taxonomy follows what callers need to decide: catalog references that
//! do not exist, submissions the gate refuses, transient storage failures that
//! are worth retrying, and malformed input.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::SlotKind;
use crate::user::UserId;

/// Top-level error returned by engine operations.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Bad week/slot reference or an invalid catalog definition.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// The slot is locked or already completed for this user.
    #[error("Slot cannot be submitted: {reason}")]
    SlotNotSubmittable { reason: NotSubmittableReason },

    /// Storage failed; the caller may retry with backoff.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[from] DatabaseError),

    /// Malformed request payload or answer.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Unknown user: {0}")]
    UnknownUser(UserId),

    #[error("User already enrolled: {0}")]
    DuplicateUser(UserId),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl EngineError {
    /// Whether retrying the same request later can succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::StorageUnavailable(_))
    }

    pub(crate) fn not_submittable(reason: NotSubmittableReason) -> Self {
        EngineError::SlotNotSubmittable { reason }
    }
}

/// Why a submission was refused by the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotSubmittableReason {
    /// Not released yet, outside the plan horizon, or waiting on a prior slot.
    Locked,
    /// A correct answer was already recorded.
    AlreadyCompleted,
}

impl NotSubmittableReason {
    pub fn as_str(self) -> &'static str {
        match self {
            NotSubmittableReason::Locked => "locked",
            NotSubmittableReason::AlreadyCompleted => "already_completed",
        }
    }
}

impl std::fmt::Display for NotSubmittableReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Catalog lookup and definition errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Week {week} is outside the syllabus (1-91)")]
    WeekOutOfRange { week: u32 },

    #[error("No {kind} slot defined for week {week}")]
    UnknownSlot { week: u32, kind: SlotKind },

    #[error("Puzzle index {index} does not name a weekly slot (0-2)")]
    UnknownPuzzleIndex { index: u32 },

    #[error("Slot ordinal {ordinal} is outside 1-273")]
    UnknownOrdinal { ordinal: u32 },

    /// The catalog definition violates a structural invariant.
    #[error("Invalid catalog definition: {0}")]
    Invalid(String),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// A thread panicked while holding the connection.
    #[error("Database connection poisoned")]
    Poisoned,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Answer is empty")]
    EmptyAnswer,

    #[error("Answer is {len} characters long (max {max})")]
    AnswerTooLong { len: usize, max: usize },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => match e.code {
                rusqlite::ErrorCode::DatabaseLocked | rusqlite::ErrorCode::DatabaseBusy => {
                    DatabaseError::Locked
                }
                _ => DatabaseError::QueryFailed(err.to_string()),
            },
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for EngineError {
    fn from(err: rusqlite::Error) -> Self {
        EngineError::StorageUnavailable(err.into())
    }
}

/// Result type alias for EngineError
pub type Result<T, E = EngineError> = std::result::Result<T, E>;
