//! # Cipher Academy Core Library
//!
//! This library provides the challenge release and progress engine for
//! Cipher Academy, a subscription curriculum that delivers one cryptography
//! puzzle every Sunday, Wednesday and Friday across a 91-week, five-era
//! syllabus. All operations are available through the standalone CLI binary;
//! web frontends talk to the same engine through the [`Api`] router.
//!
//! ## Architecture
//!
//! - **Catalog**: immutable eras, weeks and slots, each carrying one puzzle
//! - **Release clock**: pure per-user release instants anchored to enrollment
//! - **Storage**: SQLite-backed users, progress records, submission log and
//!   TOML-based configuration
//! - **Engine**: gating (`Locked` / `Available` / `Completed`), answer
//!   evaluation and derived progress summaries
//!
//! ## Key Components
//!
//! - [`Catalog`]: curriculum lookup
//! - [`ReleaseSchedule`]: when each slot opens for a user
//! - [`ChallengeEngine`]: classify, board, submit, summary
//! - [`Database`]: progress persistence
//! - [`Config`]: engine configuration management

pub mod api;
pub mod catalog;
pub mod clock;
pub mod engine;
pub mod error;
pub mod events;
pub mod progress;
pub mod storage;
pub mod user;

pub use api::{Api, ApiResponse, Method};
pub use catalog::{Catalog, Era, Puzzle, Slot, SlotKey, SlotKind, TOTAL_SLOTS, TOTAL_WEEKS};
pub use clock::{is_eligible, release_instant, ReleaseSchedule};
pub use engine::{
    Board, BoardEntry, ChallengeEngine, Classification, EngineSettings, Evaluation, LockReason,
    SlotStatus,
};
pub use error::{
    CatalogError, ConfigError, DatabaseError, EngineError, NotSubmittableReason, ValidationError,
};
pub use events::{EngineEvent, EventSink, MemorySink, NullSink};
pub use progress::{summarize, AttemptRecord, ProgressRecord, UserProgressSummary};
pub use storage::{Config, Database, ProgressStore};
pub use user::{Plan, User, UserId};
