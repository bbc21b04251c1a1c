use chrono::{DateTime, Utc};
use clap::Subcommand;
use cipher_academy_core::{SlotKey, SlotKind, UserId};

use super::{open_engine, parse_kind, print_json, CmdResult};

#[derive(Subcommand)]
pub enum ProgressAction {
    /// Summary recomputed from progress records
    Show {
        user: i64,
    },
    /// Recompute and overwrite the cached summary
    Rebuild {
        user: i64,
    },
    /// Submission log for one slot
    History {
        user: i64,
        week: u32,
        #[arg(value_parser = parse_kind)]
        kind: SlotKind,
    },
}

pub fn run(action: ProgressAction, now: DateTime<Utc>) -> CmdResult {
    let engine = open_engine()?;

    match action {
        ProgressAction::Show { user } => print_json(&engine.summary(UserId(user), now)?),
        ProgressAction::Rebuild { user } => print_json(&engine.rebuild_summary(UserId(user), now)?),
        ProgressAction::History { user, week, kind } => {
            print_json(&engine.attempt_history(UserId(user), SlotKey::new(week, kind))?)
        }
    }
}
