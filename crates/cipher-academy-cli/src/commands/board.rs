use chrono::{DateTime, Utc};
use clap::Args;
use cipher_academy_core::{api::dto::MessageView, UserId};

use super::{open_engine, print_json, CmdResult};

#[derive(Args)]
pub struct BoardArgs {
    /// User id
    user: i64,
    /// Week to show; defaults to the user's current week
    #[arg(long)]
    week: Option<u32>,
}

pub fn run(args: BoardArgs, now: DateTime<Utc>) -> CmdResult {
    let engine = open_engine()?;
    let board = match args.week {
        Some(week) => engine.board_for_week(UserId(args.user), week, now)?,
        None => engine.board(UserId(args.user), now)?,
    };
    let views: Vec<MessageView> = board.entries.iter().map(MessageView::from).collect();
    print_json(&serde_json::json!({ "week": board.week, "slots": views }))
}
