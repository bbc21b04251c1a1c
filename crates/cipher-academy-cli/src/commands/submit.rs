use chrono::{DateTime, Utc};
use clap::Args;
use cipher_academy_core::{api::dto::SubmitAnswerResponse, SlotKey, SlotKind, UserId};

use super::{open_engine, parse_kind, print_json, CmdResult};

#[derive(Args)]
pub struct SubmitArgs {
    /// User id
    user: i64,
    week: u32,
    #[arg(value_parser = parse_kind)]
    kind: SlotKind,
    answer: String,
}

pub fn run(args: SubmitArgs, now: DateTime<Utc>) -> CmdResult {
    let engine = open_engine()?;
    let key = SlotKey::new(args.week, args.kind);
    let evaluation = engine.submit(UserId(args.user), key, &args.answer, now)?;
    print_json(&SubmitAnswerResponse::from(evaluation))
}
