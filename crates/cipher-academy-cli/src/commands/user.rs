use chrono::{DateTime, Utc};
use clap::Subcommand;
use cipher_academy_core::{Plan, User, UserId};

use super::{open_engine, parse_instant, print_json, CmdResult};

#[derive(Subcommand)]
pub enum UserAction {
    /// Enroll a new user
    Enroll {
        /// User id
        id: i64,
        /// Enrollment instant (RFC 3339); defaults to now
        #[arg(long)]
        enrolled_at: Option<String>,
        /// Fixed UTC offset in minutes (e.g. -300 for UTC-5)
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        tz_offset: i32,
        /// Plan: free_trial, beta_trial, monthly, era, full
        #[arg(long, default_value = "free_trial")]
        plan: Plan,
    },
    /// Show a user
    Show {
        id: i64,
    },
    /// Change a user's plan
    Plan {
        id: i64,
        plan: Plan,
    },
    /// List all users
    List,
}

pub fn run(action: UserAction, now: DateTime<Utc>) -> CmdResult {
    let engine = open_engine()?;

    match action {
        UserAction::Enroll {
            id,
            enrolled_at,
            tz_offset,
            plan,
        } => {
            let enrolled_at = match enrolled_at {
                Some(raw) => parse_instant(&raw)?,
                None => now,
            };
            let user = engine.enroll(
                User::new(UserId(id), enrolled_at)
                    .with_tz_offset(tz_offset)
                    .with_plan(plan),
            )?;
            print_json(&user)?;
        }
        UserAction::Show { id } => {
            let user = engine.user(UserId(id))?;
            let schedule = engine.schedule(user.id)?;
            print_json(&serde_json::json!({
                "user": user,
                "anchor": schedule.anchor(),
                "next_release": engine.next_release(user.id, now)?.map(|(key, at)| {
                    serde_json::json!({ "week": key.week, "slot": key.kind, "at": at })
                }),
            }))?;
        }
        UserAction::Plan { id, plan } => {
            print_json(&engine.set_plan(UserId(id), plan)?)?;
        }
        UserAction::List => {
            print_json(&engine.list_users()?)?;
        }
    }
    Ok(())
}
