use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::Args;
use cipher_academy_core::{Api, Method};

use super::{open_engine, print_json, CmdResult};

#[derive(Args)]
pub struct ApiArgs {
    /// GET or POST
    method: Method,
    /// Request path, e.g. /api/user-progress/1
    path: String,
    /// JSON request body
    #[arg(default_value = "")]
    body: String,
}

pub fn run(args: ApiArgs, now: DateTime<Utc>) -> CmdResult {
    let api = Api::new(Arc::new(open_engine()?));
    let response = api.handle_at(args.method, &args.path, &args.body, now);
    print_json(&serde_json::json!({ "status": response.status, "body": response.body }))?;
    if !response.is_success() {
        return Err(format!("request failed with status {}", response.status).into());
    }
    Ok(())
}
