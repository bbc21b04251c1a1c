use chrono::{DateTime, Utc};
use clap::Subcommand;
use tracing::{info, warn};

use super::{open_engine, parse_instant, print_json, CmdResult};

/// kv key holding the end of the last scanned window.
const SCAN_CURSOR_KEY: &str = "release_scan_cursor";

#[derive(Subcommand)]
pub enum ReleasesAction {
    /// Emit SlotAvailable for slots released since the last scan
    Scan {
        /// Window start (RFC 3339); defaults to the stored cursor
        #[arg(long)]
        since: Option<String>,
    },
    /// Show the stored scan cursor
    Cursor,
}

pub fn run(action: ReleasesAction, now: DateTime<Utc>) -> CmdResult {
    let engine = open_engine()?;
    let db = engine.store();

    match action {
        ReleasesAction::Scan { since } => {
            let cursor = db
                .kv_get(SCAN_CURSOR_KEY)?
                .map(|raw| parse_instant(&raw))
                .transpose()?;
            let since = match since {
                Some(raw) => parse_instant(&raw)?,
                None => cursor.unwrap_or(DateTime::<Utc>::MIN_UTC),
            };
            if now <= since {
                warn!(since = %since, now = %now, "scan window is empty; cursor unchanged");
                return print_json(&Vec::<()>::new());
            }

            let events = engine.scan_releases(since, now)?;
            // The cursor only moves forward.
            let advanced = cursor.map_or(now, |cursor| cursor.max(now));
            db.kv_set(SCAN_CURSOR_KEY, &advanced.to_rfc3339())?;
            info!(cursor = %advanced, emitted = events.len(), "scan cursor advanced");
            print_json(&events)
        }
        ReleasesAction::Cursor => print_json(&db.kv_get(SCAN_CURSOR_KEY)?),
    }
}
