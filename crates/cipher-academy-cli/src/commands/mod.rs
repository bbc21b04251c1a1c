pub mod api;
pub mod board;
pub mod catalog;
pub mod config;
pub mod progress;
pub mod releases;
pub mod submit;
pub mod user;

use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use cipher_academy_core::{Catalog, ChallengeEngine, Config, Database, EngineSettings, SlotKind};

pub type CmdResult<T = ()> = Result<T, Box<dyn Error>>;

/// Resolve `--now`, defaulting to the wall clock.
pub fn clock(now: Option<&str>) -> CmdResult<DateTime<Utc>> {
    match now {
        Some(raw) => parse_instant(raw),
        None => Ok(Utc::now()),
    }
}

pub fn parse_instant(raw: &str) -> CmdResult<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(raw)
        .map_err(|e| format!("invalid RFC 3339 timestamp '{raw}': {e}"))?;
    Ok(parsed.with_timezone(&Utc))
}

/// clap value parser for slot kinds.
pub fn parse_kind(raw: &str) -> Result<SlotKind, String> {
    SlotKind::parse(raw).ok_or_else(|| format!("unknown slot '{raw}' (opener, midweek, closer)"))
}

/// Catalog from `catalog.path`, or the built-in syllabus.
pub fn load_catalog(config: &Config) -> CmdResult<Catalog> {
    match &config.catalog.path {
        Some(path) => Ok(Catalog::load(Path::new(path))?),
        None => Ok(Catalog::builtin()),
    }
}

/// Engine over the configured database and catalog.
pub fn open_engine() -> CmdResult<ChallengeEngine<Database>> {
    let config = Config::load()?;
    let catalog = load_catalog(&config)?;
    let db = Database::open_path(&config.database_path()?)?;
    Ok(ChallengeEngine::new(Arc::new(catalog), db).with_settings(EngineSettings::from(&config)))
}

pub fn print_json<T: serde::Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
