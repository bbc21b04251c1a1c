mod config;
pub mod database;
pub mod migrations;
mod store;

pub use config::{AnswersConfig, CatalogConfig, Config, GatingConfig, LoggingConfig, StorageConfig};
pub use database::Database;
pub use store::{ProgressStore, Submission, SubmissionOutcome};

use std::path::PathBuf;

/// Returns `~/.config/cipher-academy[-dev]/` based on CIPHER_ACADEMY_ENV.
///
/// Set CIPHER_ACADEMY_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("CIPHER_ACADEMY_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("cipher-academy-dev")
    } else {
        base_dir.join("cipher-academy")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
