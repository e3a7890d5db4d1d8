mod config;
pub mod database;

pub use config::{AssistantConfig, Config, FeedConfig, NudgesConfig};
pub use database::{ContactRepository, Database, SignalRepository};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/upkeep[-dev]/` based on UPKEEP_ENV.
///
/// Set UPKEEP_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if the home directory cannot be determined or if
/// creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("UPKEEP_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("upkeep-dev")
    } else {
        base_dir.join("upkeep")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
