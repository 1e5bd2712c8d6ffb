mod config;
pub mod database;

pub use config::{BadgeSettings, Config, QuotaSettings};
pub use database::Database;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the data directory, creating it if needed.
///
/// Resolution order:
/// - `HX_DATA_DIR`, used as-is
/// - `~/.config/harmonic-exchange-dev/` when `HX_ENV=dev`
/// - `~/.config/harmonic-exchange/`
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("HX_DATA_DIR") {
        Some(explicit) if !explicit.is_empty() => PathBuf::from(explicit),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("HX_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("harmonic-exchange-dev")
            } else {
                base_dir.join("harmonic-exchange")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
