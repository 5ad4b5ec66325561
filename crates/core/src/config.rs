use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Runtime configuration for the refresh scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Directory holding the JSON-file store (scheduled updates, content bases).
    pub data_dir: PathBuf,
    /// Seconds between scheduler ticks.
    pub tick_interval_secs: u64,
    /// Per-item refresh timeout in seconds.
    pub item_timeout_secs: u64,
}

impl RefreshConfig {
    /// Build config from environment variables, with defaults.
    ///
    /// - `REFRESH_DATA_DIR` (default "data")
    /// - `REFRESH_TICK_INTERVAL_SECS` (default 60)
    /// - `REFRESH_ITEM_TIMEOUT_SECS` (default 30)
    pub fn from_env() -> Self {
        Self {
            data_dir: PathBuf::from(env_or("REFRESH_DATA_DIR", "data")),
            tick_interval_secs: env_u64("REFRESH_TICK_INTERVAL_SECS", 60),
            item_timeout_secs: env_u64("REFRESH_ITEM_TIMEOUT_SECS", 30),
        }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            tick_interval_secs: 60,
            item_timeout_secs: 30,
        }
    }
}
