//! Configuration loading
//!
//! Environment variables win; a TOML or JSON file named by `TEMPO_CONFIG`
//! provides the base; built-in defaults fill the rest. Loading never fails:
//! unreadable files or malformed values fall back and log.

use std::path::Path;

use tempo_domain::config::Config;
use tempo_domain::errors::{Result, TempoError};
use tracing::{debug, warn};

const CONFIG_PATH_VAR: &str = "TEMPO_CONFIG";

/// Load configuration from the environment with an optional file base.
pub fn load() -> Config {
    let base = match std::env::var(CONFIG_PATH_VAR) {
        Ok(path) => match load_from_file(Path::new(&path)) {
            Ok(config) => {
                debug!(path, "configuration file loaded");
                config
            }
            Err(err) => {
                warn!(path, error = %err, "ignoring configuration file");
                Config::default()
            }
        },
        Err(_) => Config::default(),
    };
    apply_env(base)
}

/// Parse a configuration file; the extension selects the format.
pub fn load_from_file(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path)?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => toml::from_str(&contents)
            .map_err(|e| TempoError::Config(format!("invalid TOML config: {e}"))),
        Some("json") => serde_json::from_str(&contents)
            .map_err(|e| TempoError::Config(format!("invalid JSON config: {e}"))),
        other => Err(TempoError::Config(format!(
            "unsupported config format: {}",
            other.unwrap_or("none")
        ))),
    }
}

fn apply_env(mut config: Config) -> Config {
    if let Ok(url) = std::env::var("TEMPO_API_BASE_URL") {
        if !url.is_empty() {
            config.api.base_url = url;
        }
    }
    if let Some(secs) = env_u64("TEMPO_API_TIMEOUT_SECS") {
        config.api.timeout_secs = secs;
    }
    if let Ok(dir) = std::env::var("TEMPO_DATA_DIR") {
        if !dir.is_empty() {
            config.data_dir = Some(dir.into());
        }
    }
    if let Some(secs) = env_u64("TEMPO_IDLE_THRESHOLD_SECS") {
        config.tracking.idle_threshold_secs = secs;
    }
    if let Some(secs) = env_u64("TEMPO_SYNC_ACTIVITY_INTERVAL_SECS") {
        config.sync.activity_interval_secs = secs;
    }
    if let Some(secs) = env_u64("TEMPO_SYNC_DURATION_INTERVAL_SECS") {
        config.sync.duration_interval_secs = secs;
    }
    if let Some(secs) = env_u64("TEMPO_SYNC_IDLE_INTERVAL_SECS") {
        config.sync.idle_interval_secs = secs;
    }
    if let Some(secs) = env_u64("TEMPO_SYNC_TIME_ENTRY_INTERVAL_SECS") {
        config.sync.time_entry_interval_secs = secs;
    }
    if let Some(secs) = env_u64("TEMPO_SYNC_SCREENSHOT_INTERVAL_SECS") {
        config.sync.screenshot_interval_secs = secs;
    }
    if let Some(size) = env_u64("TEMPO_SYNC_BATCH_SIZE") {
        config.sync.batch_size = size as usize;
    }
    config
}

fn env_u64(name: &str) -> Option<u64> {
    let raw = std::env::var(name).ok()?;
    match raw.parse::<u64>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(name, raw, "ignoring non-numeric environment override");
            None
        }
    }
}
