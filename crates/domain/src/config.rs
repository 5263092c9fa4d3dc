//! Configuration structures for the agent
//!
//! Populated by the loader in `tempo-infra::config` from environment
//! variables with an optional file fallback.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants;

/// Top-level agent configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub sync: SyncConfig,
    pub tracking: TrackingConfig,
    /// Root for databases and screenshot files. `None` selects the
    /// platform data directory.
    pub data_dir: Option<PathBuf>,
}

/// Remote endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { base_url: "https://api.tempo.example.com/v1".to_string(), timeout_secs: 30 }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Per-kind sync processor intervals and the shared batch bound
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub activity_interval_secs: u64,
    pub duration_interval_secs: u64,
    pub idle_interval_secs: u64,
    pub time_entry_interval_secs: u64,
    pub screenshot_interval_secs: u64,
    pub policy_refresh_interval_secs: u64,
    pub batch_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            activity_interval_secs: constants::ACTIVITY_SYNC_INTERVAL_SECS,
            duration_interval_secs: constants::DURATION_SYNC_INTERVAL_SECS,
            idle_interval_secs: constants::IDLE_SYNC_INTERVAL_SECS,
            time_entry_interval_secs: constants::TIME_ENTRY_SYNC_INTERVAL_SECS,
            screenshot_interval_secs: constants::SCREENSHOT_SYNC_INTERVAL_SECS,
            policy_refresh_interval_secs: constants::POLICY_REFRESH_INTERVAL_SECS,
            batch_size: constants::SYNC_BATCH_SIZE,
        }
    }
}

/// Idle and capture tracking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub idle_threshold_secs: u64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self { idle_threshold_secs: constants::DEFAULT_IDLE_THRESHOLD_SECS }
    }
}
