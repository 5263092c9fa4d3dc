//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! agent.

/// Task id marking an observation as project-level (no specific task).
pub const SENTINEL_TASK_ID: i64 = -1;

/// Maximum rows a sync cycle pulls from a backlog in one pass.
pub const SYNC_BATCH_SIZE: usize = 100;

/// Screenshot sampling interval (minutes) used until a policy is fetched.
pub const DEFAULT_SCREENSHOT_INTERVAL_MIN: u64 = 1;

/// Seconds of silence after which an open duration span is closed out.
pub const DURATION_INACTIVITY_TIMEOUT_SECS: i64 = 2;

/// Idle threshold (seconds) applied when configuration does not override it.
pub const DEFAULT_IDLE_THRESHOLD_SECS: u64 = 60;

/// Cadence of the shared idle polling timer.
pub const IDLE_POLL_INTERVAL_SECS: u64 = 1;

// Default sync intervals per observation kind (seconds)
pub const ACTIVITY_SYNC_INTERVAL_SECS: u64 = 10;
pub const DURATION_SYNC_INTERVAL_SECS: u64 = 10;
pub const IDLE_SYNC_INTERVAL_SECS: u64 = 30;
pub const TIME_ENTRY_SYNC_INTERVAL_SECS: u64 = 60;
pub const SCREENSHOT_SYNC_INTERVAL_SECS: u64 = 120;
pub const POLICY_REFRESH_INTERVAL_SECS: u64 = 300;
