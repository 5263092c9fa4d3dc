//! Observation record types
//!
//! Each queue-backed record is created by a capture-side service and deleted
//! only after the remote endpoint acknowledges it with `success: true`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::SENTINEL_TASK_ID;

/// Identifies a tracked (project, task) pairing.
///
/// `task_id` may be the sentinel `-1` for project-level tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskKey {
    pub project_id: i64,
    pub task_id: i64,
}

impl TaskKey {
    pub fn new(project_id: i64, task_id: i64) -> Self {
        Self { project_id, task_id }
    }

    /// Whether the key carries a concrete task or the project-level sentinel.
    pub fn has_task(&self) -> bool {
        self.task_id != SENTINEL_TASK_ID
    }
}

/// Snapshot of the foreground application at one capture tick.
///
/// `url` is empty unless the active application is a recognized browser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: i64,
    pub project_id: i64,
    pub task_id: i64,
    pub app_name: String,
    pub url: String,
    pub timestamp: DateTime<Utc>,
}

/// A contiguous span during which one application/URL stayed frontmost.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DurationRecord {
    pub id: i64,
    pub project_id: i64,
    pub task_id: i64,
    pub app_name: String,
    pub url: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// One continuous idle interval for a tracked task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdleEntry {
    pub id: i64,
    pub project_id: i64,
    pub task_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_secs: i64,
}

/// One open/close pair per task-tracking session.
///
/// `end_time` is `None` while the task is actively being timed; only closed
/// entries are eligible for forwarding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeEntry {
    pub id: i64,
    pub project_id: i64,
    pub task_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}
