//! Screenshot filename convention
//!
//! Screenshots are not database rows: the filename itself is the queue
//! entry and a directory scan is the dequeue. The name encodes
//! `<project_id>_<task_id>_<ISO timestamp with ':' replaced by '_'>_display<N>.png`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{Result, TempoError};

const EXTENSION: &str = ".png";
const DISPLAY_MARKER: &str = "_display";

/// Parsed form of a screenshot queue filename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenshotName {
    pub project_id: i64,
    pub task_id: i64,
    pub timestamp: DateTime<Utc>,
    pub display: String,
}

impl ScreenshotName {
    pub fn new(
        project_id: i64,
        task_id: i64,
        timestamp: DateTime<Utc>,
        display: impl Into<String>,
    ) -> Self {
        Self { project_id, task_id, timestamp, display: display.into() }
    }

    /// Render the on-disk filename.
    ///
    /// The timestamp keeps millisecond precision; colons are replaced so the
    /// name stays legal on every filesystem.
    pub fn file_name(&self) -> String {
        let stamp =
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true).replace(':', "_");
        format!(
            "{}_{}_{}{}{}{}",
            self.project_id, self.task_id, stamp, DISPLAY_MARKER, self.display, EXTENSION
        )
    }

    /// Parse a filename produced by [`ScreenshotName::file_name`].
    pub fn parse(name: &str) -> Result<Self> {
        let invalid = || TempoError::InvalidInput(format!("invalid screenshot name: {name}"));

        let stem = name.strip_suffix(EXTENSION).ok_or_else(invalid)?;
        let marker = stem.rfind(DISPLAY_MARKER).ok_or_else(invalid)?;
        let display = &stem[marker + DISPLAY_MARKER.len()..];
        if display.is_empty() {
            return Err(invalid());
        }

        let mut parts = stem[..marker].splitn(3, '_');
        let project_id =
            parts.next().and_then(|p| p.parse::<i64>().ok()).ok_or_else(invalid)?;
        let task_id = parts.next().and_then(|p| p.parse::<i64>().ok()).ok_or_else(invalid)?;
        let stamp = parts.next().ok_or_else(invalid)?.replace('_', ":");

        let timestamp = DateTime::parse_from_rfc3339(&stamp)
            .map_err(|_| invalid())?
            .with_timezone(&Utc);

        Ok(Self { project_id, task_id, timestamp, display: display.to_string() })
    }
}
