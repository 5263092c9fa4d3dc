//! Common data types used throughout the application

pub mod browser;
pub mod records;
pub mod screenshot;

pub use browser::{BrowserKind, ChromiumBrowser, Confidence, TabInfo};
pub use records::{ActivityRecord, DurationRecord, IdleEntry, TaskKey, TimeEntry};
pub use screenshot::ScreenshotName;

/// The five independent queue/processor pairings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObservationKind {
    Activity,
    Duration,
    Idle,
    TimeEntry,
    Screenshot,
}

impl ObservationKind {
    /// Stable name used for data subdirectories and log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Activity => "activity",
            Self::Duration => "duration",
            Self::Idle => "idle",
            Self::TimeEntry => "time_entry",
            Self::Screenshot => "screenshot",
        }
    }

    /// API path the corresponding sync processor posts to.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::Activity => "/activities",
            Self::Duration => "/durations",
            Self::Idle => "/idles",
            Self::TimeEntry => "/time-entries",
            Self::Screenshot => "/screenshots",
        }
    }
}

impl std::fmt::Display for ObservationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
