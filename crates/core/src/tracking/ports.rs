//! Port interfaces for activity tracking
//!
//! These traits define the boundaries between tracking logic and the
//! platform/infrastructure implementations.

use async_trait::async_trait;
use std::time::Duration;
use tempo_domain::types::TabInfo;
use tempo_domain::Result;

/// Samples how long the workstation has been idle.
pub trait IdleProbe: Send + Sync {
    /// Current OS idle duration.
    fn idle_duration(&self) -> Result<Duration>;
}

/// Resolves the foreground application.
#[async_trait]
pub trait ForegroundProvider: Send + Sync {
    /// Name of the frontmost application process.
    async fn foreground_app(&self) -> Result<String>;
}

/// Resolves the active browser tab for a foreground application.
#[async_trait]
pub trait TabResolver: Send + Sync {
    /// Best-effort `{url, title}` for the app, `None` when unsupported or
    /// unavailable. Failures must degrade to "no URL" at the capture site.
    async fn resolve_active_tab(&self, app_name: &str) -> Result<Option<TabInfo>>;
}

/// One captured display frame, already PNG-encoded.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    /// Display label used in the screenshot filename (`display<N>`).
    pub display: String,
    pub png: Vec<u8>,
}

/// Captures the current screens.
#[async_trait]
pub trait ScreenGrabber: Send + Sync {
    /// One frame per attached display.
    async fn grab(&self) -> Result<Vec<CapturedFrame>>;
}

/// Read side of the remotely fetched sampling policy.
pub trait SamplingPolicy: Send + Sync {
    /// Screenshot/capture interval in minutes. Implementations return a
    /// safe default until a policy has been fetched.
    fn screenshot_interval_min(&self) -> u64;
}
