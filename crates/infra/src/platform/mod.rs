//! Platform probes
//!
//! System-level lookups the tracking services depend on: workstation idle
//! time and the frontmost application. macOS is the supported platform;
//! elsewhere the probes report `UnsupportedPlatform` and the services
//! degrade gracefully.

pub mod macos;

use std::time::Duration;

use async_trait::async_trait;
use tempo_core::tracking::{ForegroundProvider, IdleProbe};
use tempo_domain::errors::{Result, TempoError};

/// OS idle-time probe backed by the platform's HID idle counter.
#[derive(Debug, Default)]
pub struct SystemIdleProbe;

impl SystemIdleProbe {
    pub fn new() -> Self {
        Self
    }
}

impl IdleProbe for SystemIdleProbe {
    fn idle_duration(&self) -> Result<Duration> {
        if cfg!(target_os = "macos") {
            macos::hid_idle_duration()
        } else {
            Err(TempoError::UnsupportedPlatform(
                "idle sampling is only implemented on macOS".to_string(),
            ))
        }
    }
}

/// Frontmost-application probe.
#[derive(Debug, Default)]
pub struct SystemForegroundProvider;

impl SystemForegroundProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ForegroundProvider for SystemForegroundProvider {
    async fn foreground_app(&self) -> Result<String> {
        if !cfg!(target_os = "macos") {
            return Err(TempoError::UnsupportedPlatform(
                "foreground lookup is only implemented on macOS".to_string(),
            ));
        }
        tokio::task::spawn_blocking(macos::frontmost_app_name)
            .await
            .map_err(|e| TempoError::Internal(format!("probe task failed: {e}")))?
    }
}

/// Screen grabber shelling out to the platform capture utility.
#[derive(Debug, Default)]
pub struct SystemScreenGrabber;

impl SystemScreenGrabber {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl tempo_core::tracking::ScreenGrabber for SystemScreenGrabber {
    async fn grab(&self) -> Result<Vec<tempo_core::tracking::CapturedFrame>> {
        if !cfg!(target_os = "macos") {
            return Err(TempoError::UnsupportedPlatform(
                "screen capture is only implemented on macOS".to_string(),
            ));
        }
        tokio::task::spawn_blocking(macos::capture_displays)
            .await
            .map_err(|e| TempoError::Internal(format!("capture task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(target_os = "macos"))]
    #[tokio::test]
    async fn screen_grabber_is_unsupported_off_macos() {
        use tempo_core::tracking::ScreenGrabber;
        let err = SystemScreenGrabber::new().grab().await.unwrap_err();
        assert!(matches!(err, TempoError::UnsupportedPlatform(_)));
    }

    #[cfg(not(target_os = "macos"))]
    #[test]
    fn idle_probe_is_unsupported_off_macos() {
        let err = SystemIdleProbe::new().idle_duration().unwrap_err();
        assert!(matches!(err, TempoError::UnsupportedPlatform(_)));
    }

    #[cfg(not(target_os = "macos"))]
    #[tokio::test]
    async fn foreground_probe_is_unsupported_off_macos() {
        let err = SystemForegroundProvider::new().foreground_app().await.unwrap_err();
        assert!(matches!(err, TempoError::UnsupportedPlatform(_)));
    }
}
