//! Browser classification and resolved-tab types

use serde::{Deserialize, Serialize};

/// How much trust to place in a resolved tab.
///
/// `Heuristic` marks results recovered by scraping binary session files;
/// they are best-effort and never promoted over a structured lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    Exact,
    Heuristic,
}

/// Best-effort description of the browser tab currently in front.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabInfo {
    pub url: String,
    pub title: Option<String>,
    pub confidence: Confidence,
}

impl TabInfo {
    pub fn exact(url: impl Into<String>, title: Option<String>) -> Self {
        Self { url: url.into(), title, confidence: Confidence::Exact }
    }

    pub fn heuristic(url: impl Into<String>) -> Self {
        Self { url: url.into(), title: None, confidence: Confidence::Heuristic }
    }
}

/// Chromium-family browsers share the profile/history layout but differ in
/// where profiles live on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChromiumBrowser {
    Chrome,
    Edge,
}

/// Tagged dispatch target for the activity resolver.
///
/// Selected once per capture via [`BrowserKind::classify`]; every variant
/// resolves through the same "current tab" capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserKind {
    Chromium(ChromiumBrowser),
    Firefox,
    Safari,
    Unsupported,
}

impl BrowserKind {
    /// Classify a foreground process name by lower-cased substring match.
    pub fn classify(process_name: &str) -> Self {
        let name = process_name.to_lowercase();
        if name.contains("edge") {
            Self::Chromium(ChromiumBrowser::Edge)
        } else if name.contains("chrome") {
            Self::Chromium(ChromiumBrowser::Chrome)
        } else if name.contains("firefox") {
            Self::Firefox
        } else if name.contains("safari") {
            Self::Safari
        } else {
            Self::Unsupported
        }
    }

    /// Whether the process is one of the recognized browsers.
    pub fn is_browser(process_name: &str) -> bool {
        !matches!(Self::classify(process_name), Self::Unsupported)
    }
}
