//! Browser session-state model
//!
//! Parses the JSON produced by decoding a session snapshot container and
//! selects the tab the user most recently had in front: most recently
//! accessed window, most recently accessed tab within it, then the tab's
//! current navigation entry (`entries[index - 1]`, falling back to the last
//! entry).

use serde::Deserialize;
use tempo_domain::types::TabInfo;

/// Root of a decoded session snapshot.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionState {
    #[serde(default)]
    pub windows: Vec<SessionWindow>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionWindow {
    #[serde(default)]
    pub tabs: Vec<SessionTab>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionTab {
    #[serde(default)]
    pub entries: Vec<SessionEntry>,
    /// 1-based index of the current navigation entry.
    #[serde(default)]
    pub index: usize,
    #[serde(default, rename = "lastAccessed")]
    pub last_accessed: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionEntry {
    pub url: Option<String>,
    pub title: Option<String>,
}

impl SessionState {
    /// Parse decoded snapshot bytes.
    pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    /// Select the most recently accessed tab across all windows.
    ///
    /// Returns `None` when the session has no windows, no tabs, or the
    /// selected tab has no usable navigation entry.
    pub fn current_tab(&self) -> Option<TabInfo> {
        // Windows carry no access stamp of their own; the window owning the
        // most recently accessed tab wins.
        let tab = self
            .windows
            .iter()
            .flat_map(|window| window.tabs.iter())
            .max_by_key(|tab| tab.last_accessed)?;

        let entry = tab
            .index
            .checked_sub(1)
            .and_then(|idx| tab.entries.get(idx))
            .or_else(|| tab.entries.last())?;

        let url = entry.url.clone()?;
        Some(TabInfo::exact(url, entry.title.clone()))
    }
}
