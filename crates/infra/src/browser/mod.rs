//! Browser activity resolution
//!
//! One resolver per browser family, all funneled through a single
//! [`TabResolver`] implementation that classifies the foreground process
//! name and dispatches. Every strategy is blocking filesystem/SQLite work
//! and runs on the blocking pool.

pub mod chromium;
pub mod edge_session;
pub mod firefox;
pub mod safari;

use async_trait::async_trait;
use tempo_core::tracking::TabResolver;
use tempo_domain::errors::{Result, TempoError};
use tempo_domain::types::{BrowserKind, ChromiumBrowser, TabInfo};
use tracing::debug;

/// Dispatching [`TabResolver`] over all supported browser families.
#[derive(Debug, Default)]
pub struct BrowserResolver;

impl BrowserResolver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TabResolver for BrowserResolver {
    async fn resolve_active_tab(&self, app_name: &str) -> Result<Option<TabInfo>> {
        let kind = BrowserKind::classify(app_name);
        if kind == BrowserKind::Unsupported {
            return Ok(None);
        }
        tokio::task::spawn_blocking(move || resolve_blocking(kind))
            .await
            .map_err(|e| TempoError::Internal(format!("resolver task failed: {e}")))?
    }
}

fn resolve_blocking(kind: BrowserKind) -> Result<Option<TabInfo>> {
    match kind {
        BrowserKind::Chromium(ChromiumBrowser::Chrome) => {
            chromium::resolve(ChromiumBrowser::Chrome)
        }
        BrowserKind::Chromium(ChromiumBrowser::Edge) => {
            // Edge locks its history more aggressively than Chrome; fall
            // back to scraping the session files when the structured path
            // fails.
            chromium::resolve(ChromiumBrowser::Edge).or_else(|err| {
                debug!(error = %err, "edge history lookup failed, scanning session files");
                edge_session::resolve()
            })
        }
        BrowserKind::Firefox => firefox::resolve(),
        BrowserKind::Safari => safari::resolve(),
        BrowserKind::Unsupported => Ok(None),
    }
}
