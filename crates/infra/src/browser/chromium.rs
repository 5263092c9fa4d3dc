//! Chromium-family tab resolution
//!
//! Chrome and Edge keep the same `History` SQLite database inside their
//! profile directories; a running browser holds it locked, so the query
//! runs against a temporary copy.

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags};
use tempo_domain::errors::{Result, TempoError};
use tempo_domain::types::{ChromiumBrowser, TabInfo};

pub fn resolve(browser: ChromiumBrowser) -> Result<Option<TabInfo>> {
    let history = history_db_path(browser)?;
    query_history_copy(&history)
}

fn history_db_path(browser: ChromiumBrowser) -> Result<PathBuf> {
    let db = default_profile_dir(browser)?.join("History");
    if db.exists() {
        Ok(db)
    } else {
        Err(TempoError::ProfileNotFound(format!("no history database at {}", db.display())))
    }
}

pub(crate) fn default_profile_dir(browser: ChromiumBrowser) -> Result<PathBuf> {
    let base = if cfg!(target_os = "macos") {
        dirs::data_dir().map(|d| match browser {
            ChromiumBrowser::Chrome => d.join("Google/Chrome"),
            ChromiumBrowser::Edge => d.join("Microsoft Edge"),
        })
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir().map(|d| match browser {
            ChromiumBrowser::Chrome => d.join("Google/Chrome/User Data"),
            ChromiumBrowser::Edge => d.join("Microsoft/Edge/User Data"),
        })
    } else {
        dirs::config_dir().map(|d| match browser {
            ChromiumBrowser::Chrome => d.join("google-chrome"),
            ChromiumBrowser::Edge => d.join("microsoft-edge"),
        })
    };

    base.map(|d| d.join("Default")).ok_or_else(|| {
        TempoError::ProfileNotFound("no platform profile base directory".to_string())
    })
}

/// Query the most recently visited URL from a copy of a Chromium `History`
/// database.
pub fn query_history_copy(db: &Path) -> Result<Option<TabInfo>> {
    let copy = tempfile::Builder::new()
        .prefix("tempo-history-")
        .tempfile()
        .map_err(|e| TempoError::Platform(format!("failed to create temp copy: {e}")))?;
    std::fs::copy(db, copy.path())?;

    let conn = Connection::open_with_flags(copy.path(), OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(|e| TempoError::Database(format!("failed to open history copy: {e}")))?;

    let row = conn.query_row(
        "SELECT url, title FROM urls ORDER BY last_visit_time DESC LIMIT 1",
        [],
        |row| Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?)),
    );

    match row {
        Ok((url, title)) => Ok(Some(TabInfo::exact(url, title.filter(|t| !t.is_empty())))),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(TempoError::Database(format!("history query failed: {e}"))),
    }
}
