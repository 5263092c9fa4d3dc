//! Safari tab resolution
//!
//! Safari exposes no session files; the closest structured source is its
//! history database, which only exists on macOS.

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags};
use tempo_domain::errors::{Result, TempoError};
use tempo_domain::types::TabInfo;

pub fn resolve() -> Result<Option<TabInfo>> {
    if !cfg!(target_os = "macos") {
        return Err(TempoError::UnsupportedPlatform(
            "Safari history is only available on macOS".to_string(),
        ));
    }

    let db = history_db_path()?;
    if !db.exists() {
        return Err(TempoError::ProfileNotFound(format!(
            "no Safari history at {}",
            db.display()
        )));
    }
    query_history_copy(&db)
}

fn history_db_path() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join("Library/Safari/History.db"))
        .ok_or_else(|| TempoError::ProfileNotFound("no home directory".to_string()))
}

/// Query the most recent visit from a copy of Safari's `History.db`.
pub fn query_history_copy(db: &Path) -> Result<Option<TabInfo>> {
    let copy = tempfile::Builder::new()
        .prefix("tempo-safari-")
        .tempfile()
        .map_err(|e| TempoError::Platform(format!("failed to create temp copy: {e}")))?;
    std::fs::copy(db, copy.path())?;

    let conn = Connection::open_with_flags(copy.path(), OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(|e| TempoError::Database(format!("failed to open history copy: {e}")))?;

    let row = conn.query_row(
        "SELECT i.url, v.title
         FROM history_items i
         JOIN history_visits v ON v.history_item = i.id
         ORDER BY v.visit_time DESC
         LIMIT 1",
        [],
        |row| Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?)),
    );

    match row {
        Ok((url, title)) => Ok(Some(TabInfo::exact(url, title.filter(|t| !t.is_empty())))),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(TempoError::Database(format!("history query failed: {e}"))),
    }
}
