//! Firefox tab resolution
//!
//! Firefox keeps a compressed snapshot of the whole session under
//! `sessionstore-backups/recovery.jsonlz4`. The container is decoded with
//! the snapshot decoder and the current tab selected from the session tree.

use std::path::{Path, PathBuf};

use tempo_core::session::SessionState;
use tempo_core::snapshot;
use tempo_domain::errors::{Result, TempoError};
use tempo_domain::types::TabInfo;

const RECOVERY_FILE: &str = "sessionstore-backups/recovery.jsonlz4";

pub fn resolve() -> Result<Option<TabInfo>> {
    let profile = default_profile_dir(&profiles_root()?)?;
    read_session(&profile.join(RECOVERY_FILE))
}

fn profiles_root() -> Result<PathBuf> {
    let root = if cfg!(target_os = "macos") {
        dirs::data_dir().map(|d| d.join("Firefox/Profiles"))
    } else if cfg!(target_os = "windows") {
        dirs::data_dir().map(|d| d.join("Mozilla/Firefox/Profiles"))
    } else {
        dirs::home_dir().map(|d| d.join(".mozilla/firefox"))
    };
    root.ok_or_else(|| {
        TempoError::ProfileNotFound("no platform profile base directory".to_string())
    })
}

/// Locate the default profile: `*.default-release` preferred, plain
/// `*.default` accepted.
pub fn default_profile_dir(root: &Path) -> Result<PathBuf> {
    let mut fallback = None;
    for entry in std::fs::read_dir(root).map_err(|e| {
        TempoError::ProfileNotFound(format!("cannot read {}: {e}", root.display()))
    })? {
        let entry = entry?;
        if !entry.path().is_dir() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if name.ends_with(".default-release") {
            return Ok(entry.path());
        }
        if name.ends_with(".default") {
            fallback = Some(entry.path());
        }
    }
    fallback.ok_or_else(|| {
        TempoError::ProfileNotFound(format!("no default profile under {}", root.display()))
    })
}

/// Decode a session snapshot file and select its current tab.
///
/// A missing file means no session has been written yet, not an error.
pub fn read_session(path: &Path) -> Result<Option<TabInfo>> {
    if !path.exists() {
        return Ok(None);
    }

    // A running Firefox rewrites this file continuously; read a copy so a
    // mid-write swap cannot truncate our view.
    let copy = tempfile::Builder::new()
        .prefix("tempo-session-")
        .tempfile()
        .map_err(|e| TempoError::Platform(format!("failed to create temp copy: {e}")))?;
    std::fs::copy(path, copy.path())?;
    let bytes = std::fs::read(copy.path())?;

    let json = snapshot::decode_container(&bytes)?;
    let session = SessionState::from_json(&json)
        .map_err(|e| TempoError::InvalidFormat(format!("session snapshot: {e}")))?;
    Ok(session.current_tab())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_snapshot(path: &Path, json: &serde_json::Value) {
        let raw = serde_json::to_vec(json).unwrap();
        let mut bytes = b"mozLz40\0".to_vec();
        bytes.extend_from_slice(&lz4_flex::block::compress_prepend_size(&raw));
        std::fs::write(path, bytes).unwrap();
    }

    #[test]
    fn prefers_default_release_profile() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("abc.default")).unwrap();
        std::fs::create_dir(dir.path().join("xyz.default-release")).unwrap();
        std::fs::create_dir(dir.path().join("other.profile")).unwrap();

        let profile = default_profile_dir(dir.path()).unwrap();
        assert!(profile.ends_with("xyz.default-release"));
    }

    #[test]
    fn falls_back_to_plain_default_profile() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("abc.default")).unwrap();
        let profile = default_profile_dir(dir.path()).unwrap();
        assert!(profile.ends_with("abc.default"));
    }

    #[test]
    fn missing_profile_is_profile_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = default_profile_dir(dir.path()).unwrap_err();
        assert!(matches!(err, TempoError::ProfileNotFound(_)));
    }

    #[test]
    fn reads_current_tab_from_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recovery.jsonlz4");
        write_snapshot(
            &path,
            &serde_json::json!({
                "windows": [{"tabs": [
                    {"entries": [{"url": "https://docs.example", "title": "Docs"}],
                     "index": 1, "lastAccessed": 42}
                ]}]
            }),
        );

        let tab = read_session(&path).unwrap().unwrap();
        assert_eq!(tab.url, "https://docs.example");
        assert_eq!(tab.title.as_deref(), Some("Docs"));
    }

    #[test]
    fn missing_snapshot_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_session(&dir.path().join("recovery.jsonlz4")).unwrap().is_none());
    }

    #[test]
    fn wrong_magic_is_invalid_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recovery.jsonlz4");
        std::fs::write(&path, b"not-a-snapshot").unwrap();

        let err = read_session(&path).unwrap_err();
        assert!(matches!(err, TempoError::InvalidFormat(_)));
    }
}
