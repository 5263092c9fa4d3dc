//! Screenshot spool
//!
//! Screenshots never touch SQLite: the capture side writes PNG files whose
//! names encode the queue entry, a directory scan is the pending-set query,
//! and deleting the file is the acknowledgment.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::json;
use tempo_core::sync::{PendingUpload, SyncBacklog};
use tempo_domain::constants::SENTINEL_TASK_ID;
use tempo_domain::errors::{Result, TempoError};
use tempo_domain::types::ScreenshotName;
use tracing::debug;

/// Writes captured frames into the spool directory.
pub struct ScreenshotStore {
    dir: PathBuf,
}

impl ScreenshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn store(&self, name: &ScreenshotName, png: &[u8]) -> Result<PathBuf> {
        let path = self.dir.join(name.file_name());
        let bytes = png.to_vec();
        let target = path.clone();
        tokio::task::spawn_blocking(move || std::fs::write(&target, bytes))
            .await
            .map_err(|e| TempoError::Internal(format!("screenshot write task failed: {e}")))??;
        debug!(path = %path.display(), "screenshot spooled");
        Ok(path)
    }
}

/// Pending-upload view of the spool directory.
pub struct ScreenshotQueue {
    dir: PathBuf,
}

impl ScreenshotQueue {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn scan(dir: &Path, limit: usize) -> Result<Vec<PendingUpload>> {
        let mut named = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else { continue };
            // Foreign files in the spool are ignored, not errors.
            if let Ok(parsed) = ScreenshotName::parse(name) {
                named.push((parsed, name.to_string()));
            }
        }
        named.sort_by_key(|(parsed, _)| parsed.timestamp);

        let mut uploads = Vec::new();
        for (parsed, file_name) in named.into_iter().take(limit) {
            let bytes = std::fs::read(dir.join(&file_name))?;
            let mut body = json!({
                "project_id": parsed.project_id,
                "timestamp": parsed
                    .timestamp
                    .to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
                "display": parsed.display,
                "image": BASE64.encode(&bytes),
            });
            if parsed.task_id != SENTINEL_TASK_ID {
                body["task_id"] = json!(parsed.task_id);
            }
            uploads.push(PendingUpload { id: file_name, body });
        }
        Ok(uploads)
    }
}

#[async_trait]
impl SyncBacklog for ScreenshotQueue {
    async fn pending(&self, limit: usize) -> Result<Vec<PendingUpload>> {
        let dir = self.dir.clone();
        tokio::task::spawn_blocking(move || Self::scan(&dir, limit))
            .await
            .map_err(|e| TempoError::Internal(format!("spool scan task failed: {e}")))?
    }

    async fn remove(&self, id: &str) -> Result<()> {
        // The id is a filename produced by `pending`; anything else is
        // rejected before it can escape the spool directory.
        ScreenshotName::parse(id)?;
        let path = self.dir.join(id);
        let removed = tokio::task::spawn_blocking(move || std::fs::remove_file(&path))
            .await
            .map_err(|e| TempoError::Internal(format!("spool delete task failed: {e}")))?;
        match removed {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc as StdArc;

    use chrono::{TimeZone, Utc};

    use super::*;

    fn name(secs: i64, display: &str) -> ScreenshotName {
        ScreenshotName::new(
            5,
            -1,
            Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
            display,
        )
    }

    #[tokio::test]
    async fn spooled_files_become_base64_payloads() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScreenshotStore::new(dir.path()).unwrap();
        store.store(&name(0, "1"), b"fake-png").await.unwrap();

        let queue = ScreenshotQueue::new(dir.path());
        let pending = queue.pending(10).await.unwrap();
        assert_eq!(pending.len(), 1);
        let body = &pending[0].body;
        assert_eq!(body["project_id"], 5);
        assert!(body.get("task_id").is_none());
        assert_eq!(body["display"], "1");
        assert_eq!(body["image"], BASE64.encode(b"fake-png"));
    }

    #[tokio::test]
    async fn pending_is_ordered_by_timestamp_and_remove_deletes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScreenshotStore::new(dir.path()).unwrap();
        store.store(&name(10, "1"), b"later").await.unwrap();
        store.store(&name(0, "1"), b"earlier").await.unwrap();

        let queue = ScreenshotQueue::new(dir.path());
        let pending = queue.pending(10).await.unwrap();
        assert_eq!(pending[0].body["image"], BASE64.encode(b"earlier"));

        queue.remove(&pending[0].id).await.unwrap();
        assert_eq!(queue.pending(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn foreign_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"not a screenshot").unwrap();

        let queue = ScreenshotQueue::new(dir.path());
        assert!(queue.pending(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn remove_rejects_ids_that_are_not_queue_filenames() {
        let dir = tempfile::tempdir().unwrap();
        let queue = ScreenshotQueue::new(dir.path());
        assert!(queue.remove("../../etc/passwd").await.is_err());
    }

    #[tokio::test]
    async fn removing_an_already_gone_file_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let queue = ScreenshotQueue::new(dir.path());
        queue.remove(&name(0, "1").file_name()).await.unwrap();
    }

    #[test]
    fn queue_is_shareable_across_tasks() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<StdArc<ScreenshotQueue>>();
    }
}
