//! Duration span queue

use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::params;
use serde_json::json;
use tempo_core::sync::{PendingUpload, SyncBacklog};
use tempo_domain::constants::SENTINEL_TASK_ID;
use tempo_domain::errors::Result;
use tempo_domain::types::DurationRecord;

use super::manager::{map_join_error, map_sql_error, DbManager};
use super::{datetime_from_ms, parse_row_id, wire_timestamp};

pub struct DurationRepository {
    db: Arc<DbManager>,
}

impl DurationRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    pub async fn insert(&self, record: DurationRecord) -> Result<i64> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get()?;
            conn.execute(
                "INSERT INTO duration_records
                     (project_id, task_id, app_name, url, start_ms, end_ms)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.project_id,
                    record.task_id,
                    record.app_name,
                    record.url,
                    record.start_time.timestamp_millis(),
                    record.end_time.timestamp_millis()
                ],
            )
            .map_err(map_sql_error)?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_join_error)?
    }

    pub async fn count(&self) -> Result<i64> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get()?;
            conn.query_row("SELECT COUNT(*) FROM duration_records", [], |r| r.get(0))
                .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }
}

#[async_trait]
impl SyncBacklog for DurationRepository {
    async fn pending(&self, limit: usize) -> Result<Vec<PendingUpload>> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get()?;
            let mut stmt = conn
                .prepare(
                    "SELECT id, project_id, task_id, app_name, url, start_ms, end_ms
                     FROM duration_records
                     ORDER BY start_ms ASC, id ASC
                     LIMIT ?1",
                )
                .map_err(map_sql_error)?;

            let rows = stmt
                .query_map([limit as i64], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, i64>(5)?,
                        row.get::<_, i64>(6)?,
                    ))
                })
                .map_err(map_sql_error)?;

            let mut uploads = Vec::new();
            for row in rows {
                let (id, project_id, task_id, app_name, url, start_ms, end_ms) =
                    row.map_err(map_sql_error)?;
                let mut body = json!({
                    "project_id": project_id,
                    "app_name": app_name,
                    "start_time": wire_timestamp(datetime_from_ms(start_ms)?),
                    "end_time": wire_timestamp(datetime_from_ms(end_ms)?),
                });
                if task_id != SENTINEL_TASK_ID {
                    body["task_id"] = json!(task_id);
                }
                if !url.is_empty() {
                    body["url"] = json!(url);
                }
                uploads.push(PendingUpload { id: id.to_string(), body });
            }
            Ok(uploads)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn remove(&self, id: &str) -> Result<()> {
        let row_id = parse_row_id(id)?;
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get()?;
            conn.execute("DELETE FROM duration_records WHERE id = ?1", [row_id])
                .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use tempo_domain::types::ObservationKind;

    use super::*;
    use crate::database::open_store;
    use crate::paths::DataLayout;

    fn span(task_id: i64, start: i64, end: i64) -> DurationRecord {
        DurationRecord {
            id: 0,
            project_id: 3,
            task_id,
            app_name: "Xcode".to_string(),
            url: String::new(),
            start_time: Utc.timestamp_opt(1_700_000_000 + start, 0).unwrap(),
            end_time: Utc.timestamp_opt(1_700_000_000 + end, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn payload_carries_both_span_endpoints() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DataLayout::new(dir.path().to_path_buf());
        let repo =
            DurationRepository::new(open_store(&layout, ObservationKind::Duration).unwrap());

        repo.insert(span(7, 0, 30)).await.unwrap();
        let pending = repo.pending(10).await.unwrap();
        let body = &pending[0].body;
        assert_eq!(body["task_id"], 7);
        assert_eq!(body["start_time"], "2023-11-14T22:13:20.000Z");
        assert_eq!(body["end_time"], "2023-11-14T22:13:50.000Z");
        assert!(body.get("url").is_none());

        repo.remove(&pending[0].id).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 0);
    }
}
