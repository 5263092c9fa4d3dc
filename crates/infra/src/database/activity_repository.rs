//! Activity record queue

use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::params;
use serde_json::json;
use tempo_core::sync::{PendingUpload, SyncBacklog};
use tempo_domain::constants::SENTINEL_TASK_ID;
use tempo_domain::errors::Result;
use tempo_domain::types::ActivityRecord;

use super::manager::{map_join_error, map_sql_error, DbManager};
use super::{datetime_from_ms, parse_row_id, wire_timestamp};

pub struct ActivityRepository {
    db: Arc<DbManager>,
}

impl ActivityRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    pub async fn insert(&self, record: ActivityRecord) -> Result<i64> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get()?;
            conn.execute(
                "INSERT INTO activity_records (project_id, task_id, app_name, url, timestamp_ms)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.project_id,
                    record.task_id,
                    record.app_name,
                    record.url,
                    record.timestamp.timestamp_millis()
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
            conn.query_row("SELECT COUNT(*) FROM activity_records", [], |r| r.get(0))
                .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }
}

#[async_trait]
impl SyncBacklog for ActivityRepository {
    async fn pending(&self, limit: usize) -> Result<Vec<PendingUpload>> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get()?;
            let mut stmt = conn
                .prepare(
                    "SELECT id, project_id, task_id, app_name, url, timestamp_ms
                     FROM activity_records
                     ORDER BY timestamp_ms ASC, id ASC
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
                    ))
                })
                .map_err(map_sql_error)?;

            let mut uploads = Vec::new();
            for row in rows {
                let (id, project_id, task_id, app_name, url, ts_ms) =
                    row.map_err(map_sql_error)?;
                let mut body = json!({
                    "project_id": project_id,
                    "app_name": app_name,
                    "timestamp": wire_timestamp(datetime_from_ms(ts_ms)?),
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
            conn.execute("DELETE FROM activity_records WHERE id = ?1", [row_id])
                .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}
