//! Time entry store
//!
//! Unlike the other queues, rows are written in two steps: `open` when a
//! task starts, `close` when it stops. Only closed rows are pending upload.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::params;
use serde_json::json;
use tempo_core::sync::{PendingUpload, SyncBacklog};
use tempo_domain::constants::SENTINEL_TASK_ID;
use tempo_domain::errors::{Result, TempoError};
use tempo_domain::types::TaskKey;

use super::manager::{map_join_error, map_sql_error, DbManager};
use super::{datetime_from_ms, parse_row_id, wire_timestamp};

pub struct TimeEntryRepository {
    db: Arc<DbManager>,
}

impl TimeEntryRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Open a new entry for the key, returning its row id.
    pub async fn open(&self, key: TaskKey, start_time: DateTime<Utc>) -> Result<i64> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get()?;
            conn.execute(
                "INSERT INTO time_entries (project_id, task_id, start_ms, end_ms)
                 VALUES (?1, ?2, ?3, NULL)",
                params![key.project_id, key.task_id, start_time.timestamp_millis()],
            )
            .map_err(map_sql_error)?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_join_error)?
    }

    /// Close an open entry, making it eligible for upload.
    pub async fn close(&self, id: i64, end_time: DateTime<Utc>) -> Result<()> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get()?;
            let updated = conn
                .execute(
                    "UPDATE time_entries SET end_ms = ?1 WHERE id = ?2 AND end_ms IS NULL",
                    params![end_time.timestamp_millis(), id],
                )
                .map_err(map_sql_error)?;
            if updated == 0 {
                return Err(TempoError::NotFound(format!("no open time entry with id {id}")));
            }
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    pub async fn count(&self) -> Result<i64> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get()?;
            conn.query_row("SELECT COUNT(*) FROM time_entries", [], |r| r.get(0))
                .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }
}

#[async_trait]
impl SyncBacklog for TimeEntryRepository {
    async fn pending(&self, limit: usize) -> Result<Vec<PendingUpload>> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get()?;
            let mut stmt = conn
                .prepare(
                    "SELECT id, project_id, task_id, start_ms, end_ms
                     FROM time_entries
                     WHERE end_ms IS NOT NULL
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
                        row.get::<_, i64>(3)?,
                        row.get::<_, i64>(4)?,
                    ))
                })
                .map_err(map_sql_error)?;

            let mut uploads = Vec::new();
            for row in rows {
                let (id, project_id, task_id, start_ms, end_ms) = row.map_err(map_sql_error)?;
                let mut body = json!({
                    "project_id": project_id,
                    "start_time": wire_timestamp(datetime_from_ms(start_ms)?),
                    "end_time": wire_timestamp(datetime_from_ms(end_ms)?),
                });
                if task_id != SENTINEL_TASK_ID {
                    body["task_id"] = json!(task_id);
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
            conn.execute("DELETE FROM time_entries WHERE id = ?1", [row_id])
                .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}
