//! Idle period queue

use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::params;
use serde_json::json;
use tempo_core::sync::{PendingUpload, SyncBacklog};
use tempo_core::tracking::ClosedIdlePeriod;
use tempo_domain::constants::SENTINEL_TASK_ID;
use tempo_domain::errors::Result;
use tempo_domain::types::IdleEntry;

use super::manager::{map_join_error, map_sql_error, DbManager};
use super::{datetime_from_ms, parse_row_id, wire_timestamp};

pub struct IdleRepository {
    db: Arc<DbManager>,
}

impl IdleRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    pub async fn insert(&self, entry: IdleEntry) -> Result<i64> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get()?;
            conn.execute(
                "INSERT INTO idle_entries
                     (project_id, task_id, start_ms, end_ms, duration_secs)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    entry.project_id,
                    entry.task_id,
                    entry.start_time.timestamp_millis(),
                    entry.end_time.timestamp_millis(),
                    entry.duration_secs
                ],
            )
            .map_err(map_sql_error)?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_join_error)?
    }

    /// Persist an interval closed by the idle state machine.
    pub async fn insert_period(&self, period: ClosedIdlePeriod) -> Result<i64> {
        self.insert(IdleEntry {
            id: 0,
            project_id: period.key.project_id,
            task_id: period.key.task_id,
            start_time: period.start_time,
            end_time: period.end_time,
            duration_secs: period.duration_secs,
        })
        .await
    }

    pub async fn count(&self) -> Result<i64> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get()?;
            conn.query_row("SELECT COUNT(*) FROM idle_entries", [], |r| r.get(0))
                .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }
}

#[async_trait]
impl SyncBacklog for IdleRepository {
    async fn pending(&self, limit: usize) -> Result<Vec<PendingUpload>> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get()?;
            let mut stmt = conn
                .prepare(
                    "SELECT id, project_id, task_id, start_ms, end_ms, duration_secs
                     FROM idle_entries
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
                        row.get::<_, i64>(5)?,
                    ))
                })
                .map_err(map_sql_error)?;

            let mut uploads = Vec::new();
            for row in rows {
                let (id, project_id, task_id, start_ms, end_ms, duration_secs) =
                    row.map_err(map_sql_error)?;
                let mut body = json!({
                    "project_id": project_id,
                    "start_time": wire_timestamp(datetime_from_ms(start_ms)?),
                    "end_time": wire_timestamp(datetime_from_ms(end_ms)?),
                    "duration": duration_secs,
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
            conn.execute("DELETE FROM idle_entries WHERE id = ?1", [row_id])
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
    use tempo_domain::types::{ObservationKind, TaskKey};

    use super::*;
    use crate::database::open_store;
    use crate::paths::DataLayout;

    #[tokio::test]
    async fn closed_periods_round_trip_into_payloads() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DataLayout::new(dir.path().to_path_buf());
        let repo = IdleRepository::new(open_store(&layout, ObservationKind::Idle).unwrap());

        repo.insert_period(ClosedIdlePeriod {
            key: TaskKey::new(4, -1),
            start_time: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            end_time: Utc.timestamp_opt(1_700_000_090, 0).unwrap(),
            duration_secs: 90,
        })
        .await
        .unwrap();

        let pending = repo.pending(10).await.unwrap();
        let body = &pending[0].body;
        assert_eq!(body["project_id"], 4);
        assert!(body.get("task_id").is_none(), "sentinel task id is omitted");
        assert_eq!(body["duration"], 90);

        repo.remove(&pending[0].id).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 0);
    }
}
