//! SQLite-backed observation queues, one database per kind.

pub mod activity_repository;
pub mod duration_repository;
pub mod idle_repository;
pub mod manager;
pub mod time_entry_repository;

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use tempo_domain::errors::{Result, TempoError};
use tempo_domain::types::ObservationKind;

pub use activity_repository::ActivityRepository;
pub use duration_repository::DurationRepository;
pub use idle_repository::IdleRepository;
pub use manager::DbManager;
pub use time_entry_repository::TimeEntryRepository;

use crate::paths::DataLayout;

const POOL_SIZE: u32 = 4;

/// Open the store for one database-backed observation kind.
pub fn open_store(layout: &DataLayout, kind: ObservationKind) -> Result<Arc<DbManager>> {
    let schema = match kind {
        ObservationKind::Activity => include_str!("schema/activity.sql"),
        ObservationKind::Duration => include_str!("schema/duration.sql"),
        ObservationKind::Idle => include_str!("schema/idle.sql"),
        ObservationKind::TimeEntry => include_str!("schema/time_entry.sql"),
        ObservationKind::Screenshot => {
            return Err(TempoError::Config(
                "screenshots are spooled as files, not database rows".to_string(),
            ));
        }
    };
    DbManager::open(&layout.database_path(kind), POOL_SIZE, schema).map(Arc::new)
}

/// Parse a stored millisecond timestamp back into a `DateTime<Utc>`.
pub(crate) fn datetime_from_ms(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| TempoError::CorruptData(format!("invalid stored timestamp: {ms}")))
}

/// Wire format for timestamps: RFC 3339 with millisecond precision, UTC `Z`.
pub(crate) fn wire_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a backlog row id handed back by the sync processor.
pub(crate) fn parse_row_id(id: &str) -> Result<i64> {
    id.parse::<i64>()
        .map_err(|_| TempoError::InvalidInput(format!("invalid row id: {id}")))
}
