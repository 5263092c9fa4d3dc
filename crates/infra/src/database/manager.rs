//! SQLite connection management
//!
//! One pooled database per observation kind. Connections run in WAL mode so
//! the capture path and the sync processors can touch the same store
//! without blocking each other.

use std::fs;
use std::path::{Path, PathBuf};

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tempo_domain::errors::{Result, TempoError};
use tracing::info;

pub type DbConnection = PooledConnection<SqliteConnectionManager>;

pub struct DbManager {
    pool: Pool<SqliteConnectionManager>,
    path: PathBuf,
}

impl DbManager {
    /// Open (creating if necessary) the database at `path` and apply the
    /// given schema.
    pub fn open(path: &Path, pool_size: u32, schema_sql: &str) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
            )
        });

        let pool = Pool::builder()
            .max_size(pool_size.max(1))
            .build(manager)
            .map_err(|e| TempoError::Database(format!("failed to create pool: {e}")))?;

        let conn = pool
            .get()
            .map_err(|e| TempoError::Database(format!("failed to get connection: {e}")))?;
        conn.execute_batch(schema_sql)
            .map_err(|e| TempoError::Database(format!("failed to apply schema: {e}")))?;

        info!(path = %path.display(), "database opened");
        Ok(Self { pool, path: path.to_path_buf() })
    }

    pub fn get(&self) -> Result<DbConnection> {
        self.pool
            .get()
            .map_err(|e| TempoError::Database(format!("failed to get connection: {e}")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn health_check(&self) -> Result<()> {
        let conn = self.get()?;
        conn.query_row("SELECT 1", [], |_| Ok(()))
            .map_err(|e| TempoError::Database(format!("health check failed: {e}")))
    }
}

/// Map a blocking-task join failure onto the domain error type.
pub(crate) fn map_join_error(err: tokio::task::JoinError) -> TempoError {
    TempoError::Internal(format!("database task failed: {err}"))
}

/// Map a rusqlite error onto the domain error type.
pub(crate) fn map_sql_error(err: rusqlite::Error) -> TempoError {
    TempoError::Database(err.to_string())
}
