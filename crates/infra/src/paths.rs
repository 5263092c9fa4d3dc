//! On-disk layout for local observation data
//!
//! Everything the agent persists lives under a single data root: one
//! directory (holding one SQLite database) per observation kind, plus the
//! screenshot spool directory.

use std::fs;
use std::path::{Path, PathBuf};

use tempo_domain::errors::{Result, TempoError};
use tempo_domain::types::ObservationKind;

/// Resolved data root and the per-kind paths derived from it.
#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    /// Resolve the data root: an explicit directory from configuration, or
    /// the platform data directory otherwise.
    pub fn resolve(configured: Option<&Path>) -> Result<Self> {
        let root = match configured {
            Some(dir) => dir.to_path_buf(),
            None => dirs::data_dir()
                .ok_or_else(|| {
                    TempoError::Config("no platform data directory available".to_string())
                })?
                .join("tempo"),
        };
        Ok(Self { root })
    }

    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Database file for one observation kind, e.g. `<root>/activity/activity.db`.
    pub fn database_path(&self, kind: ObservationKind) -> PathBuf {
        self.root.join(kind.as_str()).join(format!("{}.db", kind.as_str()))
    }

    /// Spool directory holding pending screenshot files.
    pub fn screenshots_dir(&self) -> PathBuf {
        self.root.join("screenshots")
    }

    /// Create the root and screenshot directories. Database directories are
    /// created lazily when each store opens.
    pub fn ensure(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        fs::create_dir_all(self.screenshots_dir())?;
        Ok(())
    }
}
