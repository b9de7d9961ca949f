use crate::checkpoint::file::{read_json, remove_if_exists, write_json_atomic};
use crate::checkpoint::CheckpointResult;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Progress of the refresh pass over stored fictions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshCheckpoint {
    /// Highest identifier already revisited; the pass resumes above it
    pub last_processed_id: u64,

    pub timestamp: Option<String>,
}

/// File-backed refresh checkpoint
#[derive(Debug)]
pub struct RefreshCheckpointStore {
    path: PathBuf,
}

impl RefreshCheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the refresh cursor; missing or corrupt files start from zero
    pub fn load(&self) -> RefreshCheckpoint {
        match read_json::<RefreshCheckpoint>(&self.path) {
            Ok(Some(checkpoint)) => {
                tracing::info!(
                    "Resuming refresh from fiction ID > {}",
                    checkpoint.last_processed_id
                );
                checkpoint
            }
            Ok(None) => RefreshCheckpoint::default(),
            Err(e) => {
                tracing::warn!(
                    "Could not load refresh checkpoint {}: {}; starting from the beginning",
                    self.path.display(),
                    e
                );
                RefreshCheckpoint::default()
            }
        }
    }

    pub fn save(&self, last_processed_id: u64) -> CheckpointResult<RefreshCheckpoint> {
        let checkpoint = RefreshCheckpoint {
            last_processed_id,
            timestamp: Some(Utc::now().to_rfc3339()),
        };
        write_json_atomic(&self.path, &checkpoint)?;
        Ok(checkpoint)
    }

    pub fn clear(&self) -> CheckpointResult<()> {
        remove_if_exists(&self.path)
    }
}
