//! Durable crawl progress
//!
//! The checkpoint records which listing page to fetch next and how many
//! fictions have been ingested so far. It is written only after the
//! corresponding batch is safely in the repository, so a crash between the
//! two causes at most a re-fetch of the in-flight page.
//!
//! Files are written to a temporary sibling and renamed into place, so a
//! partially written checkpoint never exists on disk.

mod file;
mod refresh;
mod store;

pub use file::write_json_atomic;
pub use refresh::{RefreshCheckpoint, RefreshCheckpointStore};
pub use store::CheckpointStore;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while reading or writing checkpoint files
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed checkpoint: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for checkpoint operations
pub type CheckpointResult<T> = Result<T, CheckpointError>;

/// Persisted crawl progress
///
/// Serialized as `{current_page, total_scraped, last_fiction_id, timestamp}`;
/// missing keys take the defaults of a fresh crawl.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Checkpoint {
    /// Next listing page to fetch (1-indexed)
    pub current_page: u32,

    /// Fictions ingested across the logical run
    pub total_scraped: u64,

    /// Last successfully ingested identifier (diagnostic only)
    pub last_fiction_id: Option<u64>,

    /// When the checkpoint was written, RFC 3339 UTC
    pub timestamp: Option<String>,
}

impl Default for Checkpoint {
    fn default() -> Self {
        Self {
            current_page: 1,
            total_scraped: 0,
            last_fiction_id: None,
            timestamp: None,
        }
    }
}

impl Checkpoint {
    /// Returns true if no progress has been recorded
    pub fn is_fresh(&self) -> bool {
        self.current_page <= 1 && self.total_scraped == 0
    }

    /// Page cursor, with the invalid value 0 read as page 1
    pub fn start_page(&self) -> u32 {
        self.current_page.max(1)
    }
}
