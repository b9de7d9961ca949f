use crate::checkpoint::file::{read_json, remove_if_exists, write_json_atomic};
use crate::checkpoint::{Checkpoint, CheckpointResult};
use chrono::Utc;
use std::path::{Path, PathBuf};

/// File-backed crawl checkpoint
///
/// Keeps the last known checkpoint in memory alongside the file so that
/// `total_scraped` can be kept non-decreasing across saves.
#[derive(Debug)]
pub struct CheckpointStore {
    path: PathBuf,
    current: Checkpoint,
}

impl CheckpointStore {
    /// Creates a store for `path` and loads whatever is persisted there
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let mut store = Self {
            path: path.into(),
            current: Checkpoint::default(),
        };
        store.load();
        store
    }

    /// Path of the checkpoint file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last loaded or saved checkpoint
    pub fn current(&self) -> &Checkpoint {
        &self.current
    }

    /// Reloads the checkpoint from disk
    ///
    /// A missing file yields the defaults. An unreadable or corrupt file
    /// also yields the defaults, with a warning; startup never fails here.
    pub fn load(&mut self) -> Checkpoint {
        self.current = match read_json::<Checkpoint>(&self.path) {
            Ok(Some(mut checkpoint)) => {
                checkpoint.current_page = checkpoint.start_page();
                tracing::info!(
                    "Loaded checkpoint: page {}, {} fictions scraped",
                    checkpoint.current_page,
                    checkpoint.total_scraped
                );
                checkpoint
            }
            Ok(None) => Checkpoint::default(),
            Err(e) => {
                tracing::warn!(
                    "Could not load checkpoint {}: {}; starting from defaults",
                    self.path.display(),
                    e
                );
                Checkpoint::default()
            }
        };
        self.current.clone()
    }

    /// Records progress and persists it atomically
    ///
    /// `total_scraped` never decreases through this method: a lower value is
    /// replaced by the previously saved one. The in-memory checkpoint is
    /// updated even when the write fails, so callers can log and carry on.
    ///
    /// # Arguments
    ///
    /// * `current_page` - Next listing page to fetch
    /// * `total_scraped` - Cumulative ingested fictions
    /// * `last_fiction_id` - Last ingested identifier, if any
    pub fn save(
        &mut self,
        current_page: u32,
        total_scraped: u64,
        last_fiction_id: Option<u64>,
    ) -> CheckpointResult<Checkpoint> {
        let total_scraped = if total_scraped < self.current.total_scraped {
            tracing::warn!(
                "Refusing to lower total_scraped from {} to {}",
                self.current.total_scraped,
                total_scraped
            );
            self.current.total_scraped
        } else {
            total_scraped
        };

        self.current = Checkpoint {
            current_page: current_page.max(1),
            total_scraped,
            last_fiction_id: last_fiction_id.or(self.current.last_fiction_id),
            timestamp: Some(Utc::now().to_rfc3339()),
        };

        write_json_atomic(&self.path, &self.current)?;
        Ok(self.current.clone())
    }

    /// Replaces the checkpoint with operator-supplied values
    ///
    /// Unlike [`save`](Self::save) this may lower the count.
    pub fn overwrite(&mut self, checkpoint: Checkpoint) -> CheckpointResult<Checkpoint> {
        self.current = Checkpoint {
            current_page: checkpoint.start_page(),
            timestamp: Some(Utc::now().to_rfc3339()),
            ..checkpoint
        };
        write_json_atomic(&self.path, &self.current)?;
        Ok(self.current.clone())
    }

    /// Resets to defaults and removes the persisted file
    pub fn clear(&mut self) -> CheckpointResult<()> {
        self.current = Checkpoint::default();
        remove_if_exists(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, CheckpointStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::open(dir.path().join("checkpoint.json"));
        (dir, store)
    }

    #[test]
    fn test_open_without_file_uses_defaults() {
        let (_dir, store) = temp_store();
        assert_eq!(store.current(), &Checkpoint::default());
    }

    #[test]
    fn test_save_then_reopen() {
        let (dir, mut store) = temp_store();
        store.save(5, 100, Some(12345)).unwrap();

        let reopened = CheckpointStore::open(dir.path().join("checkpoint.json"));
        let cp = reopened.current();
        assert_eq!(cp.current_page, 5);
        assert_eq!(cp.total_scraped, 100);
        assert_eq!(cp.last_fiction_id, Some(12345));
        assert!(cp.timestamp.is_some());
    }

    #[test]
    fn test_corrupt_file_degrades_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = CheckpointStore::open(&path);
        assert_eq!(store.current(), &Checkpoint::default());
    }

    #[test]
    fn test_total_never_decreases() {
        let (_dir, mut store) = temp_store();
        store.save(2, 20, Some(1)).unwrap();
        store.save(3, 40, Some(2)).unwrap();
        let cp = store.save(3, 10, None).unwrap();

        assert_eq!(cp.total_scraped, 40);
        assert_eq!(cp.last_fiction_id, Some(2));
    }

    #[test]
    fn test_overwrite_may_lower_count() {
        let (_dir, mut store) = temp_store();
        store.save(10, 500, Some(9)).unwrap();

        let cp = store
            .overwrite(Checkpoint {
                current_page: 2,
                total_scraped: 20,
                last_fiction_id: None,
                timestamp: None,
            })
            .unwrap();

        assert_eq!(cp.current_page, 2);
        assert_eq!(cp.total_scraped, 20);
        assert!(cp.timestamp.is_some());
    }

    #[test]
    fn test_clear_removes_file() {
        let (dir, mut store) = temp_store();
        store.save(4, 60, None).unwrap();
        store.clear().unwrap();

        assert_eq!(store.current(), &Checkpoint::default());
        assert!(!dir.path().join("checkpoint.json").exists());
    }

    #[test]
    fn test_save_failure_keeps_memory_state() {
        let dir = tempfile::tempdir().unwrap();
        // A directory at the target path makes the rename fail
        let path = dir.path().join("checkpoint.json");
        std::fs::create_dir(&path).unwrap();

        let mut store = CheckpointStore::open(&path);
        assert!(store.save(3, 30, Some(7)).is_err());
        assert_eq!(store.current().current_page, 3);
        assert_eq!(store.current().total_scraped, 30);
    }
}
