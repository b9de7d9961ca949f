//! Storage traits and error types
//!
//! This module defines the trait interface for fiction repositories and the
//! associated error types.

use crate::record::FictionRecord;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Value out of range: {0}")]
    ValueOutOfRange(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for fiction repository implementations
///
/// The central contract is [`upsert_batch`](Repository::upsert_batch):
/// identifier-keyed insert-or-overwrite, atomic per batch. Because an upsert
/// replaces every field but the identifier, retrying a whole batch after a
/// failure or a crash is idempotent.
pub trait Repository {
    /// Inserts new identifiers and overwrites every field of existing ones
    ///
    /// Either all records become visible or none do.
    fn upsert_batch(&mut self, records: &[FictionRecord]) -> StorageResult<()>;

    /// Gets a fiction by identifier
    fn get_fiction(&self, fiction_id: u64) -> StorageResult<Option<FictionRecord>>;

    /// Counts stored fictions
    fn count_fictions(&self) -> StorageResult<u64>;

    /// Returns up to `limit` stored identifiers greater than `after_id`, ascending
    ///
    /// Used as a monotonic cursor: callers re-query with the last identifier
    /// they handled instead of relying on offsets over a changing table.
    fn ids_after(&self, after_id: u64, limit: usize) -> StorageResult<Vec<u64>>;

    /// Counts fictions per status; fictions without a status are grouped under `None`
    fn count_by_status(&self) -> StorageResult<Vec<(Option<String>, u64)>>;
}
