//! Storage module for persisting fictions
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema migration
//! - Identifier-keyed, batch-atomic upserts of fiction records
//! - Cursor-style identifier scans for the refresh pass
//! - Aggregate counts for statistics

mod schema;
mod sqlite;
mod traits;

pub use schema::{get_schema_version, initialize_schema, migrate_schema, SCHEMA_VERSION};
pub use sqlite::{open_repository, SqliteRepository};
pub use traits::{Repository, StorageError, StorageResult};
