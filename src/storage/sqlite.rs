//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Repository trait.

use crate::record::FictionRecord;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Repository, StorageError, StorageResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

const UPSERT_SQL: &str = "
    INSERT INTO fictions (
        fiction_id, title, author, summary, tags, pages,
        views, avg_views, followers, favorites, rating_count, avg_rating,
        status, last_updated, fiction_type, warning_tags, content_warnings, ingested_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
    ON CONFLICT(fiction_id) DO UPDATE SET
        title = excluded.title,
        author = excluded.author,
        summary = excluded.summary,
        tags = excluded.tags,
        pages = excluded.pages,
        views = excluded.views,
        avg_views = excluded.avg_views,
        followers = excluded.followers,
        favorites = excluded.favorites,
        rating_count = excluded.rating_count,
        avg_rating = excluded.avg_rating,
        status = excluded.status,
        last_updated = excluded.last_updated,
        fiction_type = excluded.fiction_type,
        warning_tags = excluded.warning_tags,
        content_warnings = excluded.content_warnings,
        ingested_at = excluded.ingested_at
";

const SELECT_SQL: &str = "
    SELECT fiction_id, title, author, summary, tags, pages,
           views, avg_views, followers, favorites, rating_count, avg_rating,
           status, last_updated, fiction_type, warning_tags, content_warnings, ingested_at
    FROM fictions WHERE fiction_id = ?1
";

/// SQLite fiction repository
///
/// Owns a single connection for the whole run; the connection is closed when
/// the repository is dropped, on every exit path.
pub struct SqliteRepository {
    conn: Connection,
}

impl SqliteRepository {
    /// Opens (or creates) the database at `path` and migrates its schema
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteRepository)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Closes the connection, reporting any error the close produces
    pub fn close(self) -> StorageResult<()> {
        self.conn.close().map_err(|(_, e)| StorageError::Sqlite(e))
    }
}

impl Repository for SqliteRepository {
    fn upsert_batch(&mut self, records: &[FictionRecord]) -> StorageResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(UPSERT_SQL)?;
            for record in records {
                stmt.execute(params![
                    sql_int(record.fiction_id)?,
                    record.title,
                    record.author,
                    record.summary,
                    to_json(&record.tags)?,
                    sql_opt_int(record.pages)?,
                    sql_opt_int(record.views)?,
                    sql_opt_int(record.avg_views)?,
                    sql_opt_int(record.followers)?,
                    sql_opt_int(record.favorites)?,
                    sql_opt_int(record.rating_count)?,
                    record.avg_rating,
                    record.status,
                    record.last_updated,
                    record.fiction_type,
                    to_json(&record.warning_tags)?,
                    to_json(&record.content_warnings)?,
                    record.ingested_at.to_rfc3339(),
                ])?;
            }
        }
        tx.commit()?;

        Ok(())
    }

    fn get_fiction(&self, fiction_id: u64) -> StorageResult<Option<FictionRecord>> {
        let mut stmt = self.conn.prepare_cached(SELECT_SQL)?;

        let row = stmt
            .query_row(params![sql_int(fiction_id)?], |row| {
                Ok(FictionRow {
                    fiction_id: row.get(0)?,
                    title: row.get(1)?,
                    author: row.get(2)?,
                    summary: row.get(3)?,
                    tags: row.get(4)?,
                    pages: row.get(5)?,
                    views: row.get(6)?,
                    avg_views: row.get(7)?,
                    followers: row.get(8)?,
                    favorites: row.get(9)?,
                    rating_count: row.get(10)?,
                    avg_rating: row.get(11)?,
                    status: row.get(12)?,
                    last_updated: row.get(13)?,
                    fiction_type: row.get(14)?,
                    warning_tags: row.get(15)?,
                    content_warnings: row.get(16)?,
                    ingested_at: row.get(17)?,
                })
            })
            .optional()?;

        row.map(FictionRow::into_record).transpose()
    }

    fn count_fictions(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM fictions", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn ids_after(&self, after_id: u64, limit: usize) -> StorageResult<Vec<u64>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT fiction_id FROM fictions WHERE fiction_id > ?1 ORDER BY fiction_id LIMIT ?2",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let ids = stmt
            .query_map(params![sql_int(after_id)?, limit], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ids.into_iter().map(|id| id as u64).collect())
    }

    fn count_by_status(&self) -> StorageResult<Vec<(Option<String>, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT status, COUNT(*) FROM fictions GROUP BY status ORDER BY COUNT(*) DESC, status",
        )?;

        let counts = stmt
            .query_map([], |row| {
                Ok((row.get::<_, Option<String>>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(counts
            .into_iter()
            .map(|(status, count)| (status, count as u64))
            .collect())
    }
}

/// Raw column values of one `fictions` row
struct FictionRow {
    fiction_id: i64,
    title: Option<String>,
    author: Option<String>,
    summary: Option<String>,
    tags: String,
    pages: Option<i64>,
    views: Option<i64>,
    avg_views: Option<i64>,
    followers: Option<i64>,
    favorites: Option<i64>,
    rating_count: Option<i64>,
    avg_rating: Option<f64>,
    status: Option<String>,
    last_updated: Option<String>,
    fiction_type: Option<String>,
    warning_tags: String,
    content_warnings: String,
    ingested_at: String,
}

impl FictionRow {
    fn into_record(self) -> StorageResult<FictionRecord> {
        let ingested_at = DateTime::parse_from_rfc3339(&self.ingested_at)
            .map_err(|e| {
                StorageError::Serialization(format!(
                    "Invalid ingested_at '{}': {}",
                    self.ingested_at, e
                ))
            })?
            .with_timezone(&Utc);

        Ok(FictionRecord {
            fiction_id: self.fiction_id as u64,
            title: self.title,
            author: self.author,
            summary: self.summary,
            tags: from_json(&self.tags)?,
            pages: self.pages.map(|v| v as u64),
            views: self.views.map(|v| v as u64),
            avg_views: self.avg_views.map(|v| v as u64),
            followers: self.followers.map(|v| v as u64),
            favorites: self.favorites.map(|v| v as u64),
            rating_count: self.rating_count.map(|v| v as u64),
            avg_rating: self.avg_rating,
            status: self.status,
            last_updated: self.last_updated,
            fiction_type: self.fiction_type,
            warning_tags: from_json(&self.warning_tags)?,
            content_warnings: from_json(&self.content_warnings)?,
            ingested_at,
        })
    }
}

fn sql_int(value: u64) -> StorageResult<i64> {
    i64::try_from(value)
        .map_err(|_| StorageError::ValueOutOfRange(format!("{} does not fit in INTEGER", value)))
}

fn sql_opt_int(value: Option<u64>) -> StorageResult<Option<i64>> {
    value.map(sql_int).transpose()
}

fn to_json(items: &[String]) -> StorageResult<String> {
    serde_json::to_string(items).map_err(|e| StorageError::Serialization(e.to_string()))
}

fn from_json(text: &str) -> StorageResult<Vec<String>> {
    serde_json::from_str(text).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Opens the database at `path`, creating its directory if needed
pub fn open_repository(path: &Path) -> StorageResult<SqliteRepository> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    SqliteRepository::new(path)
}
