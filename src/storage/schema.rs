//! Database schema definitions and migrations
//!
//! This module contains the SQL schema for the fiction store and an additive
//! migration that brings databases created by older versions up to date.

use rusqlite::Connection;

/// Current schema version, stored in `PRAGMA user_version`
pub const SCHEMA_VERSION: u32 = 2;

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per fiction, keyed by the site identifier
CREATE TABLE IF NOT EXISTS fictions (
    fiction_id INTEGER PRIMARY KEY,
    title TEXT,
    author TEXT,
    summary TEXT,
    tags TEXT NOT NULL DEFAULT '[]',
    pages INTEGER,
    views INTEGER,
    avg_views INTEGER,
    followers INTEGER,
    favorites INTEGER,
    rating_count INTEGER,
    avg_rating REAL,
    status TEXT,
    last_updated TEXT,
    fiction_type TEXT,
    warning_tags TEXT NOT NULL DEFAULT '[]',
    content_warnings TEXT NOT NULL DEFAULT '[]',
    ingested_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_fictions_status ON fictions(status);
"#;

/// Columns added after the first schema version, with their definitions
///
/// Each entry must be valid in `ALTER TABLE ... ADD COLUMN`, so NOT NULL
/// columns carry a default.
const ADDED_COLUMNS: &[(&str, &str)] = &[
    ("fiction_type", "TEXT"),
    ("warning_tags", "TEXT NOT NULL DEFAULT '[]'"),
    ("content_warnings", "TEXT NOT NULL DEFAULT '[]'"),
];

/// Initializes the database schema and applies pending migrations
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    migrate_schema(conn)?;
    Ok(())
}

/// Adds any columns that an older `fictions` table lacks
///
/// Returns the names of the columns that were added.
pub fn migrate_schema(conn: &Connection) -> Result<Vec<String>, rusqlite::Error> {
    let existing = table_columns(conn, "fictions")?;
    let mut added = Vec::new();

    for (name, definition) in ADDED_COLUMNS {
        if !existing.iter().any(|c| c == name) {
            conn.execute_batch(&format!(
                "ALTER TABLE fictions ADD COLUMN {} {};",
                name, definition
            ))?;
            tracing::info!("Added column {} to fictions table", name);
            added.push(name.to_string());
        }
    }

    conn.execute_batch(&format!("PRAGMA user_version = {};", SCHEMA_VERSION))?;
    Ok(added)
}

/// Gets the schema version recorded in the database
pub fn get_schema_version(conn: &Connection) -> Result<u32, rusqlite::Error> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
}

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}
