//! Fiction records and their normalization
//!
//! - `FictionRecord`: the strongly-typed, storage-ready entity
//! - `DetailFields`: the loosely-typed map the page parser produces
//! - `Normalizer`: converts the latter into the former

mod fields;
mod identifier;
mod normalize;

pub use fields::{keys, DetailFields, FieldValue};
pub use identifier::{detail_url, fiction_id_from_url, MAX_FICTION_ID};
pub use normalize::{
    canonical_fiction_type, canonical_status, clean_text, to_float, to_int, Normalizer,
    UNKNOWN_STATUS,
};

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors raised by normalization
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("Fiction identifier is missing")]
    MissingIdentifier,
}

/// One fiction as persisted in the store
///
/// `fiction_id` is the primary key; re-ingesting the same identifier replaces
/// every other field.
#[derive(Debug, Clone, PartialEq)]
pub struct FictionRecord {
    pub fiction_id: u64,
    pub title: Option<String>,
    pub author: Option<String>,
    pub summary: Option<String>,

    /// Ordered, de-duplicated genre tags
    pub tags: Vec<String>,

    /// Warning tags (Gore, Profanity, ...); empty means "checked, none found"
    pub warning_tags: Vec<String>,

    /// Content warnings (AI-generated content, ...); empty means "checked, none found"
    pub content_warnings: Vec<String>,

    /// Original, Fanfiction, ...
    pub fiction_type: Option<String>,

    /// Ongoing, Completed, Hiatus, Stub, Dropped, Inactive or Unknown
    pub status: Option<String>,

    pub pages: Option<u64>,
    pub views: Option<u64>,
    pub avg_views: Option<u64>,
    pub followers: Option<u64>,
    pub favorites: Option<u64>,
    pub rating_count: Option<u64>,

    /// Average rating on the 0–5 scale
    pub avg_rating: Option<f64>,

    /// Site-provided last update marker, stored verbatim
    pub last_updated: Option<String>,

    /// When this record was normalized (UTC)
    pub ingested_at: DateTime<Utc>,
}

impl FictionRecord {
    /// Creates a record with only the identifier set
    pub fn new(fiction_id: u64) -> Self {
        Self {
            fiction_id,
            title: None,
            author: None,
            summary: None,
            tags: Vec::new(),
            warning_tags: Vec::new(),
            content_warnings: Vec::new(),
            fiction_type: None,
            status: None,
            pages: None,
            views: None,
            avg_views: None,
            followers: None,
            favorites: None,
            rating_count: None,
            avg_rating: None,
            last_updated: None,
            ingested_at: Utc::now(),
        }
    }

    /// Short label for log lines
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("Unknown")
    }
}
