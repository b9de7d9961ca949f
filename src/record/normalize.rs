//! Conversion of raw detail fields into storage-ready records
//!
//! Normalization never fails on malformed field values: anything that cannot
//! be interpreted becomes `None` (or an empty list for the warning lists).
//! The only hard failure is a missing identifier.

use crate::record::fields::{keys, DetailFields};
use crate::record::{FictionRecord, NormalizeError};
use chrono::{DateTime, Utc};

/// Known publication statuses, in their canonical spelling
const STATUSES: [&str; 6] = [
    "Ongoing",
    "Completed",
    "Hiatus",
    "Stub",
    "Dropped",
    "Inactive",
];

/// Status assigned to labels that are present but not recognized
pub const UNKNOWN_STATUS: &str = "Unknown";

/// Stateful normalizer for one run
///
/// The only state is the last ingestion stamp, which keeps stamps
/// non-decreasing even if the wall clock steps backwards mid-run.
#[derive(Debug, Default)]
pub struct Normalizer {
    last_stamp: Option<DateTime<Utc>>,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalizes one detail page into a [`FictionRecord`]
    ///
    /// # Arguments
    ///
    /// * `fiction_id` - Identifier taken from the detail URL, not the page content
    /// * `fields` - Raw fields extracted by the page parser
    ///
    /// # Returns
    ///
    /// * `Ok(FictionRecord)` - Best-effort record
    /// * `Err(NormalizeError::MissingIdentifier)` - No identifier was supplied
    pub fn normalize(
        &mut self,
        fiction_id: Option<u64>,
        fields: &DetailFields,
    ) -> Result<FictionRecord, NormalizeError> {
        let fiction_id = fiction_id.ok_or(NormalizeError::MissingIdentifier)?;

        Ok(FictionRecord {
            fiction_id,
            title: clean_text(fields.text(keys::TITLE)),
            author: clean_text(fields.text(keys::AUTHOR)),
            summary: clean_text(fields.text(keys::SUMMARY)),
            tags: ordered_set(fields.list(keys::TAGS)),
            warning_tags: ordered_set(fields.list(keys::WARNING_TAGS)),
            content_warnings: ordered_set(fields.list(keys::CONTENT_WARNINGS)),
            fiction_type: canonical_fiction_type(fields.text(keys::FICTION_TYPE)),
            status: canonical_status(fields.text(keys::STATUS)),
            pages: to_int(fields.text(keys::PAGES)),
            views: to_int(fields.text(keys::VIEWS)),
            avg_views: to_int(fields.text(keys::AVG_VIEWS)),
            followers: to_int(fields.text(keys::FOLLOWERS)),
            favorites: to_int(fields.text(keys::FAVORITES)),
            rating_count: to_int(fields.text(keys::RATING_COUNT)),
            avg_rating: to_rating(fields.text(keys::AVG_RATING)),
            last_updated: clean_text(fields.text(keys::LAST_UPDATED)),
            ingested_at: self.stamp(),
        })
    }

    fn stamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let stamp = match self.last_stamp {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last_stamp = Some(stamp);
        stamp
    }
}

/// Trims text; absent or blank input becomes `None`
pub fn clean_text(val: Option<&str>) -> Option<String> {
    let trimmed = val?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parses a locale-formatted non-negative integer such as `"24,822,333"`
///
/// Thousands separators (commas and any whitespace) are stripped first.
/// Values beyond `i64::MAX` cannot be stored and count as absent.
///
/// # Example
///
/// ```
/// use fiction_harvest::record::to_int;
///
/// assert_eq!(to_int(Some("24,822,333")), Some(24822333));
/// assert_eq!(to_int(Some("")), None);
/// assert_eq!(to_int(None), None);
/// ```
pub fn to_int(val: Option<&str>) -> Option<u64> {
    let digits: String = val?
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    if digits.is_empty() {
        return None;
    }
    digits
        .parse::<u64>()
        .ok()
        .filter(|n| i64::try_from(*n).is_ok())
}

/// Parses decimal text such as `"4.83213"`; non-finite values are rejected
///
/// # Example
///
/// ```
/// use fiction_harvest::record::to_float;
///
/// assert_eq!(to_float(Some("4.5")), Some(4.5));
/// assert_eq!(to_float(Some("n/a")), None);
/// ```
pub fn to_float(val: Option<&str>) -> Option<f64> {
    let trimmed = val?.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Average rating, which must fall within the site's 0–5 scale
fn to_rating(val: Option<&str>) -> Option<f64> {
    to_float(val).filter(|r| (0.0..=5.0).contains(r))
}

/// Maps a status label to its canonical spelling
///
/// Labels are matched case-insensitively (`"ONGOING"` → `"Ongoing"`). Present
/// but unrecognized labels become [`UNKNOWN_STATUS`].
pub fn canonical_status(val: Option<&str>) -> Option<String> {
    let label = clean_text(val)?;
    let canonical = STATUSES
        .iter()
        .find(|s| s.eq_ignore_ascii_case(&label))
        .copied()
        .unwrap_or(UNKNOWN_STATUS);
    Some(canonical.to_string())
}

/// Maps a fiction type label to `Original`/`Fanfiction`; other labels are kept
pub fn canonical_fiction_type(val: Option<&str>) -> Option<String> {
    let label = clean_text(val)?;
    let squashed: String = label
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_lowercase();

    let canonical = match squashed.as_str() {
        "original" => "Original".to_string(),
        "fanfiction" | "fanfic" => "Fanfiction".to_string(),
        _ => label,
    };
    Some(canonical)
}

/// Trims items, drops blanks and duplicates, keeps first-seen order
fn ordered_set(items: Option<Vec<String>>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items.unwrap_or_default() {
        let item = item.trim();
        if !item.is_empty() && !out.iter().any(|existing| existing == item) {
            out.push(item.to_string());
        }
    }
    out
}
