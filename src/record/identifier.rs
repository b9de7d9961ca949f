//! Fiction identifier extraction from detail page URLs
//!
//! Detail URLs look like `https://host/fiction/21220/mother-of-learning`; the
//! identifier is the path segment directly after the detail path prefix.

use url::Url;

/// Largest identifier the repository can store
pub const MAX_FICTION_ID: u64 = i64::MAX as u64;

/// Extracts the numeric fiction identifier from a detail URL
///
/// # Arguments
///
/// * `url` - Absolute detail page URL
/// * `detail_path` - Path prefix of detail pages, e.g. `/fiction/`
///
/// # Returns
///
/// The identifier, or `None` if the URL is not a detail page or the segment
/// is not a positive integer that fits a SQLite `INTEGER`.
///
/// # Example
///
/// ```
/// use fiction_harvest::record::fiction_id_from_url;
/// use url::Url;
///
/// let url = Url::parse("https://www.royalroad.com/fiction/21220/mother-of-learning").unwrap();
/// assert_eq!(fiction_id_from_url(&url, "/fiction/"), Some(21220));
/// ```
pub fn fiction_id_from_url(url: &Url, detail_path: &str) -> Option<u64> {
    let prefix = detail_path.trim_end_matches('/');
    let rest = url.path().strip_prefix(prefix)?;
    let rest = rest.strip_prefix('/')?;

    let segment = rest.split('/').next()?;
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    segment
        .parse::<u64>()
        .ok()
        .filter(|id| *id > 0 && *id <= MAX_FICTION_ID)
}

/// Builds the canonical detail URL for a stored identifier
pub fn detail_url(base_url: &Url, detail_path: &str, fiction_id: u64) -> Option<Url> {
    let path = format!("{}/{}", detail_path.trim_end_matches('/'), fiction_id);
    base_url.join(&path).ok()
}
