//! HTML parser for listing and fiction pages
//!
//! This module turns raw HTML into:
//! - the ordered list of detail page URLs on a listing page
//! - the raw field map of a detail page
//!
//! The coordinator only depends on the [`PageParser`] trait; markup details
//! live entirely in [`HtmlPageParser`].

use crate::record::{fiction_id_from_url, keys, DetailFields};
use scraper::{ElementRef, Html, Selector};
use std::collections::{HashMap, HashSet};
use url::Url;

/// Status labels recognized on the fiction info block
const STATUS_LABELS: [&str; 6] = [
    "ONGOING",
    "COMPLETED",
    "HIATUS",
    "STUB",
    "DROPPED",
    "INACTIVE",
];

/// Fiction type labels recognized on the fiction info block
const TYPE_LABELS: [&str; 3] = ["ORIGINAL", "FAN FICTION", "FANFICTION"];

/// Extraction contract consumed by the coordinator
pub trait PageParser {
    /// Returns absolute detail page URLs in listing order
    ///
    /// An empty result means the listing has run past the end of the catalog.
    fn extract_listing_links(&self, html: &str) -> Vec<Url>;

    /// Returns the raw fields of a detail page; any key may be absent
    fn extract_detail_fields(&self, html: &str) -> DetailFields;
}

/// Markup-based parser for the fiction site
#[derive(Debug, Clone)]
pub struct HtmlPageParser {
    base_url: Url,
    detail_path: String,
}

impl HtmlPageParser {
    /// # Arguments
    ///
    /// * `base_url` - Base for resolving relative links
    /// * `detail_path` - Path prefix every detail link must start with
    pub fn new(base_url: Url, detail_path: impl Into<String>) -> Self {
        Self {
            base_url,
            detail_path: detail_path.into(),
        }
    }

    fn resolve_detail_link(&self, href: &str) -> Option<Url> {
        let href = href.trim();
        if href.is_empty() {
            return None;
        }

        let mut url = self.base_url.join(href).ok()?;
        url.set_fragment(None);

        if url.host_str() != self.base_url.host_str() {
            return None;
        }

        let prefix = self.detail_path.trim_end_matches('/');
        let rest = url.path().strip_prefix(prefix)?;
        if !rest.starts_with('/') || rest.len() < 2 {
            return None;
        }

        Some(url)
    }
}

impl PageParser for HtmlPageParser {
    fn extract_listing_links(&self, html: &str) -> Vec<Url> {
        let document = Html::parse_document(html);
        let mut links: Vec<Url> = Vec::new();
        let mut seen_ids = HashSet::new();

        if let Ok(selector) = Selector::parse("h2.fiction-title a[href]") {
            for element in document.select(&selector) {
                let Some(url) = element
                    .value()
                    .attr("href")
                    .and_then(|href| self.resolve_detail_link(href))
                else {
                    continue;
                };

                // Slugs vary; one fiction is one identifier
                let is_new = match fiction_id_from_url(&url, &self.detail_path) {
                    Some(id) => seen_ids.insert(id),
                    None => !links.contains(&url),
                };
                if is_new {
                    links.push(url);
                }
            }
        }

        links
    }

    fn extract_detail_fields(&self, html: &str) -> DetailFields {
        let document = Html::parse_document(html);
        let mut fields = DetailFields::new();

        if let Some(title) = first_text(&document, &["h1.font-white", "h1.fiction-title", "h1"]) {
            fields.insert_text(keys::TITLE, title);
        }
        if let Some(author) = first_text(&document, &["h4.font-white a"]) {
            fields.insert_text(keys::AUTHOR, author);
        }
        if let Some(summary) = first_text(&document, &["div.description"]) {
            fields.insert_text(keys::SUMMARY, summary);
        }

        fields.insert_list(keys::TAGS, all_texts(&document, "span.tags a.fiction-tag"));

        let stats = stats_pairs(&document);
        let stat_keys: [(&str, &[&str]); 8] = [
            (keys::VIEWS, &["Total Views", "Views"]),
            (keys::AVG_VIEWS, &["Average Views"]),
            (keys::FOLLOWERS, &["Followers"]),
            (keys::FAVORITES, &["Favorites"]),
            (keys::RATING_COUNT, &["Ratings"]),
            (keys::PAGES, &["Pages"]),
            (keys::STATUS, &["Status"]),
            (keys::LAST_UPDATED, &["Last Updated"]),
        ];
        for (key, labels) in stat_keys {
            if let Some(value) = labels.iter().find_map(|label| stats.get(*label)) {
                fields.insert_text(key, value.clone());
            }
        }

        if let Some(rating) = first_attr(&document, r#"meta[property="books:rating:value"]"#, "content")
        {
            fields.insert_text(keys::AVG_RATING, rating);
        }

        for label in all_texts(&document, ".fiction-info span.label") {
            let upper = label.to_uppercase();
            if STATUS_LABELS.contains(&upper.as_str()) && !fields.contains(keys::STATUS) {
                fields.insert_text(keys::STATUS, label);
            } else if TYPE_LABELS.contains(&upper.as_str()) && !fields.contains(keys::FICTION_TYPE)
            {
                fields.insert_text(keys::FICTION_TYPE, label);
            }
        }

        if !fields.contains(keys::LAST_UPDATED) {
            if let Some(updated) = first_attr(&document, ".fiction-info time[datetime]", "datetime")
            {
                fields.insert_text(keys::LAST_UPDATED, updated);
            }
        }

        // Always present: an empty list records that the page was checked
        fields.insert_list(
            keys::WARNING_TAGS,
            all_texts(&document, ".font-red-sunglo ul.list-inline li"),
        );
        fields.insert_list(
            keys::CONTENT_WARNINGS,
            all_texts(&document, ".content-warnings li"),
        );

        fields
    }
}

/// Collapses runs of whitespace and trims
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_text(document: &Html, selectors: &[&str]) -> Option<String> {
    selectors.iter().find_map(|css| {
        let selector = Selector::parse(css).ok()?;
        document
            .select(&selector)
            .next()
            .map(element_text)
            .filter(|s| !s.is_empty())
    })
}

fn all_texts(document: &Html, css: &str) -> Vec<String> {
    match Selector::parse(css) {
        Ok(selector) => document
            .select(&selector)
            .map(element_text)
            .filter(|s| !s.is_empty())
            .collect(),
        Err(_) => Vec::new(),
    }
}

fn first_attr(document: &Html, css: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    document
        .select(&selector)
        .find_map(|element| element.value().attr(attr))
        .map(|value| value.trim().to_string())
}

/// Reads the stats block, where labels (ending in `:`) and values alternate
fn stats_pairs(document: &Html) -> HashMap<String, String> {
    let items = all_texts_keep_empty(document, ".stats-content .list-unstyled li");
    let mut stats = HashMap::new();

    let mut i = 0;
    while i < items.len() {
        if items[i].contains(':') && i + 1 < items.len() {
            let label = items[i].replace(':', "").trim().to_string();
            stats.insert(label, items[i + 1].clone());
            i += 2;
        } else {
            i += 1;
        }
    }

    stats
}

fn all_texts_keep_empty(document: &Html, css: &str) -> Vec<String> {
    match Selector::parse(css) {
        Ok(selector) => document.select(&selector).map(element_text).collect(),
        Err(_) => Vec::new(),
    }
}
