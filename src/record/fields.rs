//! Loosely-typed attribute map produced by the page parser
//!
//! Every value is raw text as it appeared in the markup (or a list of such
//! texts). Any key may be absent; the normalizer decides what that means.

use std::collections::HashMap;

/// Recognized field names
pub mod keys {
    pub const TITLE: &str = "title";
    pub const AUTHOR: &str = "author";
    pub const SUMMARY: &str = "summary";
    pub const TAGS: &str = "tags";
    pub const VIEWS: &str = "views";
    pub const AVG_VIEWS: &str = "avg_views";
    pub const FOLLOWERS: &str = "followers";
    pub const FAVORITES: &str = "favorites";
    pub const RATING_COUNT: &str = "rating_count";
    pub const PAGES: &str = "pages";
    pub const AVG_RATING: &str = "avg_rating";
    pub const STATUS: &str = "status";
    pub const LAST_UPDATED: &str = "last_updated";
    pub const FICTION_TYPE: &str = "fiction_type";
    pub const WARNING_TAGS: &str = "warning_tags";
    pub const CONTENT_WARNINGS: &str = "content_warnings";
}

/// A single raw value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
}

/// Field name to raw value mapping for one detail page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailFields {
    values: HashMap<String, FieldValue>,
}

impl DetailFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_text(&mut self, key: &str, value: impl Into<String>) {
        self.values
            .insert(key.to_string(), FieldValue::Text(value.into()));
    }

    pub fn insert_list(&mut self, key: &str, values: Vec<String>) {
        self.values.insert(key.to_string(), FieldValue::List(values));
    }

    /// Builder-style variant of [`insert_text`](Self::insert_text)
    pub fn with_text(mut self, key: &str, value: impl Into<String>) -> Self {
        self.insert_text(key, value);
        self
    }

    /// Builder-style variant of [`insert_list`](Self::insert_list)
    pub fn with_list(mut self, key: &str, values: Vec<String>) -> Self {
        self.insert_list(key, values);
        self
    }

    /// Returns the text stored under `key`, `None` if absent or a list
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(FieldValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Returns the list stored under `key`
    ///
    /// A text value is treated as a one-element list. `None` means the key
    /// was never set, which is different from an empty list.
    pub fn list(&self, key: &str) -> Option<Vec<String>> {
        match self.values.get(key)? {
            FieldValue::List(items) => Some(items.clone()),
            FieldValue::Text(s) => Some(vec![s.clone()]),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
