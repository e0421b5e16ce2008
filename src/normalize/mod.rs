//! Entry normalization: one response shape for every source.
//!
//! Entries are ordered newest first (stable for equal or missing dates),
//! capped, and flattened into [`NormalizedItem`]s with a resolved title,
//! minified HTML content and a plain-text summary.

mod dates;

use std::cmp::Reverse;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::config::NormalizeConfig;
use crate::feed::{FeedDocument, FeedEntry, UNTITLED_FEED};
use crate::title::resolve_title_with_content;
use crate::util::{demojize, minify_html, strip_control_chars};

pub use dates::{parse_date, parse_sortable, MAX_SORT_YEAR, MIN_SORT_YEAR};

/// Feed-level metadata as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedMeta {
    pub title: String,
    pub link: String,
    pub description: String,
    pub language: String,
    /// RFC 3339
    pub updated: String,
    pub version: String,
}

/// One entry as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedItem {
    pub title: String,
    pub link: String,
    pub published: String,
    pub summary: String,
    pub author: String,
    pub categories: Vec<String>,
    pub content: String,
}

/// Sort key for an entry: its published date, else its updated date, else
/// the Unix epoch. Dates outside the sortable year range count as missing.
pub fn sort_key(entry: &FeedEntry) -> DateTime<Utc> {
    parse_sortable(&entry.published)
        .or_else(|| parse_sortable(&entry.updated))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Orders entries newest first. Ties keep their discovery order.
pub fn sort_entries(entries: &mut [FeedEntry]) {
    entries.sort_by_cached_key(|entry| Reverse(sort_key(entry)));
}

#[derive(Debug, Clone)]
pub struct Normalizer {
    max_items: usize,
}

impl Normalizer {
    pub fn new(config: &NormalizeConfig) -> Self {
        Self {
            max_items: config.max_items,
        }
    }

    /// Builds response metadata and the sorted, capped item list.
    ///
    /// `requested_url` stands in for the feed link when the source has none.
    pub fn normalize(
        &self,
        feed: FeedDocument,
        requested_url: &str,
    ) -> (FeedMeta, Vec<NormalizedItem>) {
        let FeedDocument {
            title,
            link,
            description,
            language,
            updated,
            version,
            mut entries,
        } = feed;

        let meta = FeedMeta {
            title: non_empty_or(strip_control_chars(&title).trim(), UNTITLED_FEED),
            link: non_empty_or(&link, requested_url),
            description,
            language,
            updated: updated.to_rfc3339_opts(SecondsFormat::Secs, true),
            version,
        };

        let total = entries.len();
        sort_entries(&mut entries);
        entries.truncate(self.max_items);
        tracing::debug!(total, kept = entries.len(), "Normalized entries");

        let items = entries.iter().map(normalize_entry).collect();
        (meta, items)
    }
}

fn normalize_entry(entry: &FeedEntry) -> NormalizedItem {
    let raw_content = entry
        .content_value()
        .filter(|c| !c.trim().is_empty())
        .unwrap_or(&entry.summary);
    let content = minify_html(raw_content);

    let title = resolve_title_with_content(entry, &content);

    NormalizedItem {
        title: strip_control_chars(&title).into_owned(),
        link: entry.link.clone(),
        published: entry.published.clone(),
        summary: demojize(&strip_control_chars(&entry.summary)).into_owned(),
        author: entry.author.clone(),
        categories: entry.tags.iter().map(|t| t.term.clone()).collect(),
        content,
    }
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}
