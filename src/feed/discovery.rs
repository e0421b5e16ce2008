//! Feed discovery on HTML pages.
//!
//! A page may advertise its own feed through `<link type="...">` tags or
//! plain anchors. When discovery is enabled the pipeline tries those before
//! scraping the page itself.

use std::sync::LazyLock;

use scraper::{Html, Selector};
use url::Url;

use super::fetcher::{FetchedPage, Fetcher};
use super::json_feed::parse_json_feed;
use super::model::FeedDocument;
use super::router::{classify, ContentKind, FormatError};
use super::syndication::parse_syndication;
use crate::util::{resolve_link, validate_url};

/// At most this many discovered links are fetched per page.
pub const MAX_DISCOVERED_LINKS: usize = 3;

const FEED_LINK_TYPES: [&str; 4] = [
    "application/rss+xml",
    "application/atom+xml",
    "application/feed+json",
    "application/json",
];

const FEED_HREF_HINTS: [&str; 3] = ["rss", "feed", "atom"];

#[allow(clippy::expect_used)]
static LINK_TAG: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("link[type][href]").expect("valid selector"));
#[allow(clippy::expect_used)]
static ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));

/// Collects feed URLs a page points to.
///
/// `<link>` tags with a feed MIME type come first, then anchors whose href
/// mentions `rss`, `feed` or `atom`. Duplicates and the page itself are
/// skipped; at most [`MAX_DISCOVERED_LINKS`] are returned.
pub fn find_feed_links(html: &str, base_url: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);

    let from_link_tags = document.select(&LINK_TAG).filter_map(|el| {
        let kind = el.value().attr("type")?.trim().to_ascii_lowercase();
        if !FEED_LINK_TYPES.contains(&kind.as_str()) {
            return None;
        }
        el.value().attr("href")
    });

    let from_anchors = document.select(&ANCHOR).filter_map(|el| {
        let href = el.value().attr("href")?;
        let lower = href.to_ascii_lowercase();
        FEED_HREF_HINTS
            .iter()
            .any(|hint| lower.contains(hint))
            .then_some(href)
    });

    let mut found: Vec<Url> = Vec::new();
    for href in from_link_tags.chain(from_anchors) {
        let Some(url) = resolve_link(base_url, href) else {
            continue;
        };
        if url == *base_url || found.contains(&url) {
            continue;
        }
        found.push(url);
        if found.len() == MAX_DISCOVERED_LINKS {
            break;
        }
    }
    found
}

/// Fetches each candidate in order and returns the first one that parses as
/// a feed.
///
/// Candidates failing URL validation, fetching or parsing are logged and
/// skipped; `None` means the caller should scrape the page instead.
pub async fn discover_feed(
    fetcher: &Fetcher,
    candidates: &[Url],
    allow_private: bool,
) -> Option<FeedDocument> {
    for candidate in candidates {
        let url = match validate_url(candidate.as_str(), allow_private) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!(url = %candidate, error = %e, "Skipping discovered link");
                continue;
            }
        };

        let page = match fetcher.fetch(&url).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Discovered feed fetch failed");
                continue;
            }
        };

        match parse_discovered(&page) {
            Ok(doc) => {
                tracing::info!(url = %url, version = %doc.version, "Using discovered feed");
                return Some(doc);
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Discovered link is not a feed");
            }
        }
    }
    None
}

fn parse_discovered(page: &FetchedPage) -> Result<FeedDocument, FormatError> {
    match classify(&page.content_type, &page.body) {
        ContentKind::Json => parse_json_feed(&page.body, &page.url),
        // Feeds are often served as text/html or text/plain
        ContentKind::Xml | ContentKind::Html | ContentKind::Unknown => {
            parse_syndication(&page.body, &page.url)
        }
    }
}
