//! Feed retrieval and parsing.
//!
//! This module turns a URL into a [`FeedDocument`] when the source is a real
//! feed:
//!
//! - **Fetching**: header-profile rotation on 403, timeouts, body size limit
//! - **Routing**: `Content-Type` classification with body sniffing
//! - **Parsing**: RSS/Atom through `feed-rs`, JSON Feed through `serde_json`
//! - **Discovery**: feed links advertised by an HTML page
//!
//! HTML pages without a feed go to [`crate::extract`] instead.
//!
//! # Example
//!
//! ```ignore
//! use rssify::feed::{classify, parse_syndication, ContentKind, Fetcher};
//!
//! let page = fetcher.fetch(&url).await?;
//! if classify(&page.content_type, &page.body) == ContentKind::Xml {
//!     let doc = parse_syndication(&page.body, &page.url)?;
//! }
//! ```

mod discovery;
mod fetcher;
mod json_feed;
mod model;
mod router;
mod syndication;

pub use discovery::{discover_feed, find_feed_links, MAX_DISCOVERED_LINKS};
pub use fetcher::{FetchError, FetchedPage, Fetcher, HeaderProfile, DEFAULT_PROFILES};
pub use json_feed::{parse_json_feed, JSON_VERSION};
pub use model::{
    Content, FeedDocument, FeedEntry, Tag, TitleHints, UNTITLED_ENTRY, UNTITLED_FEED,
};
pub use router::{classify, mime_type, ContentKind, FormatError};
pub use syndication::parse_syndication;
