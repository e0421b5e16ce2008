use chrono::{DateTime, Utc};
use serde::Serialize;

/// Title used when a page or feed carries no usable title of its own.
pub const UNTITLED_FEED: &str = "Untitled Feed";

/// Title placeholder for entries whose title could not be resolved.
pub const UNTITLED_ENTRY: &str = "Untitled Entry";

/// A feed produced by one parse call, regardless of which branch built it.
///
/// Created fresh per request and dropped once the response is serialized.
#[derive(Debug, Clone, Serialize)]
pub struct FeedDocument {
    /// Never empty; defaults to [`UNTITLED_FEED`]
    pub title: String,
    /// The requested URL, or a canonical link reported by the source
    pub link: String,
    pub description: String,
    /// Language code from the source, empty when unknown
    pub language: String,
    pub updated: DateTime<Utc>,
    /// Which strategy produced the document (`html`, `json`, `rss20`, ...)
    pub version: String,
    /// Entries in discovery order; sorting happens in the normalizer
    pub entries: Vec<FeedEntry>,
}

impl FeedDocument {
    /// Creates an empty document for `link` stamped with the current time.
    pub fn new(link: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            title: UNTITLED_FEED.to_string(),
            link: link.into(),
            description: String::new(),
            language: String::new(),
            updated: Utc::now(),
            version: version.into(),
            entries: Vec::new(),
        }
    }
}

/// One article or post.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FeedEntry {
    /// May be empty or generic when produced; the title resolver fills it in
    pub title: String,
    /// Absolute URL
    pub link: String,
    /// Raw date text or an ISO-8601 string; empty when the source has none
    pub published: String,
    /// Last-modified date when the source reports one separately
    #[serde(skip_serializing_if = "String::is_empty")]
    pub updated: String,
    /// Zero or one body, raw HTML or plain text
    pub content: Vec<Content>,
    pub summary: String,
    pub author: String,
    pub tags: Vec<Tag>,
    /// Secondary title signals some sources carry
    #[serde(skip)]
    pub hints: TitleHints,
}

impl FeedEntry {
    /// Returns the body of the first content element, if any.
    pub fn content_value(&self) -> Option<&str> {
        self.content.first().map(|c| c.value.as_str())
    }

    /// Adds a tag unless an equal term is already present.
    pub fn add_tag(&mut self, term: impl Into<String>) {
        let term = term.into();
        if term.trim().is_empty() || self.tags.iter().any(|t| t.term == term) {
            return;
        }
        self.tags.push(Tag { term });
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Content {
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub term: String,
}

/// Optional title-bearing fields, read by the title resolver in declared order.
///
/// Syndication, JSON Feed and AI sources expose differently named fields for
/// the same concept; each branch maps what it has into this struct instead of
/// the resolver probing loosely-typed maps.
#[derive(Debug, Clone, Default)]
pub struct TitleHints {
    pub media_title: Option<String>,
    pub summary_title: Option<String>,
    pub itunes_title: Option<String>,
    pub description: Option<String>,
    pub title_detail: Option<String>,
    pub summary_detail: Option<String>,
    pub content_html: Option<String>,
    pub summary_html: Option<String>,
    pub standfirst: Option<String>,
    pub description_html: Option<String>,
}
