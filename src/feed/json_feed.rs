use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use url::Url;

use super::model::{Content, FeedDocument, FeedEntry, TitleHints};
use super::router::FormatError;
use crate::util::resolve_link;

pub const JSON_VERSION: &str = "json";

/// Parses a JSON Feed (1.0 or 1.1) document.
///
/// Any JSON object is accepted. Members are read best-effort: a missing or
/// mistyped member is treated as absent and never rejects the document.
/// A top-level array or scalar is rejected.
pub fn parse_json_feed(bytes: &[u8], source_url: &Url) -> Result<FeedDocument, FormatError> {
    let value: Value = serde_json::from_slice(bytes)?;
    let Value::Object(feed) = value else {
        return Err(FormatError::NotAJsonFeed);
    };

    let link = str_field(&feed, "home_page_url")
        .or_else(|| str_field(&feed, "feed_url"))
        .and_then(|href| resolve_link(source_url, href))
        .map(String::from)
        .unwrap_or_else(|| source_url.to_string());

    let mut doc = FeedDocument::new(link, JSON_VERSION);
    if let Some(title) = str_field(&feed, "title").map(str::trim).filter(|t| !t.is_empty()) {
        doc.title = title.to_string();
    }
    doc.description = str_field(&feed, "description").unwrap_or_default().to_string();
    doc.language = str_field(&feed, "language").unwrap_or_default().to_string();
    doc.entries = feed
        .get("items")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_object)
                .map(|item| into_entry(item, source_url))
                .collect()
        })
        .unwrap_or_default();

    // JSON Feed has no feed-level timestamp; use the newest item's
    if let Some(newest) = doc
        .entries
        .iter()
        .filter_map(|e| DateTime::parse_from_rfc3339(latest_stamp(e)).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .max()
    {
        doc.updated = newest;
    }

    Ok(doc)
}

fn str_field<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    object.get(key).and_then(Value::as_str)
}

/// Author names come either as `{"name": ..}` objects or, in some 1.0
/// producers, as bare strings.
fn author_name(value: &Value) -> Option<&str> {
    let name = match value {
        Value::String(name) => Some(name.as_str()),
        Value::Object(author) => str_field(author, "name"),
        _ => None,
    };
    name.map(str::trim).filter(|name| !name.is_empty())
}

fn into_entry(item: &Map<String, Value>, base: &Url) -> FeedEntry {
    let link = str_field(item, "url")
        .or_else(|| str_field(item, "external_url"))
        .and_then(|href| resolve_link(base, href))
        .map(String::from)
        .unwrap_or_else(|| base.to_string());

    let author = match item.get("author").and_then(author_name) {
        Some(name) => name.to_string(),
        None => item
            .get("authors")
            .and_then(Value::as_array)
            .map(|authors| authors.iter().filter_map(author_name).collect::<Vec<_>>().join(", "))
            .unwrap_or_default(),
    };

    let content_html = str_field(item, "content_html").map(String::from);
    let body = content_html
        .as_deref()
        .or_else(|| str_field(item, "content_text"))
        .filter(|b| !b.trim().is_empty())
        .map(String::from);

    let text = |key: &str| str_field(item, key).unwrap_or_default().to_string();
    let mut entry = FeedEntry {
        title: text("title"),
        link,
        published: text("date_published"),
        updated: text("date_modified"),
        summary: text("summary"),
        author,
        hints: TitleHints {
            content_html,
            ..TitleHints::default()
        },
        ..FeedEntry::default()
    };
    if let Some(value) = body {
        entry.content.push(Content { value });
    }
    let tags = item.get("tags").and_then(Value::as_array);
    for tag in tags.into_iter().flatten().filter_map(Value::as_str) {
        entry.add_tag(tag);
    }
    entry
}

fn latest_stamp(entry: &FeedEntry) -> &str {
    if entry.updated.is_empty() {
        &entry.published
    } else {
        &entry.updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::UNTITLED_FEED;
    use pretty_assertions::assert_eq;

    fn source() -> Url {
        Url::parse("https://example.com/feed.json").unwrap()
    }

    const FEED: &str = r#"{
        "version": "https://jsonfeed.org/version/1.1",
        "title": "JSON Blog",
        "home_page_url": "https://example.com/",
        "description": "A JSON feed",
        "language": "en",
        "items": [
            {
                "id": "1",
                "url": "/posts/one",
                "title": "First",
                "content_html": "<p>Hello</p>",
                "summary": "Short summary",
                "date_published": "2024-03-01T09:00:00Z",
                "authors": [{"name": "Ada"}, {"name": "Grace"}],
                "tags": ["rust", "rust", "feeds"]
            },
            {
                "id": "2",
                "external_url": "https://other.example/two",
                "content_text": "Plain body",
                "date_modified": "2024-03-05T09:00:00Z",
                "author": {"name": "Linus"}
            }
        ]
    }"#;

    #[test]
    fn test_parse_json_feed() {
        let doc = parse_json_feed(FEED.as_bytes(), &source()).unwrap();
        assert_eq!(doc.version, "json");
        assert_eq!(doc.title, "JSON Blog");
        assert_eq!(doc.link, "https://example.com/");
        assert_eq!(doc.description, "A JSON feed");
        assert_eq!(doc.language, "en");
        assert_eq!(doc.updated.to_rfc3339(), "2024-03-05T09:00:00+00:00");

        let first = &doc.entries[0];
        assert_eq!(first.link, "https://example.com/posts/one");
        assert_eq!(first.content_value(), Some("<p>Hello</p>"));
        assert_eq!(first.hints.content_html.as_deref(), Some("<p>Hello</p>"));
        assert_eq!(first.author, "Ada, Grace");
        let tags: Vec<_> = first.tags.iter().map(|t| t.term.as_str()).collect();
        assert_eq!(tags, ["rust", "feeds"]);

        let second = &doc.entries[1];
        assert_eq!(second.title, "");
        assert_eq!(second.link, "https://other.example/two");
        assert_eq!(second.content_value(), Some("Plain body"));
        assert_eq!(second.author, "Linus");
        assert_eq!(second.updated, "2024-03-05T09:00:00Z");
    }

    #[test]
    fn test_minimal_object() {
        let doc = parse_json_feed(b"{}", &source()).unwrap();
        assert_eq!(doc.title, UNTITLED_FEED);
        assert_eq!(doc.link, "https://example.com/feed.json");
        assert!(doc.entries.is_empty());
    }

    #[test]
    fn test_top_level_array_rejected() {
        let err = parse_json_feed(b"[1, 2]", &source()).unwrap_err();
        assert!(matches!(err, FormatError::NotAJsonFeed));
    }

    #[test]
    fn test_invalid_json_rejected() {
        let err = parse_json_feed(b"{not json", &source()).unwrap_err();
        assert!(matches!(err, FormatError::Json(_)));
    }

    #[test]
    fn test_mistyped_items_member_yields_no_entries() {
        let doc = parse_json_feed(br#"{"title": "Blog", "items": "nope"}"#, &source()).unwrap();
        assert_eq!(doc.title, "Blog");
        assert!(doc.entries.is_empty());
    }

    #[test]
    fn test_null_items_yields_no_entries() {
        let doc = parse_json_feed(br#"{"items": null}"#, &source()).unwrap();
        assert!(doc.entries.is_empty());
    }

    #[test]
    fn test_bad_member_drops_only_that_field() {
        let raw = br#"{
            "title": "Blog",
            "home_page_url": "https://e.com/",
            "items": [
                {"url": "https://e.com/a", "title": "Good item", "author": "Bob"},
                {"title": "Other", "tags": null, "authors": ["Ann", {"name": "Lee"}, 7]},
                {"title": 42, "url": "https://e.com/c", "tags": ["ok", 3, null]},
                "not an item"
            ]
        }"#;
        let doc = parse_json_feed(raw, &source()).unwrap();
        assert_eq!(doc.title, "Blog");
        assert_eq!(doc.entries.len(), 3);

        assert_eq!(doc.entries[0].title, "Good item");
        assert_eq!(doc.entries[0].author, "Bob");

        assert_eq!(doc.entries[1].title, "Other");
        assert!(doc.entries[1].tags.is_empty());
        assert_eq!(doc.entries[1].author, "Ann, Lee");

        assert_eq!(doc.entries[2].title, "");
        assert_eq!(doc.entries[2].link, "https://e.com/c");
        let tags: Vec<_> = doc.entries[2].tags.iter().map(|t| t.term.as_str()).collect();
        assert_eq!(tags, ["ok"]);
    }
}
