//! Content classification for fetched bodies.

use thiserror::Error;

/// A body that was routed to a feed parser but could not be read as one.
///
/// Never surfaced to clients: the pipeline recovers by running the HTML
/// engine on the same body.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("XML feed parsing error: {0}")]
    Syndication(#[from] feed_rs::parser::ParseFeedError),
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("JSON document is not a feed object")]
    NotAJsonFeed,
}

/// Which parser a fetched body should go to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Html,
    /// RSS, Atom or another XML dialect
    Xml,
    Json,
    /// Anything else; treated as HTML by the pipeline
    Unknown,
}

/// Reduces a `Content-Type` header to its lowercase MIME type, dropping
/// parameters such as `charset`.
pub fn mime_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

/// Classifies a body from its `Content-Type` header, sniffing the body only
/// when the header is missing.
pub fn classify(content_type: &str, body: &[u8]) -> ContentKind {
    let mime = mime_type(content_type);

    if mime.is_empty() {
        return sniff(body);
    }

    if mime.contains("html") {
        ContentKind::Html
    } else if mime.contains("xml") {
        ContentKind::Xml
    } else if mime.contains("json") {
        ContentKind::Json
    } else {
        ContentKind::Unknown
    }
}

fn sniff(body: &[u8]) -> ContentKind {
    let trimmed = body.trim_ascii_start();
    if trimmed.starts_with(b"{") {
        return ContentKind::Json;
    }
    if body
        .windows(4)
        .any(|w| w.eq_ignore_ascii_case(b"<rss"))
    {
        return ContentKind::Xml;
    }
    ContentKind::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_type_strips_parameters() {
        assert_eq!(mime_type("Text/HTML; charset=UTF-8"), "text/html");
        assert_eq!(mime_type(""), "");
    }

    #[test]
    fn test_classify_by_header() {
        assert_eq!(classify("text/html", b""), ContentKind::Html);
        assert_eq!(classify("application/xhtml+xml", b""), ContentKind::Html);
        assert_eq!(classify("application/rss+xml", b""), ContentKind::Xml);
        assert_eq!(classify("application/atom+xml; charset=utf-8", b""), ContentKind::Xml);
        assert_eq!(classify("text/xml", b""), ContentKind::Xml);
        assert_eq!(classify("application/feed+json", b""), ContentKind::Json);
        assert_eq!(classify("text/plain", b"<rss>"), ContentKind::Unknown);
    }

    #[test]
    fn test_header_wins_over_body() {
        assert_eq!(classify("text/html", b"{\"items\":[]}"), ContentKind::Html);
    }

    #[test]
    fn test_sniff_without_header() {
        assert_eq!(classify("", b"  \n{\"version\":\"x\"}"), ContentKind::Json);
        assert_eq!(classify("", b"<?xml version=\"1.0\"?><RSS version=\"2.0\">"), ContentKind::Xml);
        assert_eq!(classify("", b"<html><body></body></html>"), ContentKind::Unknown);
        assert_eq!(classify(" ; charset=utf-8", b"{}"), ContentKind::Json);
    }
}
