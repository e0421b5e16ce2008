use chrono::{SecondsFormat, Utc};
use feed_rs::model::{Entry, Feed, FeedType, Link};
use feed_rs::parser;
use url::Url;

use super::model::{Content, FeedDocument, FeedEntry, TitleHints};
use super::router::FormatError;
use crate::util::resolve_link;

/// Parses RSS 0.9x/1.0/2.0 or Atom bytes into a [`FeedDocument`].
///
/// `source_url` resolves relative entry links and stands in for the feed
/// link when the feed doesn't declare one.
pub fn parse_syndication(bytes: &[u8], source_url: &Url) -> Result<FeedDocument, FormatError> {
    let feed = parser::parse(bytes)?;
    Ok(into_document(feed, source_url))
}

fn version_tag(feed_type: &FeedType) -> &'static str {
    match feed_type {
        FeedType::RSS2 => "rss20",
        FeedType::RSS1 => "rss10",
        FeedType::RSS0 => "rss090",
        FeedType::Atom => "atom10",
        FeedType::JSON => "json1",
    }
}

fn into_document(feed: Feed, source_url: &Url) -> FeedDocument {
    let link = site_link(&feed.links, source_url).unwrap_or_else(|| source_url.to_string());
    let mut doc = FeedDocument::new(link, version_tag(&feed.feed_type));

    if let Some(title) = feed
        .title
        .map(|t| t.content.trim().to_string())
        .filter(|t| !t.is_empty())
    {
        doc.title = title;
    }
    doc.description = feed.description.map(|d| d.content).unwrap_or_default();
    doc.language = feed.language.unwrap_or_default();
    if let Some(updated) = feed.updated {
        doc.updated = updated;
    }

    doc.entries = feed
        .entries
        .into_iter()
        .map(|entry| into_entry(entry, source_url))
        .collect();
    doc
}

/// Picks the site link: an `alternate` (or untyped) link, never `self`.
fn site_link(links: &[Link], base: &Url) -> Option<String> {
    links
        .iter()
        .filter(|l| l.rel.as_deref() != Some("self"))
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .and_then(|l| resolve_link(base, &l.href))
        .map(String::from)
}

fn into_entry(entry: Entry, base: &Url) -> FeedEntry {
    let link = site_link(&entry.links, base)
        .or_else(|| {
            entry
                .links
                .first()
                .and_then(|l| resolve_link(base, &l.href))
                .map(String::from)
        })
        .unwrap_or_else(|| base.to_string());

    let rfc3339 = |dt: chrono::DateTime<Utc>| dt.to_rfc3339_opts(SecondsFormat::Secs, true);

    let media = entry.media.first();
    let hints = TitleHints {
        media_title: media.and_then(|m| m.title.as_ref()).map(|t| t.content.clone()),
        description: media
            .and_then(|m| m.description.as_ref())
            .map(|d| d.content.clone()),
        summary_detail: entry.summary.as_ref().map(|s| s.content.clone()),
        ..TitleHints::default()
    };

    let mut out = FeedEntry {
        title: entry.title.map(|t| t.content).unwrap_or_default(),
        link,
        published: entry.published.map(rfc3339).unwrap_or_default(),
        updated: entry.updated.map(rfc3339).unwrap_or_default(),
        summary: entry.summary.map(|s| s.content).unwrap_or_default(),
        author: entry
            .authors
            .iter()
            .map(|p| p.name.trim())
            .filter(|n| !n.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        hints,
        ..FeedEntry::default()
    };

    if let Some(body) = entry.content.and_then(|c| c.body) {
        out.content.push(Content { value: body });
    }
    for category in entry.categories {
        out.add_tag(category.label.unwrap_or(category.term));
    }
    out
}
