//! Entry title resolution.
//!
//! Sources disagree wildly on where a title lives: a proper `<title>`
//! element, an `og:title` meta tag buried in the summary HTML, the first
//! heading of the content, or nowhere at all except the URL slug. The
//! resolver walks those places in a fixed order and returns the first
//! candidate that looks like a title, ending at [`UNTITLED_ENTRY`].
//!
//! A candidate qualifies when, after entity decoding and whitespace
//! collapsing, it is between [`MIN_TITLE_CHARS`] and [`MAX_TITLE_CHARS`]
//! characters long.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use crate::feed::{Content, FeedEntry, UNTITLED_ENTRY};
use crate::util::{collapse_whitespace, unescape_html, ELLIPSIS};

pub const MIN_TITLE_CHARS: usize = 5;
pub const MAX_TITLE_CHARS: usize = 200;

/// Length of the text snippet used when no sentence qualifies.
const SNIPPET_CHARS: usize = 100;

#[allow(clippy::expect_used)]
fn selectors(list: &[&str]) -> Vec<Selector> {
    list.iter()
        .map(|css| Selector::parse(css).expect("built-in selector is valid"))
        .collect()
}

static META_TITLES: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    selectors(&[
        r#"meta[property="og:title"]"#,
        r#"meta[name="og:title"]"#,
        r#"meta[name="twitter:title"]"#,
        r#"meta[property="twitter:title"]"#,
        r#"meta[name="title"]"#,
    ])
});

static DOC_TITLE: LazyLock<Vec<Selector>> = LazyLock::new(|| selectors(&["title"]));

static HEADINGS: LazyLock<Vec<Selector>> =
    LazyLock::new(|| selectors(&["h1", "h2", "h3", "h4", "h5", "h6"]));

static TITLE_CLASSES: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    selectors(&[
        r#"[class*="title"]"#,
        r#"[class*="headline"]"#,
        r#"[class*="entry-title"]"#,
        r#"[class*="post-title"]"#,
        r#"[class*="article-title"]"#,
    ])
});

static CONTAINERS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    selectors(&[r#"article, [class*="post"], [class*="entry"], [class*="story"]"#])
});

static PARAGRAPH: LazyLock<Vec<Selector>> = LazyLock::new(|| selectors(&["p"]));

/// `(selector, attribute)` pairs; only the first element carrying each is read.
static TITLE_ATTRS: LazyLock<Vec<(Selector, &'static str)>> = LazyLock::new(|| {
    selectors(&["[aria-label]", "[data-title]", "[title]"])
        .into_iter()
        .zip(["aria-label", "data-title", "title"])
        .collect()
});

#[allow(clippy::expect_used)]
static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]\s+").expect("valid regex"));

#[allow(clippy::expect_used)]
static LEADING_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\s*").expect("valid regex"));

/// Decodes, collapses and length-checks a title candidate.
pub fn clean_title(raw: &str) -> Option<String> {
    let text = collapse_whitespace(&unescape_html(raw));
    let len = text.chars().count();
    (MIN_TITLE_CHARS..=MAX_TITLE_CHARS)
        .contains(&len)
        .then_some(text)
}

/// Resolves a display title for `entry`. Never returns an empty string.
pub fn resolve_title(entry: &FeedEntry) -> String {
    direct_fields(entry)
        .or_else(|| html_fields(entry))
        .or_else(|| slug_title(&entry.link))
        .unwrap_or_else(|| UNTITLED_ENTRY.to_string())
}

/// [`resolve_title`], plus one retry against the entry's formatted content
/// when the first pass finds nothing.
pub fn resolve_title_with_content(entry: &FeedEntry, formatted_content: &str) -> String {
    let title = resolve_title(entry);
    if title != UNTITLED_ENTRY || formatted_content.trim().is_empty() {
        return title;
    }

    let synthetic = FeedEntry {
        summary: formatted_content.to_string(),
        content: vec![Content {
            value: formatted_content.to_string(),
        }],
        ..FeedEntry::default()
    };
    resolve_title(&synthetic)
}

fn direct_fields(entry: &FeedEntry) -> Option<String> {
    let hints = &entry.hints;
    let title = Some(entry.title.as_str()).filter(|t| *t != UNTITLED_ENTRY);
    [
        title,
        hints.media_title.as_deref(),
        hints.summary_title.as_deref(),
        hints.itunes_title.as_deref(),
        plain(&entry.summary),
        hints.description.as_deref().and_then(plain),
        hints.title_detail.as_deref(),
        hints.summary_detail.as_deref(),
    ]
    .into_iter()
    .flatten()
    .find_map(clean_title)
}

/// Summary-like fields holding markup are left to the HTML pass.
fn plain(value: &str) -> Option<&str> {
    (!value.contains('<')).then_some(value)
}

fn html_fields(entry: &FeedEntry) -> Option<String> {
    let hints = &entry.hints;
    let summary = Some(entry.summary.as_str())
        .filter(|s| !s.trim().is_empty())
        .or(hints.description.as_deref());

    let documents: Vec<Html> = [
        summary,
        hints.content_html.as_deref(),
        hints.summary_html.as_deref(),
        hints.standfirst.as_deref(),
        hints.description_html.as_deref(),
        entry.content_value(),
    ]
    .into_iter()
    .flatten()
    .filter(|html| !html.trim().is_empty())
    .map(Html::parse_document)
    .collect();

    if documents.is_empty() {
        return None;
    }

    let levels: [fn(&Html) -> Option<String>; 8] = [
        |doc| attr_matches(doc, &META_TITLES, "content"),
        |doc| text_matches(doc, &DOC_TITLE),
        |doc| text_matches(doc, &HEADINGS),
        |doc| text_matches(doc, &TITLE_CLASSES),
        container_headings,
        first_attribute,
        first_paragraph,
        leading_text,
    ];

    levels
        .iter()
        .find_map(|level| documents.iter().find_map(level))
}

fn text_of(element: scraper::ElementRef<'_>) -> String {
    element.text().collect()
}

fn attr_matches(doc: &Html, selectors: &[Selector], attr: &str) -> Option<String> {
    selectors.iter().find_map(|sel| {
        doc.select(sel)
            .filter_map(|el| el.value().attr(attr))
            .find_map(clean_title)
    })
}

fn text_matches(doc: &Html, selectors: &[Selector]) -> Option<String> {
    selectors
        .iter()
        .find_map(|sel| doc.select(sel).find_map(|el| clean_title(&text_of(el))))
}

fn container_headings(doc: &Html) -> Option<String> {
    CONTAINERS.iter().find_map(|container_sel| {
        doc.select(container_sel).find_map(|container| {
            HEADINGS.iter().find_map(|heading| {
                container
                    .select(heading)
                    .find_map(|el| clean_title(&text_of(el)))
            })
        })
    })
}

fn first_attribute(doc: &Html) -> Option<String> {
    TITLE_ATTRS.iter().find_map(|(sel, attr)| {
        doc.select(sel)
            .next()
            .and_then(|el| el.value().attr(attr))
            .and_then(clean_title)
    })
}

fn first_paragraph(doc: &Html) -> Option<String> {
    PARAGRAPH
        .iter()
        .flat_map(|sel| doc.select(sel))
        .map(text_of)
        .find(|text| !text.trim().is_empty())
        .and_then(|text| clean_title(&text))
}

fn leading_text(doc: &Html) -> Option<String> {
    let text = collapse_whitespace(&doc.root_element().text().collect::<String>());
    if text.is_empty() {
        return None;
    }

    if let Some(sentence) = SENTENCE_END.split(&text).find_map(clean_title) {
        return Some(sentence);
    }

    if text.chars().count() > 10 {
        let snippet: String = text.chars().take(SNIPPET_CHARS).collect();
        let mut snippet = snippet.trim().to_string();
        if text.chars().count() > SNIPPET_CHARS {
            snippet.push_str(ELLIPSIS);
        }
        return clean_title(&snippet);
    }
    None
}

/// Derives a title from the last path segment, e.g.
/// `/2024/05/12-rust-async_tips.html` → `Rust Async Tips`.
fn slug_title(link: &str) -> Option<String> {
    let url = Url::parse(link).ok()?;
    let segment = url.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let decoded = urlencoding::decode(segment).ok()?;

    let stem: &str = match decoded.rsplit_once('.') {
        Some((stem, _)) => stem,
        None => &decoded,
    };
    let spaced = stem.replace(['_', '-'], " ");
    let stripped = LEADING_DIGITS.replace(&spaced, "");
    clean_title(&title_case(&stripped))
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}
