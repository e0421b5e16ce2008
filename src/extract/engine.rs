//! Heuristic HTML → feed extraction.
//!
//! Finds repeated article-like blocks on a page with CSS selectors and pulls
//! title, link, date, body, author and tags out of each. A site override, when
//! one matches, is consulted before the built-in selectors for every field.
//!
//! Extraction never fails: a page with no recognisable blocks yields a single
//! entry built from `<body>`.

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::overrides::{CompiledOverride, OverrideRegistry};
use crate::config::ExtractConfig;
use crate::feed::{Content, FeedDocument, FeedEntry, UNTITLED_ENTRY, UNTITLED_FEED};
use crate::util::{collapse_whitespace, resolve_link, summarize};

/// Version tag for documents built by the CSS engine.
pub const HTML_VERSION: &str = "html";

#[allow(clippy::expect_used)]
fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("built-in selector is valid")
}

static DEFAULT_CANDIDATES: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    [
        "article",
        r#"[itemtype*="Article"]"#,
        r#"[class*="post"]"#,
        r#"[id*="post"]"#,
        r#"[class*="article"]"#,
        r#"[id*="article"]"#,
        r#"[class*="entry"]"#,
        r#"[id*="entry"]"#,
        r#"[class*="story"]"#,
        r#"[id*="story"]"#,
    ]
    .into_iter()
    .map(selector)
    .collect()
});

static DEFAULT_TITLE: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"h1, h2, h3, [itemprop="headline"], .title"#));
static DEFAULT_DATE: LazyLock<Selector> =
    LazyLock::new(|| selector("time, [datetime], .date, .published, .posted-on"));
static DEFAULT_CONTENT: LazyLock<Selector> = LazyLock::new(|| {
    selector(r#"[itemprop="articleBody"], .content, .entry-content, .post-content"#)
});
static DEFAULT_AUTHOR: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"[itemprop="author"], .author, .byline"#));
static DEFAULT_TAGS: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"[rel="tag"], .category, .tag"#));

static ANCHOR: LazyLock<Selector> = LazyLock::new(|| selector("a[href]"));
static BODY: LazyLock<Selector> = LazyLock::new(|| selector("body"));
static PAGE_TITLE: LazyLock<Selector> = LazyLock::new(|| selector("title"));

/// The CSS-selector extraction engine.
#[derive(Debug, Clone)]
pub struct HtmlExtractor {
    min_candidate_text: usize,
    summary_max_chars: usize,
    overrides: Arc<OverrideRegistry>,
}

impl HtmlExtractor {
    pub fn new(config: &ExtractConfig, overrides: Arc<OverrideRegistry>) -> Self {
        Self {
            min_candidate_text: config.min_candidate_text,
            summary_max_chars: config.summary_max_chars,
            overrides,
        }
    }

    /// Extracts a feed, picking the site override from `base_url`'s host.
    pub fn extract_page(&self, html: &str, base_url: &Url) -> FeedDocument {
        let site = base_url
            .host_str()
            .and_then(|host| self.overrides.lookup(host));
        if let Some(site) = site {
            tracing::debug!(url = %base_url, site = %site.site, "Using site override");
        }
        self.extract_with(html, base_url, site)
    }

    /// Extracts a feed using an explicit override (or none).
    pub fn extract_with(
        &self,
        html: &str,
        base_url: &Url,
        site: Option<&CompiledOverride>,
    ) -> FeedDocument {
        let document = Html::parse_document(html);
        let mut feed = FeedDocument::new(base_url.as_str(), HTML_VERSION);

        feed.language = document
            .root_element()
            .value()
            .attr("lang")
            .map(|lang| lang.trim().to_string())
            .unwrap_or_default();

        let page_title = document
            .select(&PAGE_TITLE)
            .next()
            .map(element_text)
            .unwrap_or_default();
        if !page_title.is_empty() {
            feed.title = page_title;
        } else {
            feed.title = UNTITLED_FEED.to_string();
        }

        let candidates = self.find_candidates(&document, site);
        tracing::debug!(url = %base_url, candidates = candidates.len(), "Extracting HTML entries");

        feed.entries = candidates
            .into_iter()
            .map(|candidate| self.extract_entry(candidate, base_url, site))
            .collect();
        feed
    }

    fn find_candidates<'a>(
        &self,
        document: &'a Html,
        site: Option<&CompiledOverride>,
    ) -> Vec<ElementRef<'a>> {
        let selectors: &[Selector] = match site {
            Some(site) if !site.candidates.is_empty() => site.candidates.as_slice(),
            _ => DEFAULT_CANDIDATES.as_slice(),
        };

        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for sel in selectors {
            for element in document.select(sel) {
                if seen.insert(element.id()) {
                    candidates.push(element);
                }
            }
        }

        candidates.retain(|c| element_text(*c).chars().count() >= self.min_candidate_text);

        if candidates.is_empty() {
            let body = document
                .select(&BODY)
                .next()
                .unwrap_or_else(|| document.root_element());
            candidates.push(body);
        }
        candidates
    }

    fn extract_entry(
        &self,
        candidate: ElementRef<'_>,
        base_url: &Url,
        site: Option<&CompiledOverride>,
    ) -> FeedEntry {
        let pick = |field: fn(&CompiledOverride) -> &Vec<Selector>| {
            site.map_or(&[][..], |s| field(s).as_slice())
        };
        let first_anchor = candidate.select(&ANCHOR).next();

        let title = first_text(candidate, pick(|s| &s.title), &DEFAULT_TITLE)
            .or_else(|| non_empty(candidate.value().attr("aria-label").map(collapse_whitespace)))
            .or_else(|| non_empty(first_anchor.map(element_text)))
            .unwrap_or_else(|| UNTITLED_ENTRY.to_string());

        let link = first_anchor
            .and_then(|a| a.value().attr("href"))
            .and_then(|href| resolve_link(base_url, href))
            .map(String::from)
            .unwrap_or_else(|| base_url.to_string());

        // `datetime` attribute beats the visible text
        let published = chain(candidate, pick(|s| &s.date), &DEFAULT_DATE)
            .find_map(|el| {
                let value = el
                    .value()
                    .attr("datetime")
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(String::from)
                    .unwrap_or_else(|| element_text(el));
                non_empty(Some(value))
            })
            .unwrap_or_default();

        let content = chain(candidate, pick(|s| &s.content), &DEFAULT_CONTENT)
            .next()
            .unwrap_or(candidate)
            .html();

        let author =
            first_text(candidate, pick(|s| &s.author), &DEFAULT_AUTHOR).unwrap_or_default();

        let mut entry = FeedEntry {
            title,
            link,
            published,
            summary: summarize(&content, self.summary_max_chars),
            author,
            ..FeedEntry::default()
        };
        entry.content.push(Content { value: content });

        for sel in pick(|s| &s.tag) {
            for tag in candidate.select(sel) {
                entry.add_tag(element_text(tag));
            }
        }
        if entry.tags.is_empty() {
            for tag in candidate.select(&DEFAULT_TAGS) {
                entry.add_tag(element_text(tag));
            }
        }

        entry
    }
}

/// Matches from the override selectors in order, then from the default.
fn chain<'a, 'b>(
    scope: ElementRef<'a>,
    overrides: &'b [Selector],
    default: &'b Selector,
) -> impl Iterator<Item = ElementRef<'a>> + 'b
where
    'a: 'b,
{
    overrides
        .iter()
        .chain(std::iter::once(default))
        .filter_map(move |sel| scope.select(sel).next())
}

fn first_text(scope: ElementRef<'_>, overrides: &[Selector], default: &Selector) -> Option<String> {
    chain(scope, overrides, default).find_map(|el| non_empty(Some(element_text(el))))
}

fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
