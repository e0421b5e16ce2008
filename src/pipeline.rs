//! The parse pipeline: fetch → classify → parse or extract → normalize.
//!
//! One [`Pipeline`] is built at startup and shared by every request. It holds
//! no per-request state; each call to [`Pipeline::parse`] works on its own
//! fetched body and feed document.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::config::Config;
use crate::extract::{
    AiError, ExtractionStrategy, HtmlExtractor, OllamaExtractor, OverrideRegistry, AI_VERSION,
};
use crate::feed::{
    classify, discover_feed, find_feed_links, parse_json_feed, parse_syndication, ContentKind,
    FeedDocument, FetchError, FetchedPage, Fetcher, FormatError,
};
use crate::normalize::{FeedMeta, NormalizedItem, Normalizer};
use crate::util::{validate_url, UrlValidationError};

/// A syndication or JSON feed parsed as-is.
pub const SOURCE_DIRECT: &str = "Direct feed";
/// An HTML page scraped by the CSS engine.
pub const SOURCE_HTML: &str = "HTML parser";
/// An HTML page the model extracted.
pub const SOURCE_AI: &str = "AI HTML parser";
/// A feed or unrecognised body that had to be scraped as HTML instead.
pub const SOURCE_FALLBACK: &str = "HTML parser (rss/xml/json fallback)";
/// A feed advertised by the requested HTML page.
pub const SOURCE_DISCOVERED: &str = "HTML discovered feed";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    InvalidUrl(#[from] UrlValidationError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("Failed to set up AI extractor: {0}")]
    Ai(#[from] AiError),
}

impl PipelineError {
    /// Whether the caller sent something unusable, as opposed to the source
    /// or the service failing.
    pub fn is_client_error(&self) -> bool {
        matches!(self, PipelineError::InvalidUrl(_))
    }
}

/// Body of a successful `/parse` response.
#[derive(Debug, Clone, Serialize)]
pub struct ParseResponse {
    pub feed: FeedMeta,
    pub items: Vec<NormalizedItem>,
    pub source: &'static str,
}

pub struct Pipeline {
    fetcher: Fetcher,
    strategy: Arc<dyn ExtractionStrategy>,
    normalizer: Normalizer,
    allow_private_hosts: bool,
    discover_feeds: bool,
}

impl Pipeline {
    /// Builds the pipeline from configuration.
    ///
    /// The AI strategy is used only when `ai.enabled` is set; it wraps the
    /// CSS engine as its fallback.
    pub fn new(config: &Config, overrides: Arc<OverrideRegistry>) -> Result<Self, PipelineError> {
        let fetcher = Fetcher::new(&config.fetch)?;
        let engine = HtmlExtractor::new(&config.extract, overrides);

        let strategy: Arc<dyn ExtractionStrategy> = if config.ai.enabled {
            tracing::info!(
                base_url = %config.ai.base_url,
                model = %config.ai.model,
                "AI extraction enabled"
            );
            Arc::new(OllamaExtractor::new(
                config.ai.clone(),
                config.extract.summary_max_chars,
                engine,
            )?)
        } else {
            Arc::new(engine)
        };

        Ok(Self::with_parts(fetcher, strategy, Normalizer::new(&config.normalize), config))
    }

    /// Assembles a pipeline from already-built parts.
    pub fn with_parts(
        fetcher: Fetcher,
        strategy: Arc<dyn ExtractionStrategy>,
        normalizer: Normalizer,
        config: &Config,
    ) -> Self {
        Self {
            fetcher,
            strategy,
            normalizer,
            allow_private_hosts: config.fetch.allow_private_hosts,
            discover_feeds: config.extract.discover_feeds,
        }
    }

    /// Turns `raw_url` into a normalized feed.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::InvalidUrl`] - not an acceptable http(s) URL
    /// - [`PipelineError::Fetch`] - the source could not be retrieved
    ///
    /// Parse and extraction problems are not errors: they degrade to the
    /// HTML engine.
    pub async fn parse(&self, raw_url: &str) -> Result<ParseResponse, PipelineError> {
        let url = validate_url(raw_url, self.allow_private_hosts)?;
        tracing::info!(url = %url, "Parsing");

        let page = self.fetcher.fetch(&url).await?;
        let kind = classify(&page.content_type, &page.body);
        tracing::debug!(url = %url, kind = ?kind, profile = page.profile, "Classified response");

        let (document, source) = match kind {
            ContentKind::Xml => {
                let parsed = parse_syndication(&page.body, &page.url);
                self.direct_or_fallback(parsed, &page).await
            }
            ContentKind::Json => {
                let parsed = parse_json_feed(&page.body, &page.url);
                self.direct_or_fallback(parsed, &page).await
            }
            ContentKind::Html => self.from_html(&page).await,
            ContentKind::Unknown => (self.extract(&page).await, SOURCE_FALLBACK),
        };

        let (feed, items) = self.normalizer.normalize(document, url.as_str());
        tracing::info!(url = %url, source, items = items.len(), "Parsed");

        Ok(ParseResponse {
            feed,
            items,
            source,
        })
    }

    async fn direct_or_fallback(
        &self,
        parsed: Result<FeedDocument, FormatError>,
        page: &FetchedPage,
    ) -> (FeedDocument, &'static str) {
        match parsed {
            Ok(document) => (document, SOURCE_DIRECT),
            Err(e) => {
                tracing::warn!(url = %page.url, error = %e, "Feed parse failed, scraping as HTML");
                (self.extract(page).await, SOURCE_FALLBACK)
            }
        }
    }

    async fn from_html(&self, page: &FetchedPage) -> (FeedDocument, &'static str) {
        let html = page.text();

        if self.discover_feeds {
            let links = find_feed_links(&html, &page.url);
            if !links.is_empty() {
                tracing::debug!(url = %page.url, candidates = links.len(), "Trying discovered feeds");
                if let Some(document) =
                    discover_feed(&self.fetcher, &links, self.allow_private_hosts).await
                {
                    return (document, SOURCE_DISCOVERED);
                }
            }
        }

        let document = self.strategy.extract(&html, &page.url).await;
        let source = if document.version == AI_VERSION {
            SOURCE_AI
        } else {
            SOURCE_HTML
        };
        (document, source)
    }

    async fn extract(&self, page: &FetchedPage) -> FeedDocument {
        self.strategy.extract(&page.text(), &page.url).await
    }
}
