//! HTML → feed extraction strategies.
//!
//! - [`engine`] - CSS-selector heuristics, the default strategy
//! - [`overrides`] - per-site selector bundles consulted by the engine
//! - [`ai`] - optional LLM strategy that falls back to the engine
//!
//! Every strategy honours the same contract: given page HTML and the page
//! URL, return a [`FeedDocument`]. Strategies never fail; they degrade.

mod ai;
mod engine;
mod overrides;

use async_trait::async_trait;
use url::Url;

use crate::feed::FeedDocument;

pub use ai::{AiError, OllamaExtractor, AI_VERSION, FALLBACK_VERSION};
pub use engine::{HtmlExtractor, HTML_VERSION};
pub use overrides::{CompiledOverride, OverrideError, OverrideRegistry, SelectorSpec, SiteOverride};

/// Turns an HTML page into a feed document.
#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    async fn extract(&self, html: &str, base_url: &Url) -> FeedDocument;
}

#[async_trait]
impl ExtractionStrategy for HtmlExtractor {
    async fn extract(&self, html: &str, base_url: &Url) -> FeedDocument {
        self.extract_page(html, base_url)
    }
}
