//! LLM-backed extraction through a local Ollama server.
//!
//! The model is asked for a JSON object describing the page's article list.
//! Whatever goes wrong (transport, status, unparseable output, an empty
//! article list), the page is handed to the CSS engine instead and the
//! resulting document is tagged [`FALLBACK_VERSION`].

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use url::Url;

use super::engine::HtmlExtractor;
use super::ExtractionStrategy;
use crate::config::AiConfig;
use crate::feed::{Content, FeedDocument, FeedEntry, UNTITLED_FEED};
use crate::util::{collapse_whitespace, resolve_link, summarize};

/// Version tag for documents the model produced.
pub const AI_VERSION: &str = "html-scrapegraph";

/// Version tag for documents the CSS engine produced after the model failed.
pub const FALLBACK_VERSION: &str = "html-fallback";

const PROMPT: &str = "You are given the HTML of a web page that lists articles or posts. \
Return only a JSON object with this shape: \
{\"feed_title\": string, \"feed_language\": string, \"articles\": [{\"title\": string, \
\"link\": string, \"published\": string, \"summary\": string, \"content\": string, \
\"author\": string, \"tags\": [string]}]}. \
Use the page's own wording. Use an empty string for unknown fields. \
Do not invent articles that are not on the page.\n\nHTML:\n";

#[derive(Debug, Error)]
pub enum AiError {
    #[error("Ollama request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Ollama request timed out")]
    Timeout,
    #[error("Ollama returned status {0}")]
    Status(u16),
    #[error("Model output is not valid feed JSON: {0}")]
    InvalidOutput(#[from] serde_json::Error),
    #[error("Model found no articles")]
    NoArticles,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    format: &'static str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ModelPage {
    #[serde(alias = "title")]
    feed_title: Option<String>,
    feed_language: Option<String>,
    articles: Vec<ModelArticle>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ModelArticle {
    title: Option<String>,
    link: Option<String>,
    published: Option<String>,
    summary: Option<String>,
    content: Option<String>,
    author: Option<String>,
    tags: Value,
}

/// Extraction strategy that asks an LLM first and falls back to the CSS engine.
#[derive(Debug, Clone)]
pub struct OllamaExtractor {
    http: reqwest::Client,
    cfg: AiConfig,
    summary_max_chars: usize,
    fallback: HtmlExtractor,
}

impl OllamaExtractor {
    pub fn new(
        cfg: AiConfig,
        summary_max_chars: usize,
        fallback: HtmlExtractor,
    ) -> Result<Self, AiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            cfg,
            summary_max_chars,
            fallback,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.cfg.base_url.trim_end_matches('/'))
    }

    async fn ask_model(&self, html: &str, base_url: &Url) -> Result<FeedDocument, AiError> {
        let page = match html.char_indices().nth(self.cfg.max_html_chars) {
            Some((end, _)) => &html[..end],
            None => html,
        };
        let request = GenerateRequest {
            model: &self.cfg.model,
            prompt: format!("{PROMPT}{page}"),
            format: "json",
            stream: false,
        };

        let response = self
            .http
            .post(self.endpoint())
            .json(&request)
            .send()
            .await
            .map_err(|e| if e.is_timeout() { AiError::Timeout } else { AiError::Http(e) })?;

        if !response.status().is_success() {
            return Err(AiError::Status(response.status().as_u16()));
        }

        let body: GenerateResponse = response.json().await?;
        let parsed: ModelPage = serde_json::from_str(&body.response)?;
        self.build_document(parsed, base_url)
    }

    fn build_document(&self, page: ModelPage, base_url: &Url) -> Result<FeedDocument, AiError> {
        let mut feed = FeedDocument::new(base_url.as_str(), AI_VERSION);
        feed.title = page
            .feed_title
            .map(|t| collapse_whitespace(&t))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| UNTITLED_FEED.to_string());
        feed.language = page.feed_language.unwrap_or_default();

        feed.entries = page
            .articles
            .into_iter()
            .take(self.cfg.max_articles)
            .map(|article| self.build_entry(article, base_url))
            .collect();

        if feed.entries.is_empty() {
            return Err(AiError::NoArticles);
        }
        Ok(feed)
    }

    fn build_entry(&self, article: ModelArticle, base_url: &Url) -> FeedEntry {
        let link = article
            .link
            .as_deref()
            .and_then(|href| resolve_link(base_url, href))
            .map(String::from)
            .unwrap_or_else(|| base_url.to_string());

        let content = article.content.unwrap_or_default();
        let summary = match article.summary.filter(|s| !s.trim().is_empty()) {
            Some(summary) => summary,
            None => summarize(&content, self.summary_max_chars),
        };

        let mut entry = FeedEntry {
            title: article.title.unwrap_or_default(),
            link,
            published: article.published.unwrap_or_default(),
            summary,
            author: article.author.unwrap_or_default(),
            ..FeedEntry::default()
        };
        if !content.is_empty() {
            entry.content.push(Content { value: content });
        }

        match article.tags {
            Value::String(tag) => entry.add_tag(tag),
            Value::Array(tags) => {
                for tag in tags {
                    if let Value::String(tag) = tag {
                        entry.add_tag(tag);
                    }
                }
            }
            _ => {}
        }
        entry
    }
}

#[async_trait]
impl ExtractionStrategy for OllamaExtractor {
    async fn extract(&self, html: &str, base_url: &Url) -> FeedDocument {
        match self.ask_model(html, base_url).await {
            Ok(feed) => {
                tracing::debug!(url = %base_url, entries = feed.entries.len(), "AI extraction succeeded");
                feed
            }
            Err(e) => {
                tracing::warn!(url = %base_url, error = %e, "AI extraction failed, using CSS engine");
                let mut feed = self.fallback.extract_page(html, base_url);
                feed.version = FALLBACK_VERSION.to_string();
                feed
            }
        }
    }
}
