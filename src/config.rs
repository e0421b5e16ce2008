//! Configuration for the parser service, read once at startup.
//!
//! The config file is optional: a missing file yields `Config::default()`.
//! Unknown keys are ignored by serde, though we log a warning for each
//! top-level key we don't recognise. A handful of environment variables
//! override file values (env wins), see [`Config::apply_env`].
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0:8000"
//!
//! [fetch]
//! timeout_secs = 15
//!
//! [normalize]
//! max_items = 10
//!
//! [sites."example.com"]
//! candidate_selectors = [".card"]
//! title_selector = ".card-title"
//! ```
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::extract::{OverrideError, SiteOverride};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidEnv { key: &'static str, value: String },

    #[error(transparent)]
    Override(#[from] OverrideError),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level configuration.
///
/// All sections use `#[serde(default)]` so any subset of keys can be given.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub fetch: FetchConfig,
    pub extract: ExtractConfig,
    pub normalize: NormalizeConfig,
    pub ai: AiConfig,
    /// Per-site selector overrides keyed by a domain substring
    pub sites: BTreeMap<String, SiteOverride>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the HTTP server listens on
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Per-attempt timeout; a timeout fails the fetch instead of rotating profiles
    pub timeout_secs: u64,
    /// Response bodies larger than this are rejected
    pub max_body_bytes: usize,
    /// Accept localhost/private-network targets (tests, internal deployments)
    pub allow_private_hosts: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            max_body_bytes: 10 * 1024 * 1024,
            allow_private_hosts: false,
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Candidates with less rendered text than this are dropped
    pub min_candidate_text: usize,
    /// Summary length in characters before the ellipsis
    pub summary_max_chars: usize,
    /// Follow `<link rel="alternate">` feeds advertised by HTML pages
    pub discover_feeds: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            min_candidate_text: 50,
            summary_max_chars: 200,
            discover_feeds: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Maximum number of items in a response
    pub max_items: usize,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self { max_items: 10 }
    }
}

/// Settings for the optional LLM-backed extractor (Ollama API).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub enabled: bool,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    /// Upper bound on articles kept from one model response
    pub max_articles: usize,
    /// Page HTML beyond this many characters is not sent to the model
    pub max_html_chars: usize,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "http://localhost:11434".to_string(),
            model: "tinyllama:1.1b".to_string(),
            timeout_secs: 60,
            max_articles: 20,
            max_html_chars: 60_000,
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 6] = ["server", "fetch", "extract", "normalize", "ai", "sites"];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // File deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::from_toml(&content)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            tracing::debug!("Config is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        tracing::info!(
            bind = %config.server.bind,
            sites = config.sites.len(),
            ai_enabled = config.ai.enabled,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Applies environment overrides. Env vars take precedence over the file.
    ///
    /// - `RSSIFY_BIND` → `server.bind`
    /// - `RSSIFY_MAX_ITEMS` → `normalize.max_items`
    /// - `OLLAMA_BASE_URL` → `ai.base_url`
    /// - `OLLAMA_MODEL` → `ai.model`
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(bind) = var("RSSIFY_BIND") {
            self.server.bind = bind;
        }
        if let Some(raw) = var("RSSIFY_MAX_ITEMS") {
            self.normalize.max_items = raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                key: "RSSIFY_MAX_ITEMS",
                value: raw.clone(),
            })?;
        }
        if let Some(base_url) = var("OLLAMA_BASE_URL") {
            self.ai.base_url = base_url;
        }
        if let Some(model) = var("OLLAMA_MODEL") {
            self.ai.model = model;
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
