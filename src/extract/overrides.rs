//! Per-site selector overrides.
//!
//! An override replaces the engine's built-in selectors for one page family.
//! Overrides are keyed by a domain substring; lookup picks the longest key
//! contained in the page's host, so `news.example.com` beats `example.com`.
//! Equal-length matches resolve to the lexicographically smaller key.

use scraper::Selector;
use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum OverrideError {
    #[error("Invalid selector {selector:?} for site {site}: {reason}")]
    InvalidSelector {
        site: String,
        selector: String,
        reason: String,
    },
}

/// One or more selector strings; TOML accepts either `"a"` or `["a", "b"]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "OneOrMany")]
pub struct SelectorSpec(Vec<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for SelectorSpec {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(s) => Self(vec![s]),
            OneOrMany::Many(v) => Self(v),
        }
    }
}

impl SelectorSpec {
    pub fn new<I, S>(selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(selectors.into_iter().map(Into::into).collect())
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Selector bundle for one site, as written in configuration.
///
/// An empty field means "use the engine default" for that field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SiteOverride {
    /// Tried in order; matches are unioned
    pub candidate_selectors: SelectorSpec,
    pub title_selector: SelectorSpec,
    pub date_selector: SelectorSpec,
    pub content_selector: SelectorSpec,
    pub author_selector: SelectorSpec,
    pub tag_selector: SelectorSpec,
}

impl SiteOverride {
    /// Parses every selector, failing on the first invalid one.
    pub fn compile(&self, site: &str) -> Result<CompiledOverride, OverrideError> {
        let parse = |spec: &SelectorSpec| -> Result<Vec<Selector>, OverrideError> {
            spec.as_slice()
                .iter()
                .map(|raw| {
                    Selector::parse(raw).map_err(|e| OverrideError::InvalidSelector {
                        site: site.to_string(),
                        selector: raw.clone(),
                        reason: e.to_string(),
                    })
                })
                .collect()
        };

        Ok(CompiledOverride {
            site: site.to_lowercase(),
            candidates: parse(&self.candidate_selectors)?,
            title: parse(&self.title_selector)?,
            date: parse(&self.date_selector)?,
            content: parse(&self.content_selector)?,
            author: parse(&self.author_selector)?,
            tag: parse(&self.tag_selector)?,
        })
    }
}

/// A [`SiteOverride`] with its selectors parsed, ready for the engine.
#[derive(Debug, Clone)]
pub struct CompiledOverride {
    pub site: String,
    pub candidates: Vec<Selector>,
    pub title: Vec<Selector>,
    pub date: Vec<Selector>,
    pub content: Vec<Selector>,
    pub author: Vec<Selector>,
    pub tag: Vec<Selector>,
}

/// Immutable domain → override map, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct OverrideRegistry {
    // Sorted by key, which makes equal-length tie-breaks deterministic
    entries: Vec<CompiledOverride>,
}

impl OverrideRegistry {
    /// Builds the registry from the shipped overrides plus configured ones.
    ///
    /// A configured site with the same key as a shipped one replaces it. An
    /// invalid selector anywhere is a [`ConfigError::Override`].
    pub fn from_config(sites: &BTreeMap<String, SiteOverride>) -> Result<Self, ConfigError> {
        let mut merged = builtin_overrides();
        for (site, spec) in sites {
            merged.insert(site.to_lowercase(), spec.clone());
        }
        Ok(Self::compile(&merged)?)
    }

    /// Builds a registry from exactly the given sites, without the shipped set.
    pub fn compile(sites: &BTreeMap<String, SiteOverride>) -> Result<Self, OverrideError> {
        let entries = sites
            .iter()
            .map(|(site, spec)| spec.compile(site))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }

    /// Finds the override for `host`: the longest key the host contains.
    pub fn lookup(&self, host: &str) -> Option<&CompiledOverride> {
        let host = host.to_lowercase();
        let mut best: Option<&CompiledOverride> = None;
        for entry in &self.entries {
            if !host.contains(&entry.site) {
                continue;
            }
            if best.map_or(true, |b| entry.site.len() > b.site.len()) {
                best = Some(entry);
            }
        }
        best
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Overrides shipped with the service for sites whose markup defeats the
/// generic heuristics.
fn builtin_overrides() -> BTreeMap<String, SiteOverride> {
    let mut sites = BTreeMap::new();

    sites.insert(
        "bbc.com".to_string(),
        SiteOverride {
            candidate_selectors: SelectorSpec::new([
                r#"[data-testid*="dundee-card"]"#,
                r#"[data-testid*="nevada-card"]"#,
            ]),
            title_selector: SelectorSpec::new([r#"[data-testid*="card-headline"]"#]),
            content_selector: SelectorSpec::new([r#"[data-testid*="card-description"]"#]),
            date_selector: SelectorSpec::new(["div.date, time"]),
            author_selector: SelectorSpec::new(["span.byline__name"]),
            tag_selector: SelectorSpec::new(["ul.tags li"]),
        },
    );

    sites.insert(
        "timesofindia.indiatimes.com".to_string(),
        SiteOverride {
            candidate_selectors: SelectorSpec::new([r#"[data-type*="in_view"]"#]),
            title_selector: SelectorSpec::new(["p"]),
            date_selector: SelectorSpec::new(["div.date, time"]),
            author_selector: SelectorSpec::new(["span.byline__name"]),
            tag_selector: SelectorSpec::new(["ul.tags li"]),
            ..SiteOverride::default()
        },
    );

    sites.insert(
        "economictimes.indiatimes.com".to_string(),
        SiteOverride {
            candidate_selectors: SelectorSpec::new([
                r#"[id*="topStories"]"#,
                r#"[class*="eachStory"]"#,
                r#"[id*="pageContent"]"#,
                r#"[class*="story_sec"]"#,
            ]),
            title_selector: SelectorSpec::new(["h1, h2, h3, h4, h5, h6", r#"[class*="story_lg_head"]"#]),
            date_selector: SelectorSpec::new(["div.date, time"]),
            author_selector: SelectorSpec::new(["span.byline__name"]),
            tag_selector: SelectorSpec::new(["ul.tags li"]),
            ..SiteOverride::default()
        },
    );

    sites
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(title: &str) -> SiteOverride {
        SiteOverride {
            title_selector: SelectorSpec::new([title]),
            ..SiteOverride::default()
        }
    }

    #[test]
    fn test_builtin_sites_present() {
        let registry = OverrideRegistry::from_config(&BTreeMap::new()).unwrap();
        assert_eq!(registry.len(), 3);
        assert!(registry.lookup("www.bbc.com").is_some());
        assert!(registry.lookup("economictimes.indiatimes.com").is_some());
        assert!(registry.lookup("example.com").is_none());
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = OverrideRegistry::from_config(&BTreeMap::new()).unwrap();
        assert_eq!(registry.lookup("WWW.BBC.COM").unwrap().site, "bbc.com");
    }

    #[test]
    fn test_longest_match_wins() {
        let mut sites = BTreeMap::new();
        sites.insert("example.com".to_string(), site("h1"));
        sites.insert("news.example.com".to_string(), site("h2"));
        let registry = OverrideRegistry::compile(&sites).unwrap();

        assert_eq!(
            registry.lookup("news.example.com").unwrap().site,
            "news.example.com"
        );
        assert_eq!(registry.lookup("blog.example.com").unwrap().site, "example.com");
    }

    #[test]
    fn test_equal_length_tie_breaks_on_key_order() {
        let mut sites = BTreeMap::new();
        sites.insert("bbb.io".to_string(), site("h2"));
        sites.insert("aaa.io".to_string(), site("h1"));
        let registry = OverrideRegistry::compile(&sites).unwrap();

        assert_eq!(registry.lookup("aaa.io.bbb.io").unwrap().site, "aaa.io");
    }

    #[test]
    fn test_configured_site_replaces_builtin() {
        let mut sites = BTreeMap::new();
        sites.insert("BBC.com".to_string(), site(".custom"));
        let registry = OverrideRegistry::from_config(&sites).unwrap();

        assert_eq!(registry.len(), 3);
        let bbc = registry.lookup("www.bbc.com").unwrap();
        assert!(bbc.candidates.is_empty());
        assert_eq!(bbc.title.len(), 1);
    }

    #[test]
    fn test_invalid_selector_rejected() {
        let mut sites = BTreeMap::new();
        sites.insert("example.com".to_string(), site("[[nope"));
        let err = OverrideRegistry::compile(&sites).unwrap_err();
        assert!(err.to_string().contains("example.com"));
        assert!(err.to_string().contains("[[nope"));
    }

    #[test]
    fn test_selector_spec_accepts_string_or_list() {
        let one: SiteOverride = toml::from_str(r#"title_selector = "h2""#).unwrap();
        let many: SiteOverride = toml::from_str(r#"title_selector = ["h2", ".t"]"#).unwrap();
        assert_eq!(one.title_selector.as_slice(), ["h2"]);
        assert_eq!(many.title_selector.as_slice(), ["h2", ".t"]);
    }
}
