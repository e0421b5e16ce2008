use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::config::FetchConfig;

const MAX_REDIRECTS: usize = 10;

/// Errors that can occur while fetching a URL.
///
/// Only `403 Forbidden` moves on to the next header profile; everything else
/// ends the fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with a non-2xx status other than 403
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Every header profile was answered with 403
    #[error("URL fetch failed: all profiles forbidden (403)")]
    AllProfilesForbidden,
    /// An attempt exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Response body exceeded the configured size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
}

/// A named set of request headers presented to the origin.
#[derive(Debug, Clone, Copy)]
pub struct HeaderProfile {
    pub name: &'static str,
    pub headers: &'static [(&'static str, &'static str)],
}

/// Browser-like first, then progressively plainer clients. Some origins
/// reject one user agent but accept another.
pub const DEFAULT_PROFILES: [HeaderProfile; 3] = [
    HeaderProfile {
        name: "browser",
        headers: &[
            (
                "User-Agent",
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/134.0.0.0 Safari/537.36",
            ),
            (
                "Accept",
                "application/rss+xml, application/xml, application/atom+xml, text/xml, */*",
            ),
            ("Accept-Language", "en-US,en;q=0.9"),
            ("Connection", "keep-alive"),
            ("Cache-Control", "no-cache"),
        ],
    },
    HeaderProfile {
        name: "desktop",
        headers: &[
            (
                "User-Agent",
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
            ),
            ("Accept", "*/*"),
        ],
    },
    HeaderProfile {
        name: "cli",
        headers: &[("User-Agent", "curl/7.68.0"), ("Accept", "*/*")],
    },
];

/// A successfully fetched response body.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub url: Url,
    pub body: Vec<u8>,
    /// Raw `Content-Type` header, empty when absent
    pub content_type: String,
    /// Name of the header profile that got through
    pub profile: &'static str,
}

impl FetchedPage {
    /// Body decoded as UTF-8, invalid sequences replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

enum Attempt {
    Forbidden,
    Page(FetchedPage),
}

/// HTTP fetcher with header-profile rotation.
///
/// Attempts run sequentially. Nothing is cached between calls.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_body_bytes: usize,
    profiles: Vec<HeaderProfile>,
}

impl Fetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: reqwest::Client, config: &FetchConfig) -> Self {
        Self {
            client,
            timeout: config.timeout(),
            max_body_bytes: config.max_body_bytes,
            profiles: DEFAULT_PROFILES.to_vec(),
        }
    }

    /// Fetches `url`, rotating header profiles on 403.
    ///
    /// # Errors
    ///
    /// - [`FetchError::Timeout`] - an attempt exceeded the timeout (no rotation)
    /// - [`FetchError::HttpStatus`] - non-2xx status other than 403
    /// - [`FetchError::AllProfilesForbidden`] - every profile got 403
    /// - [`FetchError::Network`] - connection or TLS failure
    /// - [`FetchError::ResponseTooLarge`] - body exceeded the size limit
    pub async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        for profile in &self.profiles {
            let attempt = tokio::time::timeout(self.timeout, self.attempt(url, profile))
                .await
                .map_err(|_| FetchError::Timeout)??;

            match attempt {
                Attempt::Page(page) => {
                    tracing::debug!(
                        url = %url,
                        profile = profile.name,
                        bytes = page.body.len(),
                        content_type = %page.content_type,
                        "Fetched"
                    );
                    return Ok(page);
                }
                Attempt::Forbidden => {
                    tracing::warn!(url = %url, profile = profile.name, "Forbidden, trying next profile");
                }
            }
        }

        Err(FetchError::AllProfilesForbidden)
    }

    async fn attempt(&self, url: &Url, profile: &HeaderProfile) -> Result<Attempt, FetchError> {
        let mut request = self.client.get(url.clone());
        for (name, value) in profile.headers {
            request = request.header(*name, *value);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::FORBIDDEN {
            return Ok(Attempt::Forbidden);
        }
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let body = read_limited_bytes(response, self.max_body_bytes).await?;

        Ok(Attempt::Page(FetchedPage {
            url: final_url,
            body,
            content_type,
            profile: profile.name,
        }))
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let expected_length = response.content_length();

    // Fast path: check Content-Length header
    if let Some(len) = expected_length {
        if len > limit as u64 {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const VALID_RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <item><guid>1</guid><title>Test</title></item>
</channel></rss>"#;

    fn fetcher() -> Fetcher {
        Fetcher::new(&FetchConfig::default()).unwrap()
    }

    fn url(server: &MockServer, p: &str) -> Url {
        Url::parse(&format!("{}{}", server.uri(), p)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(VALID_RSS)
                    .insert_header("Content-Type", "application/rss+xml; charset=utf-8"),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let page = fetcher().fetch(&url(&mock_server, "/feed")).await.unwrap();
        assert_eq!(page.text(), VALID_RSS);
        assert_eq!(page.content_type, "application/rss+xml; charset=utf-8");
        assert_eq!(page.profile, "browser");
    }

    #[tokio::test]
    async fn test_first_profile_sends_browser_headers() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("Accept-Language", "en-US,en;q=0.9"))
            .and(header("Cache-Control", "no-cache"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let page = fetcher().fetch(&url(&mock_server, "/")).await.unwrap();
        assert_eq!(page.profile, "browser");
    }

    #[tokio::test]
    async fn test_403_rotates_to_next_profile() {
        let mock_server = MockServer::start().await;

        // First attempt forbidden, second succeeds
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .up_to_n_times(1)
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(VALID_RSS))
            .expect(1)
            .mount(&mock_server)
            .await;

        let page = fetcher().fetch(&url(&mock_server, "/feed")).await.unwrap();
        assert_eq!(page.profile, "desktop");
        assert_eq!(page.text(), VALID_RSS);
    }

    #[tokio::test]
    async fn test_cli_profile_used_after_two_403s() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("User-Agent", "curl/7.68.0"))
            .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .expect(2)
            .mount(&mock_server)
            .await;

        let page = fetcher().fetch(&url(&mock_server, "/")).await.unwrap();
        assert_eq!(page.profile, "cli");
    }

    #[tokio::test]
    async fn test_all_profiles_forbidden() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .expect(3)
            .mount(&mock_server)
            .await;

        let err = fetcher().fetch(&url(&mock_server, "/")).await.unwrap_err();
        assert!(matches!(err, FetchError::AllProfilesForbidden));
        assert!(err.to_string().contains("all profiles forbidden"));
    }

    #[tokio::test]
    async fn test_404_fails_without_rotation() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&mock_server)
            .await;

        let err = fetcher().fetch(&url(&mock_server, "/")).await.unwrap_err();
        match err {
            FetchError::HttpStatus(404) => {}
            e => panic!("Expected HttpStatus(404), got {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_500_fails_without_rotation() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&mock_server)
            .await;

        let err = fetcher().fetch(&url(&mock_server, "/")).await.unwrap_err();
        assert!(matches!(err, FetchError::HttpStatus(500)));
    }

    #[tokio::test]
    async fn test_timeout_does_not_rotate() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .expect(1)
            .mount(&mock_server)
            .await;

        let mut fetcher = fetcher();
        fetcher.timeout = Duration::from_millis(50);

        let err = fetcher.fetch(&url(&mock_server, "/")).await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout));
    }

    #[tokio::test]
    async fn test_body_over_limit_rejected() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(2048)))
            .mount(&mock_server)
            .await;

        let config = FetchConfig {
            max_body_bytes: 1024,
            ..FetchConfig::default()
        };
        let fetcher = Fetcher::new(&config).unwrap();

        let err = fetcher.fetch(&url(&mock_server, "/")).await.unwrap_err();
        assert!(matches!(err, FetchError::ResponseTooLarge));
    }

    #[tokio::test]
    async fn test_missing_content_type_is_empty() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"{}".to_vec()))
            .mount(&mock_server)
            .await;

        let page = fetcher().fetch(&url(&mock_server, "/")).await.unwrap();
        assert_eq!(page.content_type, "");
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let mock_server = MockServer::start().await;
        let target = url(&mock_server, "/");
        drop(mock_server);

        let err = fetcher().fetch(&target).await.unwrap_err();
        assert!(matches!(err, FetchError::Network(_)));
    }
}
