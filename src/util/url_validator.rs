use std::net::IpAddr;
use thiserror::Error;
use url::Url;

/// Errors that can occur during URL validation.
///
/// These errors cover both parsing failures and security policy violations
/// designed to prevent SSRF (Server-Side Request Forgery) through `/parse`.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// The URL has no host component.
    #[error("URL has no host")]
    MissingHost,
    /// The URL points to a private/internal IP address.
    #[error("Private IP address not allowed: {0}")]
    PrivateIp(String),
    /// The URL points to localhost.
    #[error("Localhost not allowed")]
    Localhost,
}

/// Validates a URL string as a fetch target.
///
/// Rejects non-HTTP(S) schemes and host-less URLs. Unless `allow_private` is
/// set, also rejects localhost and private/link-local addresses.
///
/// # Examples
///
/// ```
/// use rssify::util::validate_url;
///
/// let url = validate_url("https://example.com/feed.xml", false).unwrap();
/// assert_eq!(url.host_str(), Some("example.com"));
///
/// assert!(validate_url("http://localhost/feed", false).is_err());
/// assert!(validate_url("http://localhost/feed", true).is_ok());
/// assert!(validate_url("file:///etc/passwd", true).is_err());
/// ```
pub fn validate_url(url_str: &str, allow_private: bool) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str.trim())?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    let host = url.host_str().ok_or(UrlValidationError::MissingHost)?;

    if allow_private {
        return Ok(url);
    }

    if host == "localhost" {
        return Err(UrlValidationError::Localhost);
    }

    // Strip brackets from IPv6 addresses for parsing
    let host_for_parse = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);

    if let Ok(ip) = host_for_parse.parse::<IpAddr>() {
        if ip.is_loopback() {
            return Err(UrlValidationError::Localhost);
        }
        if is_private_ip(&ip) {
            return Err(UrlValidationError::PrivateIp(ip.to_string()));
        }
    }

    Ok(url)
}

/// Resolves an `href` found in a page against the page's URL.
///
/// Only returns links that end up as absolute http(s) URLs with a host, so
/// `javascript:`, `mailto:` and fragment-only hrefs yield `None`.
pub fn resolve_link(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    let resolved = base.join(href).ok()?;
    match resolved.scheme() {
        "http" | "https" if resolved.host_str().is_some() => Some(resolved),
        _ => None,
    }
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => {
            ipv4.is_private() || ipv4.is_loopback() || ipv4.is_link_local() || ipv4.is_unspecified()
        }
        IpAddr::V6(ipv6) => {
            if ipv6.is_loopback() || ipv6.is_unspecified() {
                return true;
            }
            let segments = ipv6.segments();
            // Unique Local (fc00::/7)
            let is_unique_local = (segments[0] & 0xfe00) == 0xfc00;
            // Link-Local (fe80::/10)
            let is_link_local = (segments[0] & 0xffc0) == 0xfe80;
            is_unique_local || is_link_local
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_urls() {
        assert!(validate_url("https://example.com/feed.xml", false).is_ok());
        assert!(validate_url("http://news.example.org", false).is_ok());
        assert!(validate_url("  https://example.com/padded  ", false).is_ok());
    }

    #[test]
    fn test_invalid_schemes() {
        assert!(validate_url("file:///etc/passwd", false).is_err());
        assert!(validate_url("ftp://example.com", false).is_err());
        assert!(matches!(
            validate_url("mailto:someone@example.com", true),
            Err(UrlValidationError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn test_localhost_rejected() {
        assert!(validate_url("http://localhost/feed", false).is_err());
        assert!(validate_url("http://127.0.0.1/feed", false).is_err());
        assert!(validate_url("http://[::1]/feed", false).is_err());
    }

    #[test]
    fn test_private_ips_rejected() {
        assert!(validate_url("http://192.168.1.1/feed", false).is_err());
        assert!(validate_url("http://10.0.0.1:3000/feed", false).is_err());
        assert!(validate_url("http://172.16.0.1/feed", false).is_err());
        assert!(validate_url("http://169.254.1.1/feed", false).is_err());
        assert!(validate_url("http://[fe80::1]/feed", false).is_err());
        assert!(validate_url("http://0.0.0.0/feed", false).is_err());
    }

    #[test]
    fn test_private_allowed_when_configured() {
        assert!(validate_url("http://127.0.0.1:8080/feed", true).is_ok());
        assert!(validate_url("http://192.168.1.1/feed", true).is_ok());
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            validate_url("not a url", true),
            Err(UrlValidationError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_resolve_relative_link() {
        let base = Url::parse("https://example.com/blog/").unwrap();
        assert_eq!(
            resolve_link(&base, "post-1").unwrap().as_str(),
            "https://example.com/blog/post-1"
        );
        assert_eq!(
            resolve_link(&base, "/about").unwrap().as_str(),
            "https://example.com/about"
        );
    }

    #[test]
    fn test_resolve_protocol_relative_link() {
        let base = Url::parse("https://example.com/").unwrap();
        assert_eq!(
            resolve_link(&base, "//cdn.example.com/a").unwrap().as_str(),
            "https://cdn.example.com/a"
        );
    }

    #[test]
    fn test_resolve_rejects_non_http_links() {
        let base = Url::parse("https://example.com/").unwrap();
        assert!(resolve_link(&base, "javascript:void(0)").is_none());
        assert!(resolve_link(&base, "mailto:a@example.com").is_none());
        assert!(resolve_link(&base, "   ").is_none());
    }

    #[test]
    fn test_resolve_fragment_stays_on_page() {
        let base = Url::parse("https://example.com/page").unwrap();
        assert_eq!(
            resolve_link(&base, "#top").unwrap().as_str(),
            "https://example.com/page#top"
        );
    }
}
