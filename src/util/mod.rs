//! Utility functions shared by the fetch, extraction and normalization stages.
//!
//! - **URL validation**: SSRF guard for inbound URLs and href resolution
//! - **Text processing**: whitespace/markup cleanup, summaries, emoji and HTML
//!   formatting for the response
//!
//! # Examples
//!
//! ```
//! use rssify::util::{collapse_whitespace, summarize, validate_url};
//!
//! let url = validate_url("https://example.com/blog", false).unwrap();
//! assert_eq!(collapse_whitespace("  a \n b "), "a b");
//! assert_eq!(summarize("<p>Short</p>", 200), "Short");
//! # let _ = url;
//! ```

mod text;
mod url_validator;

pub use text::{
    collapse_whitespace, demojize, minify_html, strip_control_chars, strip_tags, summarize,
    truncate_chars, unescape_html, ELLIPSIS,
};
pub use url_validator::{resolve_link, validate_url, UrlValidationError};
