//! rssify turns any URL into a normalized list of feed entries.
//!
//! RSS, Atom and JSON Feed sources are parsed directly. Plain HTML pages go
//! through a selector-driven extraction engine (or, optionally, a local LLM)
//! that finds repeated article blocks. Either way every entry ends up with a
//! usable title, an absolute link and a newest-first position in the list.
//!
//! The binary exposes this over HTTP (see [`server`]); the library surface is
//! what the integration tests drive.

pub mod config;
pub mod extract;
pub mod feed;
pub mod normalize;
pub mod pipeline;
pub mod server;
pub mod title;
pub mod util;
