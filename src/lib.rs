//! # cs-crawler-mcp - Web Crawling over the Model Context Protocol
//!
//! This crate implements an MCP server with two tools:
//!
//! - `crawl_url`: fetch a page and return it as Markdown, HTML, cleaned HTML,
//!   or a JSON envelope
//! - `get_page_metadata`: fetch a page and return title, description,
//!   keywords, language, author, link/media/word counts, status code and
//!   response headers
//!
//! Fetching and extraction are delegated to a fetch engine (spider by
//! default). The crate itself validates requests, owns a single lazily-built
//! engine, keeps engine output off the protocol channel, and turns every
//! outcome into a text response.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use cs_crawler_mcp::dispatcher::Dispatcher;
//! use cs_crawler_mcp::engine::{BrowserConfig, EngineHandle, RunConfig, SpiderEngineFactory};
//! use cs_crawler_mcp::output::OutputChannels;
//!
//! #[tokio::main]
//! async fn main() {
//!     let handle = Arc::new(EngineHandle::new(
//!         Arc::new(SpiderEngineFactory),
//!         BrowserConfig::default(),
//!         OutputChannels::stderr(),
//!     ));
//!     let dispatcher = Dispatcher::new(handle.clone(), RunConfig::default());
//!
//!     let mut args = serde_json::Map::new();
//!     args.insert("url".into(), "https://example.com".into());
//!     println!("{}", dispatcher.call("crawl_url", &args).await);
//!
//!     handle.release().await;
//! }
//! ```

mod error;

pub mod dispatcher;
pub mod engine;
pub mod format;
pub mod mcp;
pub mod output;
pub mod request;

pub use error::{CrawlerError, Error, ErrorKind, Operation};

/// Re-export of types module for public use
pub mod prelude {
    pub use crate::error::Error;
    pub use crate::error::Result;
}
