//! # Fetch Engine
//!
//! The crawler delegates all fetching, rendering, and extraction to a fetch
//! engine. This module defines the engine boundary and owns the one live
//! engine instance.
//!
//! ## Key Components
//!
//! - `FetchEngine` / `EngineFactory`: the traits an engine implements
//! - `FetchResult`: what a fetch returns, with every optional field defaulted
//! - `EngineHandle`: lazily constructs the engine once and shares it
//! - `SpiderEngine`: the default engine, built on the spider crawler
//!
//! Construction and every fetch run under a `QuietGuard`, so anything the
//! engine writes to its diagnostic writer stays off the protocol channel.

mod config;
mod content_extraction;
mod error;
#[cfg(test)]
pub(crate) mod mock;
mod spider_integration;

pub use config::{
    BrowserConfig, BrowserConfigBuilder, DEFAULT_USER_AGENT, DEFAULT_WORD_COUNT_THRESHOLD,
    RunConfig, RunConfigBuilder,
};
pub use content_extraction::{
    ExtractedPage, NON_CONTENT_SELECTORS, apply_word_threshold, clean_html, extract_metadata,
};
pub use error::EngineError;
pub use spider_integration::{SpiderEngine, SpiderEngineFactory};

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{error, info, instrument};
use url::Url;

use crate::error::CrawlerError;
use crate::output::{DiagnosticWriter, OutputChannels};

/// The outcome of fetching one page
///
/// Absent strings are `None` and absent collections are empty; engines decide
/// this once so formatting never has to probe for fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResult {
    /// Whether the page was fetched
    pub success: bool,

    /// Why the fetch failed, when it did
    pub error_message: Option<String>,

    /// Page content converted to Markdown
    pub markdown: Option<String>,

    /// Raw HTML as served
    pub html: Option<String>,

    /// HTML with scripts, styles and other non-content elements removed
    pub cleaned_html: Option<String>,

    /// Document title
    pub title: Option<String>,

    /// Absolute URLs of links on the page
    pub links: Vec<String>,

    /// Absolute URLs of images, video and audio on the page
    pub media: Vec<String>,

    /// HTTP status code
    pub status_code: Option<u16>,

    /// `<meta>` tags and document attributes, keyed by name
    pub metadata: BTreeMap<String, String>,

    /// HTTP response headers
    pub response_headers: BTreeMap<String, String>,
}

impl FetchResult {
    /// A failed fetch with the given message
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_message: Some(message.into()),
            ..Default::default()
        }
    }

    /// The failure message, or a generic one when the engine gave none
    pub fn error_text(&self) -> &str {
        self.error_message.as_deref().unwrap_or("Unknown error")
    }
}

/// A constructed fetch engine
#[async_trait]
pub trait FetchEngine: Send + Sync {
    /// Optional warm-up after construction
    async fn warmup(&self, _diagnostics: DiagnosticWriter) -> Result<(), EngineError> {
        Ok(())
    }

    /// Fetch one page
    async fn run(
        &self,
        url: &Url,
        config: &RunConfig,
        diagnostics: DiagnosticWriter,
    ) -> Result<FetchResult, EngineError>;

    /// Release engine resources
    async fn close(&self) -> Result<(), EngineError>;
}

/// Creates fetch engines
#[async_trait]
pub trait EngineFactory: Send + Sync {
    async fn construct(
        &self,
        config: &BrowserConfig,
        diagnostics: DiagnosticWriter,
    ) -> Result<Arc<dyn FetchEngine>, EngineError>;
}

/// Owner of the single live fetch engine
///
/// The engine is built on the first `acquire` and shared afterwards. The slot
/// lock is held across construction, so concurrent first calls build it once.
pub struct EngineHandle {
    factory: Arc<dyn EngineFactory>,
    config: BrowserConfig,
    channels: OutputChannels,
    engine: Mutex<Option<Arc<dyn FetchEngine>>>,
}

impl EngineHandle {
    /// Create a handle; nothing is constructed until `acquire`
    pub fn new(
        factory: Arc<dyn EngineFactory>,
        config: BrowserConfig,
        channels: OutputChannels,
    ) -> Self {
        Self {
            factory,
            config,
            channels,
            engine: Mutex::new(None),
        }
    }

    /// The channels engine diagnostics are written to
    pub fn channels(&self) -> &OutputChannels {
        &self.channels
    }

    /// Get the engine, constructing it on first use
    ///
    /// A failed construction leaves the slot empty so the next call retries.
    #[instrument(skip(self))]
    pub async fn acquire(&self) -> Result<Arc<dyn FetchEngine>, CrawlerError> {
        let mut slot = self.engine.lock().await;

        if let Some(engine) = slot.as_ref() {
            return Ok(engine.clone());
        }

        let engine = {
            let _quiet = self.channels.suppress();
            let engine = self
                .factory
                .construct(&self.config, self.channels.writer())
                .await
                .map_err(|e| {
                    error!("Failed to create fetch engine: {}", e);
                    CrawlerError::DelegateUnavailable(e.to_string())
                })?;
            if let Err(e) = engine.warmup(self.channels.writer()).await {
                error!("Fetch engine warm-up failed: {}", e);
                if let Err(e) = engine.close().await {
                    error!("Error closing fetch engine: {}", e);
                }
                return Err(CrawlerError::DelegateUnavailable(e.to_string()));
            }
            engine
        };

        info!("Fetch engine created successfully");
        *slot = Some(engine.clone());
        Ok(engine)
    }

    /// Close the engine, if any, and clear the slot
    ///
    /// Close failures are logged, not returned.
    #[instrument(skip(self))]
    pub async fn release(&self) {
        let engine = self.engine.lock().await.take();
        if let Some(engine) = engine {
            match engine.close().await {
                Ok(()) => info!("Fetch engine closed"),
                Err(e) => error!("Error closing fetch engine: {}", e),
            }
        }
    }

    /// Whether an engine is currently live
    pub async fn is_initialized(&self) -> bool {
        self.engine.lock().await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockEngineFactory;
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Write;
    use std::time::Duration;

    fn handle(factory: &MockEngineFactory) -> EngineHandle {
        EngineHandle::new(
            Arc::new(factory.clone()),
            BrowserConfig::default(),
            OutputChannels::new(crate::output::DiagnosticTarget::Discard),
        )
    }

    #[tokio::test]
    async fn test_acquire_is_idempotent() {
        let factory = MockEngineFactory::new();
        let handle = handle(&factory);

        let first = handle.acquire().await.unwrap();
        let second = handle.acquire().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(factory.constructions(), 1);
        assert_eq!(factory.warmups(), 1);
    }

    #[tokio::test]
    async fn test_release_then_acquire_rebuilds() {
        let factory = MockEngineFactory::new();
        let handle = handle(&factory);

        let first = handle.acquire().await.unwrap();
        handle.release().await;
        assert!(!handle.is_initialized().await);
        assert_eq!(factory.closes(), 1);

        let second = handle.acquire().await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(factory.constructions(), 2);
    }

    #[tokio::test]
    async fn test_release_without_engine_is_noop() {
        let factory = MockEngineFactory::new();
        let handle = handle(&factory);
        handle.release().await;
        assert_eq!(factory.closes(), 0);
    }

    #[tokio::test]
    async fn test_failed_construction_can_retry() {
        let factory = MockEngineFactory::new();
        factory.fail_constructions(1);
        let handle = handle(&factory);

        let err = handle.acquire().await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::DelegateUnavailable);
        assert!(!handle.is_initialized().await);

        handle.acquire().await.unwrap();
        assert!(handle.is_initialized().await);
        assert_eq!(factory.constructions(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_first_acquire_constructs_once() {
        let factory = MockEngineFactory::new();
        factory.set_construct_delay(Duration::from_millis(50));
        let handle = Arc::new(handle(&factory));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let handle = handle.clone();
                tokio::spawn(async move { handle.acquire().await.map(|_| ()) })
            })
            .collect();

        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert_eq!(factory.constructions(), 1);
    }

    #[tokio::test]
    async fn test_construction_output_is_suppressed() {
        let factory = MockEngineFactory::new();
        let (channels, buffer) = OutputChannels::capture();
        let handle = EngineHandle::new(Arc::new(factory.clone()), BrowserConfig::default(), channels);

        handle.acquire().await.unwrap();
        assert!(buffer.lock().unwrap().is_empty());
        assert!(!handle.channels().is_suppressed());

        writeln!(handle.channels().writer(), "visible").unwrap();
        assert_eq!(buffer.lock().unwrap().as_slice(), b"visible\n");
    }

    #[test]
    fn test_failure_result() {
        let result = FetchResult::failure("timeout");
        assert!(!result.success);
        assert_eq!(result.error_text(), "timeout");
        assert_eq!(FetchResult::default().error_text(), "Unknown error");
    }
}
