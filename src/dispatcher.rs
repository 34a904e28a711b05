//! Operation dispatch
//!
//! [`Dispatcher::call`] maps a tool name and its arguments to a handler and
//! always produces a single text response. Validation failures, engine
//! failures, and unexpected faults (including panics inside the engine) are all
//! turned into text here, so one bad request never takes the process down.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{error, info, instrument, warn};

use crate::engine::{EngineHandle, FetchResult, RunConfig};
use crate::error::{CrawlerError, Operation};
use crate::format::{MetadataRecord, render};
use crate::request::{FetchRequest, JsonObject, validate, validate_url};

/// Routes tool calls to the fetch engine
pub struct Dispatcher {
    engine: Arc<EngineHandle>,
    crawl_config: RunConfig,
    metadata_config: RunConfig,
}

impl Dispatcher {
    /// Create a dispatcher; metadata lookups use `run_config` without a
    /// word-count threshold
    pub fn new(engine: Arc<EngineHandle>, run_config: RunConfig) -> Self {
        Self {
            metadata_config: run_config.for_metadata(),
            crawl_config: run_config,
            engine,
        }
    }

    /// The engine handle this dispatcher fetches through
    pub fn engine(&self) -> &Arc<EngineHandle> {
        &self.engine
    }

    /// Handle one tool call, returning its text response
    #[instrument(skip(self, args))]
    pub async fn call(&self, name: &str, args: &JsonObject) -> String {
        let Some(operation) = Operation::from_tool_name(name) else {
            warn!("Unknown tool requested: {}", name);
            return CrawlerError::UnknownOperation(name.to_string()).to_string();
        };

        match self.dispatch(operation, args).await {
            Ok(text) => text,
            Err(e) => {
                error!(kind = ?e.kind(), "{}", e);
                e.to_string()
            }
        }
    }

    async fn dispatch(&self, operation: Operation, args: &JsonObject) -> Result<String, CrawlerError> {
        let request = match operation {
            Operation::CrawlUrl => validate(args)?,
            Operation::PageMetadata => validate_url(args)?,
        };
        let result = self.fetch(operation, &request).await?;

        if !result.success {
            return Err(CrawlerError::FetchFailed {
                operation,
                url: request.source,
                message: result.error_text().to_string(),
            });
        }

        let text = match operation {
            Operation::CrawlUrl => render(&result, &request.source, request.output_format),
            Operation::PageMetadata => {
                MetadataRecord::from_result(&result, &request.source).to_json()
            }
        }
        .map_err(|e| CrawlerError::internal(operation, &request.source, e))?;

        match operation {
            Operation::CrawlUrl => info!(
                "Successfully crawled {} with {} format",
                request.source, request.output_format
            ),
            Operation::PageMetadata => info!("Successfully extracted metadata for {}", request.source),
        }
        Ok(text)
    }

    /// Acquire the engine and run it for a validated request with output
    /// suppressed
    ///
    /// Panics anywhere on this path, construction included, become `Internal`.
    async fn fetch(
        &self,
        operation: Operation,
        request: &FetchRequest,
    ) -> Result<FetchResult, CrawlerError> {
        let config = match operation {
            Operation::CrawlUrl => &self.crawl_config,
            Operation::PageMetadata => &self.metadata_config,
        };

        let outcome = AssertUnwindSafe(async {
            let engine = self.engine.acquire().await?;
            let channels = self.engine.channels();
            let _quiet = channels.suppress();
            engine
                .run(&request.url, config, channels.writer())
                .await
                .map_err(|e| CrawlerError::internal(operation, &request.source, e))
        })
        .catch_unwind()
        .await;

        outcome.unwrap_or_else(|panic| {
            Err(CrawlerError::internal(
                operation,
                &request.source,
                panic_message(panic.as_ref()),
            ))
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "fetch engine panicked".to_string()
    }
}
