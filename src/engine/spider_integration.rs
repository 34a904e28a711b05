//! Integration with spider library for fetching pages

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use async_trait::async_trait;
use spider::page::Page;
use spider::website::Website;
use spider_utils::spider_transformations::transformation::content::{
    ReturnFormat, TransformConfig, transform_content,
};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::engine::content_extraction::{
    ExtractedPage, NON_CONTENT_SELECTORS, apply_word_threshold, clean_html, extract_metadata,
};
use crate::engine::{BrowserConfig, EngineError, EngineFactory, FetchEngine, FetchResult, RunConfig};
use crate::output::DiagnosticWriter;

/// Builds `SpiderEngine`s
#[derive(Debug, Clone, Default)]
pub struct SpiderEngineFactory;

#[async_trait]
impl EngineFactory for SpiderEngineFactory {
    #[instrument(skip(self, diagnostics))]
    async fn construct(
        &self,
        config: &BrowserConfig,
        mut diagnostics: DiagnosticWriter,
    ) -> Result<Arc<dyn FetchEngine>, EngineError> {
        if config.user_agent.trim().is_empty() {
            return Err(EngineError::Construct("user agent must not be empty".to_string()));
        }
        if config.viewport_width == 0 || config.viewport_height == 0 {
            return Err(EngineError::Construct(format!(
                "invalid viewport {}x{}",
                config.viewport_width, config.viewport_height
            )));
        }

        writeln!(
            diagnostics,
            "[INIT].... → spider engine (headless: {}, viewport: {}x{}, args: {})",
            config.headless,
            config.viewport_width,
            config.viewport_height,
            config.extra_args.join(" ")
        )?;
        debug!("Spider engine config: {:?}", config);

        Ok(Arc::new(SpiderEngine::new(config.clone())))
    }
}

/// A fetch engine that loads one page per run with spider
#[derive(Debug)]
pub struct SpiderEngine {
    config: BrowserConfig,
    closed: AtomicBool,
}

impl SpiderEngine {
    pub fn new(config: BrowserConfig) -> Self {
        Self {
            config,
            closed: AtomicBool::new(false),
        }
    }

    /// Fetch the page at `url`, returning `None` when nothing came back
    async fn fetch_page(&self, url: &Url, config: &RunConfig) -> Result<Option<Page>, EngineError> {
        let mut website = Website::new(url.as_str());
        website
            .configuration
            .with_respect_robots_txt(config.respect_robots_txt)
            .with_user_agent(Some(self.config.user_agent.as_str()))
            .with_request_timeout(Some(config.timeout))
            .with_depth(0)
            .with_limit(1);

        let mut rx = website.subscribe(16);
        let handle = tokio::spawn(async move {
            let mut first = None;
            while let Ok(page) = rx.recv().await {
                debug!("Received page: {}", page.get_url());
                if first.is_none() {
                    first = Some(page);
                }
            }
            first
        });

        website.crawl().await;
        website.unsubscribe();
        Ok(handle.await?)
    }
}

#[async_trait]
impl FetchEngine for SpiderEngine {
    #[instrument(skip_all, fields(url = %url))]
    async fn run(
        &self,
        url: &Url,
        config: &RunConfig,
        mut diagnostics: DiagnosticWriter,
    ) -> Result<FetchResult, EngineError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(EngineError::Other("fetch engine is closed".to_string()));
        }

        let started = Instant::now();
        writeln!(diagnostics, "[FETCH]... ↓ {}", url)?;

        let Some(page) = self.fetch_page(url, config).await? else {
            writeln!(diagnostics, "[ERROR]... × {} | no response", url)?;
            return Ok(FetchResult::failure("No response received"));
        };

        let status = page.status_code;
        if !status.is_success() {
            writeln!(diagnostics, "[ERROR]... × {} | {}", url, status)?;
            return Ok(FetchResult {
                status_code: Some(status.as_u16()),
                ..FetchResult::failure(format!("HTTP {}", status))
            });
        }

        let html = page.get_html();
        let transform_config = TransformConfig {
            return_format: ReturnFormat::Markdown,
            readability: true,
            main_content: true,
            ..Default::default()
        };
        let markdown = transform_content(&page, &transform_config, &None, &None, &None);
        let markdown = apply_word_threshold(&markdown, config.word_count_threshold);

        let extracted = extract_metadata(page.get_url(), &html).unwrap_or_else(|e| {
            warn!("Error extracting metadata: {:?}", e);
            ExtractedPage::default()
        });

        let metadata = extracted.merged_metadata();

        let result = FetchResult {
            success: true,
            error_message: None,
            markdown: Some(markdown).filter(|markdown| !markdown.is_empty()),
            cleaned_html: Some(clean_html(&html, NON_CONTENT_SELECTORS)),
            html: Some(html),
            title: extracted.title,
            links: extracted.links,
            media: extracted.media,
            status_code: Some(status.as_u16()),
            metadata,
            response_headers: response_headers(&page),
        };

        writeln!(
            diagnostics,
            "[COMPLETE] ● {} | ✓ | ⏱: {:.2}s",
            url,
            started.elapsed().as_secs_f64()
        )?;
        info!("Fetched {} ({})", url, status);
        Ok(result)
    }

    async fn close(&self) -> Result<(), EngineError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

fn response_headers(page: &Page) -> BTreeMap<String, String> {
    page.headers
        .as_ref()
        .map(|headers| {
            headers
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|value| (name.as_str().to_string(), value.to_string()))
                })
                .collect()
        })
        .unwrap_or_default()
}
