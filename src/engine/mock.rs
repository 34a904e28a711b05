//! # Mock Fetch Engine for Testing
//!
//! Provides a `MockEngineFactory` whose engines return a scripted
//! `FetchResult`, fail, or panic, and which counts constructions, warm-ups,
//! runs and closes. Engines write to their diagnostic writer on every call so
//! tests can check suppression.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use url::Url;

use super::{BrowserConfig, EngineError, EngineFactory, FetchEngine, FetchResult, RunConfig};
use crate::output::DiagnosticWriter;

/// What a mock engine does when `run` is called
#[derive(Debug, Clone)]
pub enum MockBehavior {
    Respond(FetchResult),
    Fail(String),
    Panic(String),
}

#[derive(Debug, Default)]
struct Counters {
    constructions: AtomicUsize,
    warmups: AtomicUsize,
    runs: AtomicUsize,
    closes: AtomicUsize,
    failing_constructions: AtomicUsize,
    panicking_constructions: AtomicUsize,
}

/// A factory producing scripted engines
#[derive(Debug, Clone)]
pub struct MockEngineFactory {
    counters: Arc<Counters>,
    behavior: Arc<Mutex<MockBehavior>>,
    construct_delay: Arc<Mutex<Option<Duration>>>,
    last_run_config: Arc<Mutex<Option<RunConfig>>>,
}

impl MockEngineFactory {
    /// Engines start out returning an empty successful result
    pub fn new() -> Self {
        Self {
            counters: Arc::new(Counters::default()),
            behavior: Arc::new(Mutex::new(MockBehavior::Respond(FetchResult {
                success: true,
                ..Default::default()
            }))),
            construct_delay: Arc::new(Mutex::new(None)),
            last_run_config: Arc::new(Mutex::new(None)),
        }
    }

    /// Sets what subsequent runs do
    pub async fn set_behavior(&self, behavior: MockBehavior) {
        *self.behavior.lock().await = behavior;
    }

    /// Helper to script a result
    pub async fn set_result(&self, result: FetchResult) {
        self.set_behavior(MockBehavior::Respond(result)).await;
    }

    /// Make the next `count` constructions fail
    pub fn fail_constructions(&self, count: usize) {
        self.counters
            .failing_constructions
            .store(count, Ordering::SeqCst);
    }

    /// Make the next `count` constructions panic
    pub fn panic_constructions(&self, count: usize) {
        self.counters
            .panicking_constructions
            .store(count, Ordering::SeqCst);
    }

    /// Slow construction down, to widen race windows
    pub fn set_construct_delay(&self, delay: Duration) {
        if let Ok(mut slot) = self.construct_delay.try_lock() {
            *slot = Some(delay);
        }
    }

    pub fn constructions(&self) -> usize {
        self.counters.constructions.load(Ordering::SeqCst)
    }

    pub fn warmups(&self) -> usize {
        self.counters.warmups.load(Ordering::SeqCst)
    }

    pub fn runs(&self) -> usize {
        self.counters.runs.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.counters.closes.load(Ordering::SeqCst)
    }

    /// The config passed to the most recent run
    pub async fn last_run_config(&self) -> Option<RunConfig> {
        self.last_run_config.lock().await.clone()
    }
}

impl Default for MockEngineFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EngineFactory for MockEngineFactory {
    async fn construct(
        &self,
        _config: &BrowserConfig,
        mut diagnostics: DiagnosticWriter,
    ) -> Result<Arc<dyn FetchEngine>, EngineError> {
        let delay = *self.construct_delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.counters.constructions.fetch_add(1, Ordering::SeqCst);
        writeln!(diagnostics, "[INIT] starting mock browser")?;

        let failing = &self.counters.failing_constructions;
        if failing
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(EngineError::Construct("browser executable not found".to_string()));
        }

        let panicking = &self.counters.panicking_constructions;
        if panicking
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            panic!("browser process crashed during launch");
        }

        Ok(Arc::new(MockEngine {
            factory: self.clone(),
        }))
    }
}

struct MockEngine {
    factory: MockEngineFactory,
}

#[async_trait]
impl FetchEngine for MockEngine {
    async fn warmup(&self, mut diagnostics: DiagnosticWriter) -> Result<(), EngineError> {
        self.factory.counters.warmups.fetch_add(1, Ordering::SeqCst);
        writeln!(diagnostics, "[INIT] warming up")?;
        Ok(())
    }

    async fn run(
        &self,
        url: &Url,
        config: &RunConfig,
        mut diagnostics: DiagnosticWriter,
    ) -> Result<FetchResult, EngineError> {
        self.factory.counters.runs.fetch_add(1, Ordering::SeqCst);
        *self.factory.last_run_config.lock().await = Some(config.clone());
        writeln!(diagnostics, "[FETCH] {}", url)?;

        let behavior = self.factory.behavior.lock().await.clone();
        match behavior {
            MockBehavior::Respond(result) => Ok(result),
            MockBehavior::Fail(message) => Err(EngineError::Other(message)),
            MockBehavior::Panic(message) => panic!("{}", message),
        }
    }

    async fn close(&self) -> Result<(), EngineError> {
        self.factory.counters.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
