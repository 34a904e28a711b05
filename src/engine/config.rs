//! # Fetch Engine Configuration
//!
//! Two configuration structs are handed to the fetch engine:
//!
//! - `BrowserConfig`: fixed at construction time (headless mode, user agent,
//!   viewport, sandboxing)
//! - `RunConfig`: supplied per fetch (word-count threshold, robots.txt policy,
//!   request timeout)
//!
//! Both use the builder pattern and have defaults matching a desktop Chrome
//! session.

use std::time::Duration;

/// User agent sent with every request unless overridden
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Minimum words a Markdown paragraph needs to survive a content crawl
pub const DEFAULT_WORD_COUNT_THRESHOLD: usize = 10;

/// Configuration used once, when the engine is constructed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserConfig {
    /// Run without a visible window
    pub headless: bool,

    /// User agent to use for requests
    pub user_agent: String,

    /// Viewport width in pixels
    pub viewport_width: u32,

    /// Viewport height in pixels
    pub viewport_height: u32,

    /// Disable the browser sandbox
    pub sandbox_disabled: bool,

    /// Extra command line flags for the browser process
    pub extra_args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            viewport_width: 1920,
            viewport_height: 1080,
            sandbox_disabled: true,
            extra_args: vec![
                "--disable-dev-shm-usage".to_string(),
                "--no-sandbox".to_string(),
            ],
        }
    }
}

impl BrowserConfig {
    /// Create a new builder
    pub fn builder() -> BrowserConfigBuilder {
        BrowserConfigBuilder::new()
    }
}

/// Builder for BrowserConfig
#[derive(Debug, Default)]
pub struct BrowserConfigBuilder {
    config: BrowserConfig,
}

impl BrowserConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: BrowserConfig::default(),
        }
    }

    /// Set whether to run headless
    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    /// Set the user agent to use for requests
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set the viewport dimensions
    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.config.viewport_width = width;
        self.config.viewport_height = height;
        self
    }

    /// Set whether the sandbox is disabled
    pub fn sandbox_disabled(mut self, sandbox_disabled: bool) -> Self {
        self.config.sandbox_disabled = sandbox_disabled;
        let flag = "--no-sandbox".to_string();
        self.config.extra_args.retain(|arg| arg != &flag);
        if sandbox_disabled {
            self.config.extra_args.push(flag);
        }
        self
    }

    /// Build the configuration
    pub fn build(self) -> BrowserConfig {
        self.config
    }
}

/// Configuration supplied with each fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Markdown paragraphs with fewer words are dropped; 0 keeps everything
    pub word_count_threshold: usize,

    /// Whether to respect robots.txt
    pub respect_robots_txt: bool,

    /// Request timeout
    pub timeout: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            word_count_threshold: DEFAULT_WORD_COUNT_THRESHOLD,
            respect_robots_txt: false,
            timeout: Duration::from_secs(30),
        }
    }
}

impl RunConfig {
    /// Create a new builder
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder::new()
    }

    /// The lighter configuration used for metadata lookups
    pub fn for_metadata(&self) -> Self {
        Self {
            word_count_threshold: 0,
            ..self.clone()
        }
    }
}

/// Builder for RunConfig
#[derive(Debug, Default)]
pub struct RunConfigBuilder {
    config: RunConfig,
}

impl RunConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RunConfig::default(),
        }
    }

    pub fn word_count_threshold(mut self, threshold: usize) -> Self {
        self.config.word_count_threshold = threshold;
        self
    }

    pub fn respect_robots_txt(mut self, respect_robots_txt: bool) -> Self {
        self.config.respect_robots_txt = respect_robots_txt;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn build(self) -> RunConfig {
        self.config
    }
}
