//! # cs-crawler-mcp
//!
//! Runs the crawler MCP server on stdio. Stdout is reserved for the protocol:
//! logs go to a file and fetch engine diagnostics go to stderr, suppressed
//! while a request is being served.

mod logging;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use cs_crawler_mcp::dispatcher::Dispatcher;
use cs_crawler_mcp::engine::{
    BrowserConfig, DEFAULT_USER_AGENT, DEFAULT_WORD_COUNT_THRESHOLD, EngineHandle, RunConfig,
    SpiderEngineFactory,
};
use cs_crawler_mcp::mcp::{self, CrawlerServer};
use cs_crawler_mcp::output::OutputChannels;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "An MCP server that crawls web pages", long_about = None)]
struct Cli {
    /// Directory for the log file
    #[arg(long, default_value = logging::DEFAULT_LOG_DIR)]
    log_dir: PathBuf,

    /// Run the browser with a visible window (browser-backed engines only;
    /// the default spider engine fetches over plain HTTP and ignores it)
    #[arg(long)]
    headful: bool,

    /// User agent to use for requests
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    user_agent: String,

    /// Viewport width in pixels (browser-backed engines only)
    #[arg(long, default_value = "1920")]
    viewport_width: u32,

    /// Viewport height in pixels (browser-backed engines only)
    #[arg(long, default_value = "1080")]
    viewport_height: u32,

    /// Minimum words per paragraph kept by crawl_url (0 keeps everything)
    #[arg(long, default_value_t = DEFAULT_WORD_COUNT_THRESHOLD)]
    word_count_threshold: usize,

    /// Respect robots.txt
    #[arg(long)]
    respect_robots_txt: bool,

    /// Request timeout in seconds
    #[arg(long, default_value = "30")]
    timeout_secs: u64,
}

impl Cli {
    fn browser_config(&self) -> BrowserConfig {
        BrowserConfig::builder()
            .headless(!self.headful)
            .user_agent(self.user_agent.clone())
            .viewport(self.viewport_width, self.viewport_height)
            .sandbox_disabled(true)
            .build()
    }

    fn run_config(&self) -> RunConfig {
        RunConfig::builder()
            .word_count_threshold(self.word_count_threshold)
            .respect_robots_txt(self.respect_robots_txt)
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_file = logging::setup_logging(&cli.log_dir)?;
    info!("Starting CS Crawler MCP, logging to {}", log_file.display());

    let handle = Arc::new(EngineHandle::new(
        Arc::new(SpiderEngineFactory),
        cli.browser_config(),
        OutputChannels::stderr(),
    ));
    let dispatcher = Arc::new(Dispatcher::new(handle.clone(), cli.run_config()));
    let server = CrawlerServer::new(dispatcher);

    let result = tokio::select! {
        result = mcp::run(server) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Server stopped by user");
            Ok(())
        }
    };

    if let Err(e) = &result {
        error!("Server error: {:#}", e);
    }

    handle.release().await;
    info!("Server cleanup completed");
    result
}
