use std::path::{Path, PathBuf};

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// File the server appends its log to
pub const LOG_FILE_NAME: &str = "cs-crawler-mcp.log";

/// Default log directory, relative to the working directory
pub const DEFAULT_LOG_DIR: &str = ".cs-crawler-mcp";

/// Create the log directory if needed and return the log file path
pub fn prepare_log_dir(log_dir: &Path) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(log_dir)?;
    Ok(log_dir.join(LOG_FILE_NAME))
}

/// Route all tracing output to the log file
///
/// Stdout carries the MCP protocol, so nothing is ever logged there.
pub fn setup_logging(log_dir: &Path) -> anyhow::Result<PathBuf> {
    let log_file = prepare_log_dir(log_dir)?;

    // Never rotates, so the file is append-only across restarts
    let file_appender = RollingFileAppender::new(Rotation::NEVER, log_dir, LOG_FILE_NAME);

    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .try_init()?;

    Ok(log_file)
}
