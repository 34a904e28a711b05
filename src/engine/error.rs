//! Error types for the fetch engine boundary

use thiserror::Error;

/// Error type for fetch engine operations
///
/// A page that loads but reports a failure is not an error here; it comes back
/// as a `FetchResult` with `success == false`.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine could not be started
    #[error("failed to start fetch engine: {0}")]
    Construct(String),

    /// HTML parsing error
    #[error("HTML parsing error: {0}")]
    HtmlParse(String),

    /// URL parsing error
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// A background task failed
    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// Writing diagnostics failed
    #[error("diagnostic output error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}
