//! Error types for the crawler MCP server
//!
//! Every failure a tool call can produce is a [`CrawlerError`]. Its `Display`
//! output is the exact single-line text returned to the MCP client, and each
//! variant carries a stable prefix so callers can match on the category.

use std::fmt;

use thiserror::Error;

/// Result type for crawler operations
pub type Result<T> = std::result::Result<T, Error>;

/// Alias kept for callers that prefer the short name
pub type Error = CrawlerError;

/// The remote-callable operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// `crawl_url`: fetch a page and return its content
    CrawlUrl,
    /// `get_page_metadata`: fetch a page and return a metadata record
    PageMetadata,
}

impl Operation {
    /// The tool name published in the MCP catalog
    pub fn tool_name(self) -> &'static str {
        match self {
            Operation::CrawlUrl => "crawl_url",
            Operation::PageMetadata => "get_page_metadata",
        }
    }

    /// Resolve a tool name, accepting the legacy `get_metadata` spelling
    pub fn from_tool_name(name: &str) -> Option<Self> {
        match name {
            "crawl_url" => Some(Operation::CrawlUrl),
            "get_page_metadata" | "get_metadata" => Some(Operation::PageMetadata),
            _ => None,
        }
    }

    fn failure_prefix(self) -> &'static str {
        match self {
            Operation::CrawlUrl => "Error crawling",
            Operation::PageMetadata => "Error retrieving metadata from",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tool_name())
    }
}

/// Failure category, used by tests and logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidUrl,
    InvalidFormat,
    DelegateUnavailable,
    FetchFailed,
    Internal,
    UnknownOperation,
}

/// Error type for crawler operations
#[derive(Debug, Error)]
pub enum CrawlerError {
    /// The `url` argument is missing or does not parse into an absolute URL
    #[error("{}", describe_invalid_url(.url.as_deref()))]
    InvalidUrl {
        /// The rejected input, `None` when the argument was absent
        url: Option<String>,
    },

    /// The `output_format` argument is not one of the supported formats
    #[error("Error: Invalid output format: {0}")]
    InvalidFormat(String),

    /// The fetch engine could not be constructed
    #[error("Error: Fetch engine unavailable: {0}")]
    DelegateUnavailable(String),

    /// The fetch engine ran but reported a failure
    #[error("{prefix} {url}: {message}", prefix = .operation.failure_prefix())]
    FetchFailed {
        operation: Operation,
        url: String,
        message: String,
    },

    /// Anything else that went wrong while serving a request
    #[error("Exception while {operation} for {url}: {message}")]
    Internal {
        operation: Operation,
        url: String,
        message: String,
    },

    /// The requested tool does not exist
    #[error("Unknown tool: {0}")]
    UnknownOperation(String),
}

fn describe_invalid_url(url: Option<&str>) -> String {
    match url {
        Some(url) => format!("Error: Invalid URL format: {}", url),
        None => "Error: URL is required".to_string(),
    }
}

impl CrawlerError {
    /// Build an internal error from any displayable fault
    pub fn internal(operation: Operation, url: impl Into<String>, err: impl fmt::Display) -> Self {
        CrawlerError::Internal {
            operation,
            url: url.into(),
            message: err.to_string(),
        }
    }

    /// The failure category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            CrawlerError::InvalidUrl { .. } => ErrorKind::InvalidUrl,
            CrawlerError::InvalidFormat(_) => ErrorKind::InvalidFormat,
            CrawlerError::DelegateUnavailable(_) => ErrorKind::DelegateUnavailable,
            CrawlerError::FetchFailed { .. } => ErrorKind::FetchFailed,
            CrawlerError::Internal { .. } => ErrorKind::Internal,
            CrawlerError::UnknownOperation(_) => ErrorKind::UnknownOperation,
        }
    }
}
