//! Validation of tool-call arguments

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::error::CrawlerError;

/// Tool-call arguments as received from the transport
pub type JsonObject = serde_json::Map<String, Value>;

/// Encoding of the content returned by `crawl_url`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Markdown,
    Html,
    Text,
    Json,
}

impl OutputFormat {
    /// Every supported format, in catalog order
    pub const ALL: [OutputFormat; 4] = [
        OutputFormat::Markdown,
        OutputFormat::Html,
        OutputFormat::Text,
        OutputFormat::Json,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Markdown => "markdown",
            OutputFormat::Html => "html",
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = CrawlerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OutputFormat::ALL
            .into_iter()
            .find(|format| format.as_str() == s)
            .ok_or_else(|| CrawlerError::InvalidFormat(s.to_string()))
    }
}

/// A validated request, constructed once per call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// The parsed URL handed to the fetch engine
    pub url: Url,

    /// The URL exactly as the caller sent it, used in responses
    pub source: String,

    /// Requested encoding of the content
    pub output_format: OutputFormat,
}

/// Validate tool-call arguments without touching the network
///
/// `url` must be a string that parses into an absolute URL with a scheme and a
/// host. `output_format` is optional and defaults to Markdown.
pub fn validate(args: &JsonObject) -> Result<FetchRequest, CrawlerError> {
    let request = validate_url(args)?;

    let output_format = match args.get("output_format") {
        None | Some(Value::Null) => OutputFormat::default(),
        Some(Value::String(format)) => format.parse()?,
        Some(other) => return Err(CrawlerError::InvalidFormat(other.to_string())),
    };

    Ok(FetchRequest {
        output_format,
        ..request
    })
}

/// Validate only the `url` argument; `output_format` is ignored and left at
/// its default
pub fn validate_url(args: &JsonObject) -> Result<FetchRequest, CrawlerError> {
    let source = match args.get("url") {
        Some(Value::String(url)) if !url.is_empty() => url.clone(),
        Some(Value::String(_)) | Some(Value::Null) | None => {
            return Err(CrawlerError::InvalidUrl { url: None });
        }
        Some(other) => {
            return Err(CrawlerError::InvalidUrl {
                url: Some(other.to_string()),
            });
        }
    };

    let url = parse_url(&source)?;

    Ok(FetchRequest {
        url,
        source,
        output_format: OutputFormat::default(),
    })
}

/// Parse a URL, requiring a non-empty scheme and host
pub fn parse_url(raw: &str) -> Result<Url, CrawlerError> {
    let invalid = || CrawlerError::InvalidUrl {
        url: Some(raw.to_string()),
    };

    let url = Url::parse(raw).map_err(|_| invalid())?;
    let has_host = url.host_str().is_some_and(|host| !host.is_empty());
    if url.scheme().is_empty() || !has_host {
        return Err(invalid());
    }
    Ok(url)
}
