//! Rendering of fetch results into tool responses

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::engine::FetchResult;
use crate::request::OutputFormat;

/// Returned when the requested field is missing from a successful fetch
pub const NO_CONTENT: &str = "No content available";

/// Render a successful fetch in the requested format
///
/// Failed results never reach this function; the dispatcher reports them.
pub fn render(
    result: &FetchResult,
    url: &str,
    format: OutputFormat,
) -> Result<String, serde_json::Error> {
    let content = match format {
        OutputFormat::Markdown => result
            .markdown
            .as_deref()
            .filter(|markdown| !markdown.is_empty())
            .unwrap_or(NO_CONTENT)
            .to_string(),
        OutputFormat::Html => result.html.as_deref().unwrap_or(NO_CONTENT).to_string(),
        OutputFormat::Text => result
            .cleaned_html
            .as_deref()
            .unwrap_or(NO_CONTENT)
            .to_string(),
        OutputFormat::Json => {
            let envelope = JsonEnvelope {
                url,
                title: result.title.as_deref().unwrap_or_default(),
                markdown: result.markdown.as_deref().unwrap_or_default(),
                html: result.html.as_deref().unwrap_or_default(),
                metadata: &result.metadata,
            };
            serde_json::to_string_pretty(&envelope)?
        }
    };
    Ok(content)
}

/// Body of a `json` response; field order is the serialized key order
#[derive(Debug, Serialize)]
struct JsonEnvelope<'a> {
    url: &'a str,
    title: &'a str,
    markdown: &'a str,
    html: &'a str,
    metadata: &'a BTreeMap<String, String>,
}

/// Page facts returned by `get_page_metadata`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub url: String,
    pub title: String,
    pub description: String,
    pub keywords: String,
    pub language: String,
    pub author: String,
    pub links_count: usize,
    pub media_count: usize,
    pub word_count: usize,
    pub status_code: Option<u16>,
    pub response_headers: BTreeMap<String, String>,
}

impl MetadataRecord {
    /// Build the record for a successful fetch of `url`
    pub fn from_result(result: &FetchResult, url: &str) -> Self {
        let meta = |key: &str| result.metadata.get(key).cloned().unwrap_or_default();

        Self {
            url: url.to_string(),
            title: result.title.clone().unwrap_or_default(),
            description: meta("description"),
            keywords: meta("keywords"),
            language: meta("language"),
            author: meta("author"),
            links_count: result.links.len(),
            media_count: result.media.len(),
            word_count: word_count(result.markdown.as_deref().unwrap_or_default()),
            status_code: result.status_code,
            response_headers: result.response_headers.clone(),
        }
    }

    /// Pretty JSON, as sent to the client
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Number of whitespace-separated tokens
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
