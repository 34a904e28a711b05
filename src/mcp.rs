//! Model Context Protocol (MCP) server implementation
//!
//! Publishes the two crawler tools over rmcp and forwards every `tools/call`
//! to the [`Dispatcher`]. Tool results are always a single text item; errors
//! are reported inside that text rather than as protocol errors, so clients see
//! the same shape for every outcome.

use std::future::Future;
use std::sync::Arc;

use rmcp::{
    Error, RoleServer, ServerHandler, ServiceExt,
    model::{
        CallToolRequestParam, CallToolResult, Content, Implementation, ListToolsResult,
        PaginatedRequestParam, ProtocolVersion, ServerCapabilities, ServerInfo, Tool,
    },
    service::RequestContext,
    transport::stdio,
};
use serde_json::json;
use tracing::{debug, info, instrument};

use crate::dispatcher::Dispatcher;
use crate::error::Operation;
use crate::request::{JsonObject, OutputFormat};

/// Name reported to clients during initialization
pub const SERVER_NAME: &str = "cs-crawler-mcp";

/// MCP handler exposing the crawler tools
#[derive(Clone)]
pub struct CrawlerServer {
    dispatcher: Arc<Dispatcher>,
}

impl CrawlerServer {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// The tool catalog returned by `tools/list`
    pub fn tools() -> Vec<Tool> {
        let formats: Vec<&str> = OutputFormat::ALL.iter().map(|format| format.as_str()).collect();

        let crawl_schema = json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The URL to crawl"
                },
                "output_format": {
                    "type": "string",
                    "enum": formats,
                    "default": OutputFormat::default().as_str(),
                    "description": "Output format (default: markdown)"
                }
            },
            "required": ["url"]
        });

        let metadata_schema = json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The URL to get metadata for"
                }
            },
            "required": ["url"]
        });

        vec![
            Tool::new(
                Operation::CrawlUrl.tool_name(),
                "Crawl a single URL and extract content in your preferred format",
                schema_object(crawl_schema),
            ),
            Tool::new(
                Operation::PageMetadata.tool_name(),
                "Get metadata about a URL: title, description, keywords, language, author, link and media counts, word count, status code and response headers",
                schema_object(metadata_schema),
            ),
        ]
    }

    /// Run one tool call through the dispatcher
    #[instrument(skip(self, arguments))]
    pub async fn call(&self, name: &str, arguments: Option<JsonObject>) -> CallToolResult {
        let arguments = arguments.unwrap_or_default();
        debug!(args = ?arguments, "Tool call received");
        let text = self.dispatcher.call(name, &arguments).await;
        CallToolResult::success(vec![Content::text(text)])
    }
}

fn schema_object(schema: serde_json::Value) -> Arc<JsonObject> {
    Arc::new(schema.as_object().cloned().unwrap_or_default())
}

impl ServerHandler for CrawlerServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            instructions: Some(
                "Use crawl_url to fetch a page as markdown, html, text or json, and get_page_metadata for a summary of a page."
                    .to_string(),
            ),
        }
    }

    fn list_tools(
        &self,
        _request: PaginatedRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<ListToolsResult, Error>> + Send + '_ {
        std::future::ready(Ok(ListToolsResult {
            next_cursor: None,
            tools: Self::tools(),
        }))
    }

    fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<CallToolResult, Error>> + Send + '_ {
        async move { Ok(self.call(&request.name, request.arguments).await) }
    }
}

/// Serve the crawler tools over stdio until the client disconnects
#[instrument(skip(server))]
pub async fn run(server: CrawlerServer) -> anyhow::Result<()> {
    info!("Starting {} v{}", SERVER_NAME, env!("CARGO_PKG_VERSION"));
    let service = server.serve(stdio()).await?;
    info!("MCP server started successfully");
    let reason = service.waiting().await?;
    info!(?reason, "MCP server stopped");
    Ok(())
}
