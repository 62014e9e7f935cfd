use crate::api::ApiConfig;
use crate::browser::config::{ConnectionOptions, LaunchOptions};
use crate::browser::session::Browser;
use crate::error::BrowserError;
use crate::tools::{Tool, ToolContext, ToolResult};
use rmcp::{
    handler::server::tool::ToolRouter,
    model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo},
    tool_handler, ErrorData as McpError, ServerHandler,
};
use std::sync::Arc;
use tokio::sync::Mutex;

/// How the server gets its browser
#[derive(Debug, Clone)]
pub enum BrowserTarget {
    Launch(LaunchOptions),
    Connect(ConnectionOptions),
}

/// MCP server exposing the intent tools.
///
/// The browser is started on the first tool call and shared by every call
/// after that, until `browser_close` shuts it down.
#[derive(Clone)]
pub struct BrowserServer {
    target: BrowserTarget,
    api: ApiConfig,
    browser: Arc<Mutex<Option<Browser>>>,
    pub(crate) tool_router: ToolRouter<Self>,
}

impl BrowserServer {
    pub fn new(target: BrowserTarget, api: ApiConfig) -> Self {
        Self { target, api, browser: Arc::new(Mutex::new(None)), tool_router: Self::tool_router() }
    }

    /// Server launching a local browser with `options`
    pub fn with_options(options: LaunchOptions, api: ApiConfig) -> Self {
        Self::new(BrowserTarget::Launch(options), api)
    }

    /// Server over an already running session
    pub fn with_browser(browser: Browser, api: ApiConfig) -> Self {
        let server = Self::with_options(LaunchOptions::default(), api);
        Self { browser: Arc::new(Mutex::new(Some(browser))), ..server }
    }

    /// The shared session, started when missing or closed
    pub async fn browser(&self) -> crate::Result<Browser> {
        let mut guard = self.browser.lock().await;
        if let Some(browser) = guard.as_ref().filter(|b| !b.is_closed()) {
            return Ok(browser.clone());
        }

        log::info!("Starting browser for MCP session");
        let browser = match &self.target {
            BrowserTarget::Launch(options) => Browser::launch(options.clone(), self.api.clone()).await?,
            BrowserTarget::Connect(options) => Browser::connect(options.clone(), self.api.clone()).await?,
        };
        *guard = Some(browser.clone());
        Ok(browser)
    }

    /// Close the shared session if one is running
    pub async fn close_browser(&self) -> crate::Result<bool> {
        match self.browser.lock().await.take() {
            Some(browser) => {
                browser.close().await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub(crate) async fn run<T: Tool>(&self, tool: T, params: T::Params) -> Result<CallToolResult, McpError> {
        let browser = self.browser().await.map_err(to_mcp_error)?;
        let context = ToolContext::new(browser);
        let result = tool.execute_typed(params, &context).await.map_err(to_mcp_error)?;
        convert_result(result)
    }
}

pub(crate) fn to_mcp_error(error: BrowserError) -> McpError {
    match error {
        BrowserError::InvalidArgument(msg) => McpError::invalid_params(msg, None),
        other => McpError::internal_error(other.to_string(), None),
    }
}

/// Convert internal ToolResult to MCP CallToolResult
pub(crate) fn convert_result(result: ToolResult) -> Result<CallToolResult, McpError> {
    if result.success {
        let text = if let Some(data) = result.data {
            serde_json::to_string_pretty(&data).unwrap_or_else(|_| data.to_string())
        } else {
            "Success".to_string()
        };
        Ok(CallToolResult::success(vec![Content::text(text)]))
    } else {
        let error_msg = result.error.unwrap_or_else(|| "Unknown error".to_string());
        Err(McpError::internal_error(error_msg, None))
    }
}

#[tool_handler]
impl ServerHandler for BrowserServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Intent-driven browser automation. Describe elements and data in plain language: \
                 'browser_goto' opens a URL (starting the browser on first use), 'browser_click' and \
                 'browser_fill' act on described elements and can verify an expected outcome, \
                 'browser_extract' and 'browser_ask' read the page."
                    .into(),
            ),
            ..Default::default()
        }
    }
}
