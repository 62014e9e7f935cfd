//! MCP (Model Context Protocol) server for intent-driven browser automation
//!
//! Every tool of [`crate::tools`] is exposed as an rmcp tool named
//! `browser_<tool>`, running against one lazily started browser session.

pub mod handler;
pub use handler::{BrowserServer, BrowserTarget};

use crate::tools::{
    ask::{AskParams, AskTool},
    click::{ClickParams, ClickTool},
    extract::{ExtractParams, ExtractTool},
    fill::{FillParams, FillTool},
    goto::{GotoParams, GotoTool},
    markdown::{MarkdownParams, MarkdownTool},
    new_tab::NewTabTool,
    press::{PressParams, PressTool},
    screenshot::{ScreenshotParams, ScreenshotTool},
    scroll::{ScrollToBottomParams, ScrollToBottomTool},
    wait_for::{WaitForParams, WaitForTool},
};
use handler::to_mcp_error;
use rmcp::{
    handler::server::wrapper::Parameters,
    model::{CallToolResult, Content},
    tool, tool_router, ErrorData as McpError,
};

#[tool_router]
impl BrowserServer {
    #[tool(description = "Navigate the active page to a URL; optionally verify the expected page was reached")]
    async fn browser_goto(&self, params: Parameters<GotoParams>) -> Result<CallToolResult, McpError> {
        self.run(GotoTool, params.0).await
    }

    #[tool(description = "Open a URL in a new tab and make it the active page")]
    async fn browser_new_tab(&self, params: Parameters<GotoParams>) -> Result<CallToolResult, McpError> {
        self.run(NewTabTool, params.0).await
    }

    #[tool(description = "Click the element matching a plain-language description")]
    async fn browser_click(&self, params: Parameters<ClickParams>) -> Result<CallToolResult, McpError> {
        self.run(ClickTool, params.0).await
    }

    #[tool(description = "Fill the field matching a plain-language description with text")]
    async fn browser_fill(&self, params: Parameters<FillParams>) -> Result<CallToolResult, McpError> {
        self.run(FillTool, params.0).await
    }

    #[tool(description = "Extract data described in plain language, optionally shaped by a JSON schema")]
    async fn browser_extract(&self, params: Parameters<ExtractParams>) -> Result<CallToolResult, McpError> {
        self.run(ExtractTool, params.0).await
    }

    #[tool(description = "Ask a question about the current page")]
    async fn browser_ask(&self, params: Parameters<AskParams>) -> Result<CallToolResult, McpError> {
        self.run(AskTool, params.0).await
    }

    #[tool(description = "Wait until a plain-language condition holds on the current page")]
    async fn browser_wait_for(&self, params: Parameters<WaitForParams>) -> Result<CallToolResult, McpError> {
        self.run(WaitForTool, params.0).await
    }

    #[tool(description = "Press a key or key combination such as Enter or Control+a")]
    async fn browser_press(&self, params: Parameters<PressParams>) -> Result<CallToolResult, McpError> {
        self.run(PressTool, params.0).await
    }

    #[tool(description = "Scroll the current page to the bottom")]
    async fn browser_scroll_to_bottom(
        &self,
        params: Parameters<ScrollToBottomParams>,
    ) -> Result<CallToolResult, McpError> {
        self.run(ScrollToBottomTool, params.0).await
    }

    #[tool(description = "Get the current page, or a described section of it, as Markdown")]
    async fn browser_markdown(&self, params: Parameters<MarkdownParams>) -> Result<CallToolResult, McpError> {
        self.run(MarkdownTool, params.0).await
    }

    #[tool(description = "Take a screenshot of the current page")]
    async fn browser_screenshot(&self, params: Parameters<ScreenshotParams>) -> Result<CallToolResult, McpError> {
        self.run(ScreenshotTool, params.0).await
    }

    #[tool(description = "Close the browser; the next tool call starts a fresh one")]
    async fn browser_close(&self) -> Result<CallToolResult, McpError> {
        let closed = self.close_browser().await.map_err(to_mcp_error)?;
        let text = if closed { "Browser closed." } else { "No browser was running." };
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }
}
