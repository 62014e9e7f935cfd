use crate::error::Result;
use crate::tools::goto::GotoParams;
use crate::tools::{Tool, ToolContext, ToolResult};
use async_trait::async_trait;

/// Tool for opening a new tab
#[derive(Default)]
pub struct NewTabTool;

#[async_trait]
impl Tool for NewTabTool {
    type Params = GotoParams;

    fn name(&self) -> &str {
        "new_tab"
    }

    fn description(&self) -> &str {
        "Open a new tab, make it the active page and navigate it to a URL"
    }

    async fn execute_typed(&self, params: GotoParams, context: &ToolContext) -> Result<ToolResult> {
        let page = context.browser.new_tab(&params.url, params.options()).await?;
        let url = page.url().await?;

        Ok(ToolResult::success_with(serde_json::json!({
            "page_id": page.id(),
            "url": url,
            "message": format!("Opened new tab with URL: {}", url)
        })))
    }
}
