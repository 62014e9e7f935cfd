use crate::error::Result;
use crate::tools::{Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ScreenshotParams {
    /// Capture the whole scrollable page instead of the viewport
    #[serde(default)]
    pub full_page: bool,
}

#[derive(Default)]
pub struct ScreenshotTool;

#[async_trait]
impl Tool for ScreenshotTool {
    type Params = ScreenshotParams;

    fn name(&self) -> &str {
        "screenshot"
    }

    fn description(&self) -> &str {
        "Take a PNG screenshot of the current page, returned base64-encoded"
    }

    async fn execute_typed(&self, params: ScreenshotParams, context: &ToolContext) -> Result<ToolResult> {
        let image = context.page().await?.screenshot(params.full_page).await?;

        Ok(ToolResult::success_with(serde_json::json!({
            "format": "png",
            "full_page": params.full_page,
            "data": image,
        })))
    }
}
