use crate::error::Result;
use crate::page::DEFAULT_WAIT_FOR_TIMEOUT;
use crate::tools::{millis_or, Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WaitForParams {
    /// Condition to wait for, e.g. "the search results are shown"
    pub prompt: String,

    /// Budget in milliseconds (default: 30000)
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

#[derive(Default)]
pub struct WaitForTool;

#[async_trait]
impl Tool for WaitForTool {
    type Params = WaitForParams;

    fn name(&self) -> &str {
        "wait_for"
    }

    fn description(&self) -> &str {
        "Wait until a condition described in plain language holds on the current page"
    }

    async fn execute_typed(&self, params: WaitForParams, context: &ToolContext) -> Result<ToolResult> {
        let timeout = millis_or(params.timeout_ms, DEFAULT_WAIT_FOR_TIMEOUT);
        let page = context.page().await?;
        page.wait_for(&params.prompt, timeout).await?;

        Ok(ToolResult::success_with(serde_json::json!({ "prompt": params.prompt })))
    }
}
