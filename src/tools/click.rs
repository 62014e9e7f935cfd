use crate::error::Result;
use crate::page::{ClickOptions, GetElementOptions, DEFAULT_INTERACTION_TIMEOUT, DEFAULT_RESOLVE_TIMEOUT};
use crate::tools::{millis_or, Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the click tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClickParams {
    /// Natural-language description of the element to click
    pub prompt: String,

    /// What should happen after the click; verified when given
    #[serde(default)]
    pub expected_outcome: Option<String>,

    /// Click even if the element is not visible
    #[serde(default)]
    pub force: bool,

    /// Budget for finding the element, in milliseconds (default: 15000)
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// Tool for clicking an element described in plain language
#[derive(Default)]
pub struct ClickTool;

#[async_trait]
impl Tool for ClickTool {
    type Params = ClickParams;

    fn name(&self) -> &str {
        "click"
    }

    fn description(&self) -> &str {
        "Click the element matching a natural-language description, optionally verifying the expected outcome"
    }

    async fn execute_typed(&self, params: ClickParams, context: &ToolContext) -> Result<ToolResult> {
        let options = ClickOptions {
            timeout: DEFAULT_INTERACTION_TIMEOUT,
            force: params.force,
            expected_outcome: params.expected_outcome.clone(),
            resolve: GetElementOptions::new().timeout(millis_or(params.timeout_ms, DEFAULT_RESOLVE_TIMEOUT)),
        };

        let page = context.page().await?;
        let response = page.click(&params.prompt, options).await?;

        Ok(ToolResult::success_with(serde_json::json!({
            "prompt": params.prompt,
            "status": response.status,
            "message": response.message,
        })))
    }
}
