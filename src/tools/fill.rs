use crate::error::Result;
use crate::page::{FillOptions, GetElementOptions, DEFAULT_INTERACTION_TIMEOUT, DEFAULT_RESOLVE_TIMEOUT};
use crate::tools::{millis_or, Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FillParams {
    /// Natural-language description of the field
    pub prompt: String,

    /// Text that replaces the field's content
    pub value: String,

    /// What should happen after filling; verified when given
    #[serde(default)]
    pub expected_outcome: Option<String>,

    /// Fill even if the field is not visible
    #[serde(default)]
    pub force: bool,

    /// Budget for finding the field, in milliseconds (default: 15000)
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

#[derive(Default)]
pub struct FillTool;

#[async_trait]
impl Tool for FillTool {
    type Params = FillParams;

    fn name(&self) -> &str {
        "fill"
    }

    fn description(&self) -> &str {
        "Replace the content of the field matching a natural-language description"
    }

    async fn execute_typed(&self, params: FillParams, context: &ToolContext) -> Result<ToolResult> {
        let options = FillOptions {
            timeout: DEFAULT_INTERACTION_TIMEOUT,
            force: params.force,
            expected_outcome: params.expected_outcome.clone(),
            resolve: GetElementOptions::new().timeout(millis_or(params.timeout_ms, DEFAULT_RESOLVE_TIMEOUT)),
        };

        let page = context.page().await?;
        let response = page.fill(&params.prompt, &params.value, options).await?;

        Ok(ToolResult::success_with(serde_json::json!({
            "prompt": params.prompt,
            "text_length": params.value.chars().count(),
            "status": response.status,
        })))
    }
}
