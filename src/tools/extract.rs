use crate::error::Result;
use crate::page::{ExtractOptions, DEFAULT_EXTRACT_TIMEOUT};
use crate::tools::{millis_or, Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

fn default_true() -> bool {
    true
}

/// Parameters for the extract tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExtractParams {
    /// What to extract, in plain language
    pub prompt: String,

    /// JSON schema the extracted data must follow
    #[serde(default)]
    pub schema: Option<Value>,

    /// Try cached extraction scripts before asking for a fresh one (default: true)
    #[serde(default = "default_true")]
    pub use_cache: bool,

    /// Overall budget in milliseconds (default: 180000)
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// Tool for extracting structured data from the active page
#[derive(Default)]
pub struct ExtractTool;

#[async_trait]
impl Tool for ExtractTool {
    type Params = ExtractParams;

    fn name(&self) -> &str {
        "extract"
    }

    fn description(&self) -> &str {
        "Extract data described in plain language from the current page, optionally shaped by a JSON schema"
    }

    async fn execute_typed(&self, params: ExtractParams, context: &ToolContext) -> Result<ToolResult> {
        let options = ExtractOptions::new()
            .use_cache(params.use_cache)
            .timeout(millis_or(params.timeout_ms, DEFAULT_EXTRACT_TIMEOUT));

        let page = context.page().await?;
        match page.extract(&params.prompt, params.schema, &options).await? {
            Some(data) => Ok(ToolResult::success_with(data)),
            None => Ok(ToolResult::failure(format!("Nothing matching '{}' could be extracted", params.prompt))),
        }
    }
}
