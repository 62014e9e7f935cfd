use crate::error::Result;
use crate::page::PressOptions;
use crate::tools::{Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the press tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PressParams {
    /// Key or combination, e.g. "Enter" or "Control+a"
    pub key: String,

    /// Extra modifiers to hold: Shift, Control, Alt or Meta
    #[serde(default)]
    pub modifiers: Vec<String>,
}

/// Tool for pressing keys on the active page
#[derive(Default)]
pub struct PressTool;

#[async_trait]
impl Tool for PressTool {
    type Params = PressParams;

    fn name(&self) -> &str {
        "press"
    }

    fn description(&self) -> &str {
        "Press a key or key combination on the current page"
    }

    async fn execute_typed(&self, params: PressParams, context: &ToolContext) -> Result<ToolResult> {
        let options = params.modifiers.iter().fold(PressOptions::new(), |options, m| options.modifier(m.as_str()));
        context.page().await?.press(&params.key, &options).await?;

        Ok(ToolResult::success_with(serde_json::json!({ "key": params.key })))
    }
}
