use crate::error::Result;
use crate::page::DEFAULT_ASK_TIMEOUT;
use crate::tools::{millis_or, Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parameters for the ask tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AskParams {
    /// Question about the current page
    pub prompt: String,

    /// JSON schema for the returned data
    #[serde(default)]
    pub schema: Option<Value>,

    /// Budget in milliseconds (default: 15000)
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

#[derive(Default)]
pub struct AskTool;

#[async_trait]
impl Tool for AskTool {
    type Params = AskParams;

    fn name(&self) -> &str {
        "ask"
    }

    fn description(&self) -> &str {
        "Ask a question about the current page and get a description plus structured data back"
    }

    async fn execute_typed(&self, params: AskParams, context: &ToolContext) -> Result<ToolResult> {
        let page = context.page().await?;
        let response = page
            .ask(&params.prompt, params.schema, millis_or(params.timeout_ms, DEFAULT_ASK_TIMEOUT))
            .await?;

        Ok(ToolResult::success_with(serde_json::to_value(response)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{AskPageResponse, Status};
    use crate::testing::{Harness, MockApi, MockPage};
    use serde_json::json;

    #[tokio::test]
    async fn test_ask_tool_returns_answer() {
        let api = MockApi::new();
        api.on_ask(|request, _| {
            assert_eq!(request.return_schema, Some(json!({"type": "integer"})));
            Ok(AskPageResponse { status: Status::Success, description: "three items".into(), return_data: json!(3) })
        });
        let harness = Harness::new(MockPage::new("https://shop.example.com/cart"), api).await;
        let context = ToolContext::new(harness.browser.clone());

        let params: AskParams =
            serde_json::from_value(json!({"prompt": "How many items are in the cart?", "schema": {"type": "integer"}}))
                .unwrap();
        let result = AskTool.execute_typed(params, &context).await.unwrap();

        assert_eq!(result.data, Some(json!({"description": "three items", "return_data": 3})));
    }

    #[test]
    fn test_ask_tool_metadata() {
        let tool = AskTool;
        assert_eq!(Tool::name(&tool), "ask");
        let schema = Tool::parameters_schema(&tool);
        assert!(schema["properties"]["prompt"].is_object());
    }
}
