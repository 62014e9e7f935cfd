use crate::error::Result;
use crate::page::{normalize_url, GotoOptions, DEFAULT_NAVIGATION_TIMEOUT};
use crate::tools::{millis_or, Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the goto tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GotoParams {
    /// URL to navigate to; a missing scheme defaults to https
    pub url: String,

    /// Load timeout in milliseconds (default: 15000)
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Description of the page that should be reached, verified after loading
    #[serde(default)]
    pub expected_page: Option<String>,
}

impl GotoParams {
    pub(crate) fn options(&self) -> GotoOptions {
        GotoOptions {
            timeout: millis_or(self.timeout_ms, DEFAULT_NAVIGATION_TIMEOUT),
            expected_page: self.expected_page.clone(),
        }
    }
}

/// Tool for navigating the active page
#[derive(Default)]
pub struct GotoTool;

#[async_trait]
impl Tool for GotoTool {
    type Params = GotoParams;

    fn name(&self) -> &str {
        "goto"
    }

    fn description(&self) -> &str {
        "Navigate the active page to a URL, optionally checking that the expected page was reached"
    }

    async fn execute_typed(&self, params: GotoParams, context: &ToolContext) -> Result<ToolResult> {
        let page = context.browser.goto(&params.url, params.options()).await?;

        Ok(ToolResult::success_with(serde_json::json!({
            "original_url": params.url,
            "normalized_url": normalize_url(&params.url),
            "url": page.url().await?,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Harness, MockApi, MockPage};
    use std::time::Duration;

    #[test]
    fn test_goto_params_defaults() {
        let params: GotoParams = serde_json::from_value(serde_json::json!({"url": "example.com"})).unwrap();
        let options = params.options();
        assert_eq!(options.timeout, DEFAULT_NAVIGATION_TIMEOUT);
        assert!(options.expected_page.is_none());

        let params: GotoParams =
            serde_json::from_value(serde_json::json!({"url": "example.com", "timeout_ms": 500})).unwrap();
        assert_eq!(params.options().timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_goto_tool_metadata() {
        let tool = GotoTool;
        assert_eq!(Tool::name(&tool), "goto");
        assert!(Tool::parameters_schema(&tool).is_object());
    }

    #[tokio::test]
    async fn test_goto_tool_navigates_active_page() {
        let harness = Harness::new(MockPage::new("about:blank"), MockApi::new()).await;
        let context = ToolContext::new(harness.browser.clone());

        let params = GotoParams { url: "example.com".into(), timeout_ms: None, expected_page: None };
        let result = GotoTool.execute_typed(params, &context).await.unwrap();

        assert!(result.success);
        let data = result.data.unwrap();
        assert_eq!(data["normalized_url"], "https://example.com");
        assert_eq!(data["url"], "https://example.com");
        assert_eq!(harness.page.gotos(), vec!["https://example.com"]);
    }
}
