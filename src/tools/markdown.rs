use crate::error::Result;
use crate::tools::{Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for getting markdown content
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct MarkdownParams {
    /// Section of the page to convert; the whole page when omitted
    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(Default)]
pub struct MarkdownTool;

#[async_trait]
impl Tool for MarkdownTool {
    type Params = MarkdownParams;

    fn name(&self) -> &str {
        "markdown"
    }

    fn description(&self) -> &str {
        "Return the current page, or a described section of it, as Markdown"
    }

    async fn execute_typed(&self, params: MarkdownParams, context: &ToolContext) -> Result<ToolResult> {
        let page = context.page().await?;
        let markdown = page.markdown(params.prompt.as_deref()).await?;

        Ok(ToolResult::success_with(serde_json::json!({
            "markdown": markdown,
            "url": page.url().await?,
            "length": markdown.len()
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Harness, MockApi, MockPage};

    #[tokio::test]
    async fn test_markdown_tool_converts_whole_page() {
        let mock = MockPage::new("https://example.com/");
        mock.set_html(&[], r#"<html d-id="h"><body d-id="b"><h1 d-id="t">Welcome</h1></body></html>"#);
        let harness = Harness::new(mock, MockApi::new()).await;
        let context = ToolContext::new(harness.browser.clone());

        let result = MarkdownTool.execute_typed(MarkdownParams::default(), &context).await.unwrap();
        let data = result.data.unwrap();
        assert!(data["markdown"].as_str().unwrap().contains("Welcome"));
        assert_eq!(data["url"], "https://example.com/");
    }
}
