use crate::error::Result;
use crate::page::ScrollOptions;
use crate::tools::{Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ScrollToBottomParams {
    /// Budget in milliseconds (default: 30000)
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Pixels per scroll step (default: 1000)
    #[serde(default)]
    pub scroll_increment: Option<u32>,
}

impl ScrollToBottomParams {
    fn options(&self) -> ScrollOptions {
        let mut options = ScrollOptions::default();
        if let Some(ms) = self.timeout_ms {
            options.timeout = Duration::from_millis(ms);
        }
        if let Some(increment) = self.scroll_increment {
            options.scroll_increment = increment;
        }
        options
    }
}

#[derive(Default)]
pub struct ScrollToBottomTool;

#[async_trait]
impl Tool for ScrollToBottomTool {
    type Params = ScrollToBottomParams;

    fn name(&self) -> &str {
        "scroll_to_bottom"
    }

    fn description(&self) -> &str {
        "Scroll the current page down until the bottom is reached, loading lazy content on the way"
    }

    async fn execute_typed(&self, params: ScrollToBottomParams, context: &ToolContext) -> Result<ToolResult> {
        context.page().await?.scroll_to_bottom(&params.options()).await?;
        Ok(ToolResult::success())
    }
}
