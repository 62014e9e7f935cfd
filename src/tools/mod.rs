//! JSON-parameterized wrappers around the intent operations.
//!
//! Each tool declares a typed parameter struct (with a `schemars` schema) and
//! acts on the active page of the session held by the [`ToolContext`]. The
//! [`ToolRegistry`] dispatches by tool name with raw JSON parameters, which is
//! what agent front-ends such as the MCP server need.

pub mod ask;
pub mod click;
pub mod extract;
pub mod fill;
pub mod goto;
pub mod markdown;
pub mod new_tab;
pub mod press;
pub mod screenshot;
pub mod scroll;
pub mod wait_for;

use crate::browser::session::Browser;
use crate::error::{BrowserError, Result};
use crate::page::Page;
use async_trait::async_trait;
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Outcome of a tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn success() -> Self {
        Self { success: true, data: None, error: None }
    }

    pub fn success_with(data: Value) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self { success: false, data: None, error: Some(error.into()) }
    }
}

/// What a tool runs against
#[derive(Clone)]
pub struct ToolContext {
    pub browser: Browser,
}

impl ToolContext {
    pub fn new(browser: Browser) -> Self {
        Self { browser }
    }

    /// The session's active page
    pub async fn page(&self) -> Result<Page> {
        self.browser.active_page().await
    }
}

/// A tool with typed parameters
#[async_trait]
pub trait Tool: Send + Sync {
    type Params: DeserializeOwned + JsonSchema + Send;

    fn name(&self) -> &str;

    fn description(&self) -> &str;

    async fn execute_typed(&self, params: Self::Params, context: &ToolContext) -> Result<ToolResult>;

    fn parameters_schema(&self) -> Value {
        serde_json::to_value(schemars::schema_for!(Self::Params)).unwrap_or(Value::Null)
    }
}

/// Object-safe view of a [`Tool`] taking raw JSON parameters
#[async_trait]
pub trait DynTool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn parameters_schema(&self) -> Value;

    async fn execute(&self, params: Value, context: &ToolContext) -> Result<ToolResult>;
}

#[async_trait]
impl<T: Tool> DynTool for T {
    fn name(&self) -> &str {
        Tool::name(self)
    }

    fn description(&self) -> &str {
        Tool::description(self)
    }

    fn parameters_schema(&self) -> Value {
        Tool::parameters_schema(self)
    }

    async fn execute(&self, params: Value, context: &ToolContext) -> Result<ToolResult> {
        let params: T::Params = serde_json::from_value(params).map_err(|e| {
            BrowserError::InvalidArgument(format!("Invalid parameters for '{}': {}", Tool::name(self), e))
        })?;
        self.execute_typed(params, context).await
    }
}

/// Tools by name, in registration order
#[derive(Default)]
pub struct ToolRegistry {
    tools: IndexMap<String, Box<dyn DynTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in tool
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(goto::GotoTool);
        registry.register(new_tab::NewTabTool);
        registry.register(click::ClickTool);
        registry.register(fill::FillTool);
        registry.register(extract::ExtractTool);
        registry.register(ask::AskTool);
        registry.register(wait_for::WaitForTool);
        registry.register(press::PressTool);
        registry.register(scroll::ScrollToBottomTool);
        registry.register(markdown::MarkdownTool);
        registry.register(screenshot::ScreenshotTool);
        registry
    }

    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.tools.insert(Tool::name(&tool).to_string(), Box::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<&dyn DynTool> {
        self.tools.get(name).map(|tool| tool.as_ref())
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub async fn execute(&self, name: &str, params: Value, context: &ToolContext) -> Result<ToolResult> {
        let tool = self
            .get(name)
            .ok_or_else(|| BrowserError::InvalidArgument(format!("Unknown tool '{}'", name)))?;
        log::debug!("Executing tool {}", name);
        tool.execute(params, context).await
    }
}

/// Milliseconds parameter to a duration, with a default
pub(crate) fn millis_or(value: Option<u64>, default: Duration) -> Duration {
    value.map(Duration::from_millis).unwrap_or(default)
}
