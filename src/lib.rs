//! # intent-browser
//!
//! Browser automation driven by intent instead of selectors. Describe an element
//! in plain language ("the login button"), and the client snapshots the live
//! page, asks a remote resolution service for matching selectors, maps them back
//! to a frame-scoped locator and acts on it, optionally verifying the outcome.
//!
//! ## Features
//!
//! - **Intent operations**: `click`, `fill`, `hover`, `extract`, `ask`, `wait_for`
//!   on a [`Page`], with retry and backoff against a flaky resolver
//! - **Cross-frame snapshots**: stable element ids, iframes flattened into one
//!   composite document
//! - **Session lifecycle**: tabs opening, closing and crashing, active-page
//!   tracking, file choosers and downloads
//! - **MCP Server**: the same operations as Model Context Protocol tools
//!
//! ## Library Usage
//!
//! ```rust,no_run
//! use intent_browser::{ApiConfig, Browser, ClickOptions, ExtractOptions, GotoOptions, LaunchOptions};
//!
//! # async fn run() -> intent_browser::Result<()> {
//! let browser = Browser::launch(LaunchOptions::default(), ApiConfig::from_env()?).await?;
//! let page = browser.goto("news.ycombinator.com", GotoOptions::default()).await?;
//!
//! page.click(
//!     "the 'new' link in the header",
//!     ClickOptions::default().expected_outcome("The newest stories are listed"),
//! )
//! .await?;
//!
//! let titles = page.extract("the titles of the first five stories", None, &ExtractOptions::default()).await?;
//! println!("{:?}", titles);
//! browser.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! A synchronous front-end with the same operations lives in [`blocking`].
//!
//! ## MCP Server
//!
//! ```bash
//! INTENT_BROWSER_API_KEY=... cargo run --bin mcp-server -- --headed
//! ```
//!
//! ## Module Overview
//!
//! - [`browser`]: session, lifecycle tracking and the Chrome driver
//! - [`page`]: the intent operations
//! - [`dom`]: page snapshots, element tagging and locators
//! - [`api`]: client of the remote resolution service
//! - [`tools`]: JSON-parameterized tools for agents
//! - [`mcp`]: Model Context Protocol server (requires the `mcp-handler` feature)

pub mod api;
pub mod auth;
pub mod blocking;
pub mod browser;
pub mod dom;
pub mod error;
pub mod logging;
pub mod page;
pub mod tools;

#[cfg(feature = "mcp-handler")]
pub mod mcp;

#[cfg(test)]
mod testing;

pub use api::{ApiConfig, BrowserApi, HttpBrowserApi};
pub use auth::StorageState;
pub use browser::{Browser, ConnectionOptions, LaunchOptions, SessionSettings};
pub use dom::Locator;
pub use error::{BrowserError, Result};
pub use logging::{ActionEvent, ActionLog, EventKind};
pub use page::{
    AskResponse, ClickOptions, Element, ElementsResponse, ExtractOptions, FillOptions, GetElementOptions,
    GotoOptions, HoverOptions, Page, PressOptions, ScrollOptions,
};
pub use tools::{Tool, ToolContext, ToolRegistry, ToolResult};

#[cfg(feature = "mcp-handler")]
pub use mcp::BrowserServer;
#[cfg(feature = "mcp-handler")]
pub use rmcp::ServiceExt;
