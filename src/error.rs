use base64::Engine;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Errors that can occur during browser automation
#[derive(Debug, Error)]
pub enum BrowserError {
    /// Failed to launch browser
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    /// Failed to connect to browser
    #[error("Failed to connect to browser: {0}")]
    ConnectionFailed(String),

    /// Tab operation failed
    #[error("Tab operation failed: {0}")]
    TabOperationFailed(String),

    /// Navigation failed
    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    /// Element not found
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// DOM parsing failed
    #[error("DOM parsing failed: {0}")]
    DomParseFailed(String),

    /// Identity tags could not be written into the page
    #[error("Failed to tag DOM elements: {0}")]
    DomTaggingFailed(String),

    /// A frame on the path could not be entered (detached or cross-origin)
    #[error("Frame unreachable: {0}")]
    FrameUnreachable(String),

    /// JavaScript evaluation failed
    #[error("JavaScript evaluation failed: {0}")]
    EvaluationFailed(String),

    /// Tool execution failed
    #[error("Tool '{tool}' execution failed: {reason}")]
    ToolExecutionFailed { tool: String, reason: String },

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No API key was supplied or found in the environment
    #[error("Missing API key: {0}")]
    MissingApiKey(String),

    /// The remote verifier judged that an interaction did not have its expected effect
    #[error("Incorrect outcome: {message}")]
    IncorrectOutcome { message: String, screenshot: String },

    /// A page condition did not become true in time
    #[error("Page condition not met: {message}")]
    PageConditionNotMet { message: String, screenshot: String },

    /// The remote service has no stored session for the requested domains
    #[error("No valid auth session for domains: {0:?}")]
    InvalidAuthSession(Vec<String>),

    /// The browser has not been launched or was already closed
    #[error("Browser not launched: {0}")]
    BrowserNotLaunched(String),

    /// Operation timed out
    #[error("Timed out: {0}")]
    Timeout(String),

    /// The remote service answered with a non-success status
    #[error("API request to '{endpoint}' failed with status {status}: {body}")]
    Api { endpoint: String, status: u16, body: String },

    /// Transport-level HTTP failure
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// JSON (de)serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BrowserError {
    /// Base64 JPEG attached to the error, if any
    pub fn screenshot(&self) -> Option<&str> {
        match self {
            BrowserError::IncorrectOutcome { screenshot, .. } | BrowserError::PageConditionNotMet { screenshot, .. } => {
                Some(screenshot.as_str()).filter(|s| !s.is_empty())
            }
            _ => None,
        }
    }

    /// Write the attached screenshot to `<dir>/<unix-millis>.jpeg`.
    ///
    /// Returns `Ok(None)` when the error carries no screenshot.
    pub fn store_screenshot(&self, dir: impl AsRef<Path>) -> Result<Option<PathBuf>> {
        let Some(encoded) = self.screenshot() else {
            return Ok(None);
        };

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| BrowserError::InvalidArgument(format!("Screenshot is not valid base64: {}", e)))?;

        let millis = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis()).unwrap_or_default();

        std::fs::create_dir_all(dir.as_ref())?;
        let path = dir.as_ref().join(format!("{}.jpeg", millis));
        std::fs::write(&path, bytes)?;

        Ok(Some(path))
    }
}

/// Result type alias for browser operations
pub type Result<T> = std::result::Result<T, BrowserError>;
