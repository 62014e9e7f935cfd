//! Request and response bodies of the remote resolution service.

use crate::auth::{AuthSession, StorageState};
use crate::dom::PageSnapshot;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Status reported by the remote service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Failed,
    Impossible,
    Error,
    Loading,
    #[serde(other)]
    Unknown,
}

/// A natural-language element description, or one description per field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Prompt {
    Single(String),
    Fields(IndexMap<String, String>),
}

impl From<&str> for Prompt {
    fn from(prompt: &str) -> Self {
        Prompt::Single(prompt.to_string())
    }
}

impl From<String> for Prompt {
    fn from(prompt: String) -> Self {
        Prompt::Single(prompt)
    }
}

impl From<IndexMap<String, String>> for Prompt {
    fn from(fields: IndexMap<String, String>) -> Self {
        Prompt::Fields(fields)
    }
}

/// Wire form of a page snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageInformation {
    pub url: String,
    pub raw_html: String,
    pub screenshot_base64: String,
    /// Seconds since the last main-frame navigation
    pub time_since_frame_navigated: f64,
}

impl PageInformation {
    pub fn from_snapshot(snapshot: &PageSnapshot, time_since_frame_navigated: f64) -> Self {
        Self {
            url: snapshot.url.clone(),
            raw_html: snapshot.html.clone(),
            screenshot_base64: snapshot.screenshot_or_empty(),
            time_since_frame_navigated,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GetElementsRequest {
    pub page_information: PageInformation,
    pub prompt: Prompt,
    pub use_cache: bool,
    pub only_one: bool,
}

/// One selector proposed by the resolver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Candidate {
    Plain(String),
    Detailed { selector: String },
}

impl Candidate {
    pub fn selector(&self) -> &str {
        match self {
            Candidate::Plain(selector) | Candidate::Detailed { selector } => selector,
        }
    }
}

/// Candidate selectors, least preferred first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Selectors {
    List(Vec<Candidate>),
    Fields(IndexMap<String, Vec<Candidate>>),
}

impl Selectors {
    /// Candidate list of a single-prompt response
    pub fn list(&self) -> Option<Vec<String>> {
        match self {
            Selectors::List(list) => Some(list.iter().map(|c| c.selector().to_string()).collect()),
            Selectors::Fields(_) => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetElementResponse {
    pub status: Status,
    #[serde(default)]
    pub selectors: Option<Selectors>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionType {
    Click,
    Fill,
    Hover,
}

impl InteractionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionType::Click => "click",
            InteractionType::Fill => "fill",
            InteractionType::Hover => "hover",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PageDelta {
    pub page_before: PageInformation,
    pub page_after: PageInformation,
}

#[derive(Debug, Clone, Serialize)]
pub struct MakeInteractionRequest {
    pub url: String,
    pub dendrite_id: String,
    pub interaction_type: InteractionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub expected_outcome: String,
    /// Whether the active page URL changed while waiting after the interaction
    pub url_changed: bool,
    pub page_delta: PageDelta,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InteractionResponse {
    pub status: Status,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractRequest {
    pub page_information: PageInformation,
    pub prompt: String,
    pub return_data_json_schema: Option<Value>,
    pub use_screenshot: bool,
    pub use_cache: bool,
    pub force_use_cache: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractResponse {
    pub status: Status,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub return_data: Option<Value>,
    #[serde(default)]
    pub created_script: Option<String>,
    #[serde(default)]
    pub used_cache: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AskPageRequest {
    pub prompt: String,
    pub return_schema: Option<Value>,
    pub page_information: PageInformation,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AskPageResponse {
    pub status: Status,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub return_data: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthenticateRequest {
    pub domains: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadAuthSessionRequest {
    pub auth_data: AuthSession,
    pub storage_state: StorageState,
}
