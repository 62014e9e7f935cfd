//! Remote resolution, extraction and verification service.
//!
//! The service is an external collaborator; the core only depends on the
//! [`BrowserApi`] contract. [`HttpBrowserApi`] is the HTTP implementation.

pub mod client;
pub mod config;
pub mod dto;

pub use client::HttpBrowserApi;
pub use config::ApiConfig;
pub use dto::{
    AskPageRequest, AskPageResponse, AuthenticateRequest, Candidate, ExtractRequest, ExtractResponse,
    GetElementResponse, GetElementsRequest, InteractionResponse, InteractionType, MakeInteractionRequest, PageDelta,
    PageInformation, Prompt, Selectors, Status, UploadAuthSessionRequest,
};

use crate::auth::AuthSession;
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait BrowserApi: Send + Sync {
    /// Turn a prompt (or per-field prompts) into candidate selectors for a snapshot
    async fn resolve_elements(&self, request: &GetElementsRequest) -> Result<GetElementResponse>;

    /// Judge whether an interaction had its expected outcome
    async fn verify_outcome(&self, request: &MakeInteractionRequest) -> Result<InteractionResponse>;

    /// Extract structured data from a snapshot
    async fn extract(&self, request: &ExtractRequest) -> Result<ExtractResponse>;

    /// Answer a question about a snapshot
    async fn ask(&self, request: &AskPageRequest) -> Result<AskPageResponse>;

    /// Fetch the stored auth session for some domains
    async fn authenticate(&self, request: &AuthenticateRequest) -> Result<AuthSession>;

    /// Store the current auth session
    async fn upload_auth_session(&self, request: &UploadAuthSessionRequest) -> Result<()>;
}
