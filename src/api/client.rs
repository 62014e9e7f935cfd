use crate::api::config::ApiConfig;
use crate::api::dto::*;
use crate::api::BrowserApi;
use crate::auth::AuthSession;
use crate::error::{BrowserError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Serialize;

/// [`BrowserApi`] over HTTP. Every call is a JSON `POST` to `<base_url>/<endpoint>`.
///
/// Transport failures and non-success statuses are logged and returned as-is;
/// nothing is retried here.
#[derive(Debug, Clone)]
pub struct HttpBrowserApi {
    client: reqwest::Client,
    config: ApiConfig,
}

impl HttpBrowserApi {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", config.api_key))
                .map_err(|e| BrowserError::InvalidArgument(format!("API key is not a valid header value: {}", e)))?,
        );
        headers.insert(
            "x-session-id",
            HeaderValue::from_str(&config.session_id)
                .map_err(|e| BrowserError::InvalidArgument(format!("Session id is not a valid header value: {}", e)))?,
        );

        let client = reqwest::Client::builder().default_headers(headers).timeout(config.request_timeout).build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    async fn post<B: Serialize + ?Sized>(&self, endpoint: &str, body: &B) -> Result<reqwest::Response> {
        let url = self.config.endpoint_url(endpoint);
        log::debug!("POST {}", url);

        let response = self.client.post(&url).json(body).send().await.map_err(|e| {
            log::error!("Request to {} failed: {}", url, e);
            BrowserError::Transport(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::error!("Request to {} returned {}: {}", url, status, body);
            return Err(BrowserError::Api { endpoint: endpoint.to_string(), status: status.as_u16(), body });
        }

        Ok(response)
    }

    async fn post_json<B, R>(&self, endpoint: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: serde::de::DeserializeOwned,
    {
        let response = self.post(endpoint, body).await?;
        Ok(response.json::<R>().await?)
    }
}

#[async_trait]
impl BrowserApi for HttpBrowserApi {
    async fn resolve_elements(&self, request: &GetElementsRequest) -> Result<GetElementResponse> {
        self.post_json("actions/get-interaction-selector", request).await
    }

    async fn verify_outcome(&self, request: &MakeInteractionRequest) -> Result<InteractionResponse> {
        self.post_json("actions/make-interaction", request).await
    }

    async fn extract(&self, request: &ExtractRequest) -> Result<ExtractResponse> {
        self.post_json("actions/extract-page", request).await
    }

    async fn ask(&self, request: &AskPageRequest) -> Result<AskPageResponse> {
        self.post_json("actions/ask-page", request).await
    }

    async fn authenticate(&self, request: &AuthenticateRequest) -> Result<AuthSession> {
        let response = self.post("actions/authenticate", request).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Err(BrowserError::InvalidAuthSession(request.domains.clone()));
        }
        Ok(response.json::<AuthSession>().await?)
    }

    async fn upload_auth_session(&self, request: &UploadAuthSessionRequest) -> Result<()> {
        self.post("actions/upload-auth-session", request).await?;
        Ok(())
    }
}
