use crate::error::{BrowserError, Result};
use std::time::Duration;
use uuid::Uuid;

pub const API_KEY_ENV: &str = "INTENT_BROWSER_API_KEY";
pub const BASE_URL_ENV: &str = "INTENT_BROWSER_BASE_URL";
pub const DEV_ENV: &str = "INTENT_BROWSER_DEV";

pub const DEFAULT_BASE_URL: &str = "https://dendrite-server.azurewebsites.net/api/v1";
pub const DEV_BASE_URL: &str = "http://localhost:8000/api/v1";

/// Credentials and endpoint of the remote resolution service
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_key: String,
    pub base_url: String,
    /// Sent as `X-Session-ID` on every request
    pub session_id: String,
    pub request_timeout: Duration,
}

impl ApiConfig {
    /// Build a config from an explicit key. Fails when the key is empty.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(BrowserError::MissingApiKey(format!(
                "An API key is required; pass one explicitly or set {}",
                API_KEY_ENV
            )));
        }

        Ok(Self {
            api_key,
            base_url: default_base_url(),
            session_id: Uuid::new_v4().simple().to_string(),
            request_timeout: Duration::from_secs(300),
        })
    }

    /// Build a config from the environment
    pub fn from_env() -> Result<Self> {
        let key = std::env::var(API_KEY_ENV).unwrap_or_default();
        let mut config = Self::new(key)?;
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.trim().is_empty() {
                config.base_url = url;
            }
        }
        Ok(config)
    }

    /// Use `key` when given, otherwise the environment
    pub fn resolve(key: Option<String>) -> Result<Self> {
        match key {
            Some(key) => Self::new(key),
            None => Self::from_env(),
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Full URL of an endpoint such as `actions/ask-page`
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), endpoint.trim_start_matches('/'))
    }
}

fn default_base_url() -> String {
    if std::env::var_os(DEV_ENV).is_some() {
        DEV_BASE_URL.to_string()
    } else {
        DEFAULT_BASE_URL.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_key_is_rejected() {
        assert!(matches!(ApiConfig::new(""), Err(BrowserError::MissingApiKey(_))));
        assert!(matches!(ApiConfig::new("   "), Err(BrowserError::MissingApiKey(_))));
    }

    #[test]
    fn test_explicit_key() {
        let config = ApiConfig::new("sk-test").unwrap().base_url("http://127.0.0.1:9/api/v1/");

        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.session_id.len(), 32);
        assert!(config.session_id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(config.endpoint_url("actions/ask-page"), "http://127.0.0.1:9/api/v1/actions/ask-page");
    }

    #[test]
    fn test_session_ids_differ() {
        let a = ApiConfig::new("k").unwrap();
        let b = ApiConfig::new("k").unwrap();
        assert_ne!(a.session_id, b.session_id);
    }
}
