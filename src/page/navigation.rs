use crate::error::{BrowserError, Result};
use crate::page::Page;
use std::time::Duration;

pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(15);

const EXPECTED_PAGE_TIMEOUT: Duration = Duration::from_secs(15);

/// Options for [`Page::goto`] and [`crate::Browser::new_tab`]
#[derive(Debug, Clone)]
pub struct GotoOptions {
    /// Upper bound on waiting for the document to load
    pub timeout: Duration,

    /// Description of the page that should be reached; checked with the remote service
    pub expected_page: Option<String>,
}

impl Default for GotoOptions {
    fn default() -> Self {
        Self { timeout: DEFAULT_NAVIGATION_TIMEOUT, expected_page: None }
    }
}

impl GotoOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn expected_page(mut self, description: impl Into<String>) -> Self {
        self.expected_page = Some(description.into());
        self
    }
}

/// Prefixes that already name a scheme, or a path relative to the current page
const KEEP_AS_IS: &[&str] = &[
    "http://",
    "https://",
    "file://",
    "data:",
    "about:",
    "chrome://",
    "chrome-extension://",
    "/",
    "./",
    "../",
];

/// Loopback hosts get plain http
const LOOPBACK: &[&str] = &["localhost", "127.0.0.1"];

/// Add a scheme to URLs typed without one
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();

    if KEEP_AS_IS.iter().any(|prefix| url.starts_with(prefix)) {
        url.to_string()
    } else if LOOPBACK.iter().any(|host| url.starts_with(host)) {
        format!("http://{}", url)
    } else {
        format!("https://{}", url)
    }
}

impl Page {
    /// Navigate to `url`.
    ///
    /// Navigation and load failures are logged, not returned: the page is used
    /// as it is. With `expected_page` set, a negative answer from the remote
    /// service raises [`BrowserError::IncorrectOutcome`].
    pub async fn goto(&self, url: &str, options: GotoOptions) -> Result<()> {
        let url = normalize_url(url);
        let scope = self.log().scope("goto");
        log::info!("Navigating to {}", url);

        let navigation = async {
            self.driver().goto(&url).await?;
            self.driver().wait_for_load(options.timeout).await
        };
        match tokio::time::timeout(options.timeout, navigation).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                log::warn!("Navigation to {} failed, continuing anyway: {}", url, e);
                scope.record(crate::logging::EventKind::Info, format!("navigation error: {}", e), None);
            }
            Err(_) => {
                log::warn!("Navigation to {} timed out after {:?}, continuing anyway", url, options.timeout);
            }
        }

        let Some(expected) = options.expected_page else {
            return Ok(());
        };

        let prompt = format!(
            "Prompt: '{}'\n\nReturn a boolean that determines if the requested page is the one you are currently on.",
            expected
        );
        if self.ask_bool(&prompt, EXPECTED_PAGE_TIMEOUT).await? {
            return Ok(());
        }

        let screenshot = self.screenshot(false).await.unwrap_or_default();
        Err(BrowserError::IncorrectOutcome {
            message: format!("Navigated to '{}' but the page does not match '{}'", url, expected),
            screenshot,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{AskPageResponse, Status};
    use crate::testing::{Harness, MockApi, MockPage};
    use serde_json::json;

    #[test]
    fn test_normalize_url_with_protocol() {
        assert_eq!(normalize_url("https://example.com"), "https://example.com");
        assert_eq!(normalize_url("http://example.com"), "http://example.com");
        assert_eq!(normalize_url("file:///path/to/file"), "file:///path/to/file");
        assert_eq!(normalize_url("about:blank"), "about:blank");
        assert_eq!(normalize_url("data:text/html,<h1>Test</h1>"), "data:text/html,<h1>Test</h1>");
    }

    #[test]
    fn test_normalize_url_without_scheme() {
        assert_eq!(normalize_url("example.com"), "https://example.com");
        assert_eq!(normalize_url("www.example.com/path?q=1"), "https://www.example.com/path?q=1");
        assert_eq!(normalize_url("  example.com  "), "https://example.com");
    }

    #[test]
    fn test_normalize_url_localhost_and_relative() {
        assert_eq!(normalize_url("localhost:3000"), "http://localhost:3000");
        assert_eq!(normalize_url("127.0.0.1:8080/api"), "http://127.0.0.1:8080/api");
        assert_eq!(normalize_url("/path/to/page"), "/path/to/page");
        assert_eq!(normalize_url("../page"), "../page");
    }

    #[tokio::test]
    async fn test_goto_navigates_and_waits_for_load() {
        let harness = Harness::new(MockPage::new("about:blank"), MockApi::new()).await;
        let page = harness.active().await;

        page.goto("example.com", GotoOptions::default()).await.unwrap();
        assert_eq!(harness.page.gotos(), vec!["https://example.com"]);
        assert_eq!(harness.page.load_waits(), 1);
        assert!(harness.api.ask_requests.lock().is_empty());
    }

    #[tokio::test]
    async fn test_goto_expected_page_mismatch() {
        let api = MockApi::new();
        api.on_ask(|request, _| {
            assert!(request.prompt.contains("Prompt: 'the pricing page'"));
            assert_eq!(request.return_schema, Some(json!({"type": "boolean"})));
            Ok(AskPageResponse { status: Status::Success, description: "login page".into(), return_data: json!(false) })
        });
        let harness = Harness::new(MockPage::new("about:blank"), api).await;
        let page = harness.active().await;

        let result = page.goto("example.com/pricing", GotoOptions::new().expected_page("the pricing page")).await;
        match result {
            Err(BrowserError::IncorrectOutcome { screenshot, .. }) => assert!(screenshot.starts_with("shot-")),
            other => panic!("expected IncorrectOutcome, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_goto_expected_page_match() {
        let harness = Harness::new(MockPage::new("about:blank"), MockApi::new()).await;
        let page = harness.active().await;

        page.goto("example.com", GotoOptions::new().expected_page("the home page")).await.unwrap();
        assert_eq!(harness.api.ask_requests.lock().len(), 1);
    }
}
