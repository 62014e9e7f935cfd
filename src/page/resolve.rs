//! Prompt to element resolution.
//!
//! Each attempt takes a fresh snapshot, asks the remote resolver for candidate
//! selectors and matches them against the snapshot. Misses are retried on the
//! backoff schedule until the budget runs out; running out is not an error.

use crate::api::{GetElementsRequest, Prompt, Selectors, Status};
use crate::dom::locator::Locator;
use crate::error::Result;
use crate::logging::{ActionScope, EventKind};
use crate::page::element::Element;
use crate::page::retry::Backoff;
use crate::page::Page;
use futures::future::join_all;
use indexmap::IndexMap;
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(15);

/// Below this remaining budget the cache is bypassed
pub const CACHE_BYPASS_MARGIN: Duration = Duration::from_millis(8);

/// Attempts after this index never use the cache
const LAST_CACHED_ATTEMPT: usize = 2;

/// Options for [`Page::get_element`] and friends
#[derive(Debug, Clone)]
pub struct GetElementOptions {
    pub use_cache: bool,

    /// Total budget for all attempts
    pub timeout: Duration,
}

impl Default for GetElementOptions {
    fn default() -> Self {
        Self { use_cache: true, timeout: DEFAULT_RESOLVE_TIMEOUT }
    }
}

impl GetElementOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Elements resolved per field, in the order the fields were given.
///
/// Fields that did not resolve are absent.
#[derive(Debug, Clone, Default)]
pub struct ElementsResponse {
    elements: IndexMap<String, Element>,
}

impl ElementsResponse {
    pub fn get(&self, field: &str) -> Option<&Element> {
        self.elements.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.elements.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Element)> {
        self.elements.iter()
    }

    pub fn into_inner(self) -> IndexMap<String, Element> {
        self.elements
    }
}

impl Page {
    /// Resolve a prompt to one element. `Ok(None)` when nothing matched within the budget.
    pub async fn get_element(&self, prompt: &str, options: &GetElementOptions) -> Result<Option<Element>> {
        let scope = self.log().scope("get_element");
        let found = self.resolve_prompt(prompt, true, options, &scope).await?;
        Ok(found.and_then(|locators| locators.into_iter().next()).map(|locator| Element::new(locator, self.clone())))
    }

    /// Resolve a prompt to every element matched by the winning selector. Empty when nothing matched.
    pub async fn get_elements(&self, prompt: &str, options: &GetElementOptions) -> Result<Vec<Element>> {
        let scope = self.log().scope("get_elements");
        let found = self.resolve_prompt(prompt, false, options, &scope).await?;
        Ok(found
            .unwrap_or_default()
            .into_iter()
            .map(|locator| Element::new(locator, self.clone()))
            .collect())
    }

    /// Resolve several fields concurrently, one element per field
    pub async fn get_fields(
        &self,
        fields: &IndexMap<String, String>,
        options: &GetElementOptions,
    ) -> Result<ElementsResponse> {
        let scope = self.log().scope("get_fields");
        let resolutions = fields.iter().map(|(field, prompt)| {
            let scope = &scope;
            async move { (field.clone(), self.resolve_prompt(prompt, true, options, scope).await) }
        });

        let mut elements = IndexMap::new();
        for (field, result) in join_all(resolutions).await {
            match result?.and_then(|locators| locators.into_iter().next()) {
                Some(locator) => {
                    elements.insert(field, Element::new(locator, self.clone()));
                }
                None => log::info!("Field '{}' did not resolve", field),
            }
        }

        Ok(ElementsResponse { elements })
    }

    pub(crate) async fn resolve_prompt(
        &self,
        prompt: &str,
        only_one: bool,
        options: &GetElementOptions,
        scope: &ActionScope,
    ) -> Result<Option<Vec<Locator>>> {
        let start = Instant::now();
        let mut backoff = Backoff::new();
        let mut attempt = 0;

        loop {
            let remaining = options.timeout.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                log::info!("No element found for '{}' after {} attempts", prompt, attempt);
                scope.record(EventKind::Failed, format!("not found after {} attempts", attempt), None);
                return Ok(None);
            }

            let use_cache = options.use_cache && remaining > CACHE_BYPASS_MARGIN && attempt <= LAST_CACHED_ATTEMPT;
            scope.record(
                EventKind::Attempt,
                prompt,
                Some(serde_json::json!({ "attempt": attempt, "use_cache": use_cache })),
            );

            let attempt_start = Instant::now();
            if let Some(locators) = self.resolve_once(prompt, only_one, use_cache).await? {
                log::debug!("Resolved '{}' to {} element(s) on attempt {}", prompt, locators.len(), attempt);
                return Ok(Some(locators));
            }

            let remaining = options.timeout.saturating_sub(start.elapsed());
            backoff.wait(attempt_start.elapsed(), remaining).await;
            attempt += 1;
        }
    }

    async fn resolve_once(&self, prompt: &str, only_one: bool, use_cache: bool) -> Result<Option<Vec<Locator>>> {
        let snapshot = self.snapshot().await?;
        let request = GetElementsRequest {
            page_information: self.information_from(&snapshot),
            prompt: Prompt::from(prompt),
            use_cache,
            only_one,
        };

        let response = self.api().resolve_elements(&request).await?;
        if response.status != Status::Success {
            log::debug!(
                "Resolver answered {:?} for '{}': {}",
                response.status,
                prompt,
                response.message.as_deref().unwrap_or_default()
            );
            return Ok(None);
        }

        let candidates = match &response.selectors {
            Some(selectors @ Selectors::List(_)) => selectors.list().unwrap_or_default(),
            Some(Selectors::Fields(_)) => {
                log::warn!("Resolver answered per-field selectors for a single prompt '{}'", prompt);
                return Ok(None);
            }
            None => return Ok(None),
        };

        Ok(snapshot.match_candidates(&candidates, only_one))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Candidate, GetElementResponse};
    use crate::error::BrowserError;
    use crate::testing::{Harness, MockApi, MockPage};

    fn login_page() -> MockPage {
        let page = MockPage::new("https://example.com/login");
        page.set_html(
            &[],
            r#"<html d-id="h"><body d-id="b"><input d-id="user" name="user"><input d-id="pass" name="pass"><button d-id="submit">Sign in</button><button d-id="reset">Reset</button></body></html>"#,
        );
        page
    }

    fn use_cache_flags(api: &MockApi) -> Vec<bool> {
        api.resolve_requests.lock().iter().map(|r| r.use_cache).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolves_on_third_attempt() {
        let api = MockApi::new();
        api.on_resolve(|_, call| if call == 2 { Ok(MockApi::selectors(&["button"])) } else { Ok(MockApi::no_match()) });
        let harness = Harness::new(login_page(), api).await;
        let page = harness.active().await;

        let start = Instant::now();
        let element = page
            .get_element("the sign in button", &GetElementOptions::new().timeout(Duration::from_secs(2)))
            .await
            .unwrap()
            .expect("element resolved");

        assert_eq!(element.locator().id, "submit");
        assert_eq!(harness.api.resolve_calls(), 3);
        assert_eq!(start.elapsed(), Duration::from_millis(600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_below_first_backoff_returns_none() {
        let harness = Harness::new(login_page(), MockApi::new()).await;
        let page = harness.active().await;

        let start = Instant::now();
        let element = page
            .get_element("the sign in button", &GetElementOptions::new().timeout(Duration::from_millis(100)))
            .await
            .unwrap();

        assert!(element.is_none());
        assert_eq!(harness.api.resolve_calls(), 1);
        assert_eq!(start.elapsed(), Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_bypassed_near_deadline() {
        let harness = Harness::new(login_page(), MockApi::new()).await;
        let page = harness.active().await;

        let options = GetElementOptions::new().timeout(Duration::from_millis(155));
        assert!(page.get_element("anything", &options).await.unwrap().is_none());
        assert_eq!(use_cache_flags(&harness.api), vec![true, false]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_bypassed_after_third_attempt() {
        let harness = Harness::new(login_page(), MockApi::new()).await;
        let page = harness.active().await;

        let options = GetElementOptions::new().timeout(Duration::from_secs(10));
        assert!(page.get_element("anything", &options).await.unwrap().is_none());
        assert_eq!(use_cache_flags(&harness.api), vec![true, true, true, false, false, false]);

        harness.api.resolve_requests.lock().clear();
        let options = options.use_cache(false);
        assert!(page.get_element("anything", &options).await.unwrap().is_none());
        assert!(use_cache_flags(&harness.api).iter().all(|flag| !flag));
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_candidate_wins() {
        let api = MockApi::new();
        api.on_resolve(|request, _| {
            assert!(request.only_one);
            assert_eq!(request.prompt, Prompt::Single("a button".into()));
            Ok(MockApi::selectors(&["[d-id=\"reset\"]", "table", "[d-id=\"submit\"]"]))
        });
        let harness = Harness::new(login_page(), api).await;
        let page = harness.active().await;

        let element = page.get_element("a button", &GetElementOptions::default()).await.unwrap().unwrap();
        assert_eq!(element.locator().id, "submit");
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_elements_returns_all_matches() {
        let api = MockApi::new();
        api.on_resolve(|request, _| {
            assert!(!request.only_one);
            Ok(MockApi::selectors(&["button"]))
        });
        let harness = Harness::new(login_page(), api).await;
        let page = harness.active().await;

        let elements = page.get_elements("every button", &GetElementOptions::default()).await.unwrap();
        let ids: Vec<_> = elements.iter().map(|e| e.locator().id.as_str()).collect();
        assert_eq!(ids, vec!["submit", "reset"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_fields_omits_unresolved() {
        let api = MockApi::new();
        api.on_resolve(|request, _| match &request.prompt {
            Prompt::Single(p) if p == "username input" => Ok(MockApi::selectors(&["input[name=user]"])),
            Prompt::Single(p) if p == "password input" => Ok(GetElementResponse {
                status: Status::Success,
                selectors: Some(Selectors::List(vec![Candidate::Detailed { selector: "input[name=pass]".into() }])),
                message: None,
            }),
            _ => Ok(MockApi::no_match()),
        });
        let harness = Harness::new(login_page(), api).await;
        let page = harness.active().await;

        let mut fields = IndexMap::new();
        fields.insert("username".to_string(), "username input".to_string());
        fields.insert("captcha".to_string(), "captcha input".to_string());
        fields.insert("password".to_string(), "password input".to_string());

        let options = GetElementOptions::new().timeout(Duration::from_secs(1));
        let response = page.get_fields(&fields, &options).await.unwrap();

        assert_eq!(response.len(), 2);
        assert_eq!(response.get("username").unwrap().locator().id, "user");
        assert_eq!(response.get("password").unwrap().locator().id, "pass");
        assert!(!response.contains("captcha"));
        let order: Vec<_> = response.iter().map(|(field, _)| field.as_str()).collect();
        assert_eq!(order, vec!["username", "password"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_errors_propagate() {
        let api = MockApi::new();
        api.on_resolve(|_, _| {
            Err(BrowserError::Api { endpoint: "actions/get-interaction-selector".into(), status: 502, body: "".into() })
        });
        let harness = Harness::new(login_page(), api).await;
        let page = harness.active().await;

        let result = page.get_element("anything", &GetElementOptions::default()).await;
        assert!(matches!(result, Err(BrowserError::Api { status: 502, .. })));
        assert_eq!(harness.api.resolve_calls(), 1);
    }
}
