//! Extraction, questions about the page and waiting on page conditions.

use crate::api::{AskPageRequest, ExtractRequest, Status};
use crate::error::{BrowserError, Result};
use crate::logging::{ActionScope, EventKind};
use crate::page::retry::{attempt_with_backoff, Attempt, Backoff};
use crate::page::Page;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_EXTRACT_TIMEOUT: Duration = Duration::from_secs(180);
pub const DEFAULT_ASK_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_WAIT_FOR_TIMEOUT: Duration = Duration::from_secs(30);

/// Budget of the cache-only extraction phase
const CACHE_PHASE_BUDGET: Duration = Duration::from_secs(5);

const WAIT_FOR_POLL: Duration = Duration::from_millis(500);
const WAIT_FOR_SETTLE: Duration = Duration::from_millis(200);

/// Pages younger than this get a loading hint in questions
const LOADING_HINT_WINDOW: Duration = Duration::from_secs(5);

/// Options for [`Page::extract`]
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Try cached extraction scripts first
    pub use_cache: bool,
    pub timeout: Duration,
    /// Let the service look at the screenshot, not only the HTML
    pub use_screenshot: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self { use_cache: true, timeout: DEFAULT_EXTRACT_TIMEOUT, use_screenshot: true }
    }
}

impl ExtractOptions {
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

    pub fn use_screenshot(mut self, use_screenshot: bool) -> Self {
        self.use_screenshot = use_screenshot;
        self
    }
}

/// Answer to a question about the page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskResponse {
    pub description: String,
    pub return_data: Value,
}

impl Page {
    /// Extract data described by `prompt`, shaped by an optional JSON schema.
    ///
    /// Returns `Ok(None)` when nothing could be extracted within the budget.
    pub async fn extract(&self, prompt: &str, schema: Option<Value>, options: &ExtractOptions) -> Result<Option<Value>> {
        let scope = self.log().scope("extract");
        let start = Instant::now();

        if options.use_cache {
            let budget = CACHE_PHASE_BUDGET.min(options.timeout);
            let cached =
                attempt_with_backoff(budget, || self.extract_once(prompt, schema.as_ref(), options, true, &scope))
                    .await?;
            if cached.is_some() {
                return Ok(cached);
            }
            log::debug!("No cached extraction for '{}', running the agent", prompt);
        }

        let remaining = options.timeout.saturating_sub(start.elapsed());
        let data =
            attempt_with_backoff(remaining, || self.extract_once(prompt, schema.as_ref(), options, false, &scope))
                .await?;
        if data.is_none() {
            log::info!("Extraction of '{}' gave no data within {:?}", prompt, options.timeout);
            scope.record(EventKind::Failed, "no data", None);
        }
        Ok(data)
    }

    /// [`Page::extract`] with the schema derived from `T` and the data decoded into it
    pub async fn extract_as<T>(&self, prompt: &str, options: &ExtractOptions) -> Result<Option<T>>
    where
        T: DeserializeOwned + JsonSchema,
    {
        let schema = serde_json::to_value(schemars::schema_for!(T))?;
        match self.extract(prompt, Some(schema), options).await? {
            Some(data) => Ok(Some(serde_json::from_value(data)?)),
            None => Ok(None),
        }
    }

    async fn extract_once(
        &self,
        prompt: &str,
        schema: Option<&Value>,
        options: &ExtractOptions,
        force_use_cache: bool,
        scope: &ActionScope,
    ) -> Result<Attempt<Value>> {
        let snapshot = self.snapshot().await?;
        let request = ExtractRequest {
            page_information: self.information_from(&snapshot),
            prompt: prompt.to_string(),
            return_data_json_schema: schema.cloned(),
            use_screenshot: options.use_screenshot,
            // Only the cache phase may answer from a stored script
            use_cache: force_use_cache,
            force_use_cache,
        };

        let response = self.api().extract(&request).await?;
        let message = response.message.clone().unwrap_or_default();
        scope.record(
            EventKind::Attempt,
            format!("{:?} {}", response.status, message),
            Some(json!({ "force_use_cache": force_use_cache, "used_cache": response.used_cache })),
        );

        match response.status {
            Status::Success => {
                if let Some(script) = &response.created_script {
                    log::debug!("Extraction script for '{}':\n{}", prompt, script);
                }
                Ok(Attempt::Done(response.return_data.unwrap_or(Value::Null)))
            }
            Status::Impossible => {
                log::warn!("Extraction of '{}' reported impossible: {}", prompt, message);
                Ok(Attempt::GiveUp)
            }
            status => {
                log::debug!("Extraction of '{}' answered {:?}: {}", prompt, status, message);
                Ok(Attempt::Retry)
            }
        }
    }

    /// Ask a question about the page, retrying while the service answers with an error.
    ///
    /// Raises [`BrowserError::PageConditionNotMet`] with the last screenshot when
    /// no answer arrives within `timeout`.
    pub async fn ask(&self, prompt: &str, return_schema: Option<Value>, timeout: Duration) -> Result<AskResponse> {
        let scope = self.log().scope("ask");
        let start = Instant::now();
        let mut backoff = Backoff::new();
        let mut attempts = 0;
        let mut last_screenshot = String::new();

        loop {
            let remaining = timeout.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                break;
            }

            let attempt_start = Instant::now();
            let snapshot = self.snapshot().await?;
            last_screenshot = snapshot.screenshot_or_empty();

            let since_load = self.time_since_navigation();
            let question = if since_load < LOADING_HINT_WINDOW {
                format!(
                    "{}\n\n(The page was loaded {} seconds ago, it may still be loading.)",
                    prompt,
                    since_load.as_secs()
                )
            } else {
                prompt.to_string()
            };

            let request = AskPageRequest {
                prompt: question,
                return_schema: return_schema.clone(),
                page_information: self.information_from(&snapshot),
            };
            let response = self.api().ask(&request).await?;
            attempts += 1;

            if response.status != Status::Error {
                scope.record(EventKind::Info, response.description.clone(), Some(response.return_data.clone()));
                return Ok(AskResponse { description: response.description, return_data: response.return_data });
            }

            log::warn!("Ask attempt {} failed: {}", attempts, response.description);
            let remaining = timeout.saturating_sub(start.elapsed());
            backoff.wait(attempt_start.elapsed(), remaining).await;
        }

        scope.record(EventKind::Failed, format!("no answer after {} attempts", attempts), None);
        Err(BrowserError::PageConditionNotMet {
            message: format!("No answer to '{}' after {} attempts within {}ms", prompt, attempts, timeout.as_millis()),
            screenshot: last_screenshot,
        })
    }

    /// Ask a yes/no question
    pub async fn ask_bool(&self, prompt: &str, timeout: Duration) -> Result<bool> {
        let response = self.ask(prompt, Some(json!({ "type": "boolean" })), timeout).await?;
        Ok(serde_json::from_value(response.return_data)?)
    }

    /// Ask with the answer schema derived from `T`
    pub async fn ask_as<T>(&self, prompt: &str, timeout: Duration) -> Result<T>
    where
        T: DeserializeOwned + JsonSchema,
    {
        let schema = serde_json::to_value(schemars::schema_for!(T))?;
        let response = self.ask(prompt, Some(schema), timeout).await?;
        Ok(serde_json::from_value(response.return_data)?)
    }

    /// Poll until the described thing is present on the page
    pub async fn wait_for(&self, prompt: &str, timeout: Duration) -> Result<()> {
        let _scope = self.log().scope("wait_for");
        let start = Instant::now();
        let question = format!(
            "Prompt: '{}'\n\nReturn a boolean that determines if the requested information or thing is available on the page.",
            prompt
        );

        tokio::time::sleep(WAIT_FOR_SETTLE.min(timeout)).await;

        loop {
            let remaining = timeout.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                break;
            }

            match self.ask_bool(&question, remaining).await {
                Ok(true) => return Ok(()),
                Ok(false) => log::debug!("Condition '{}' not met yet", prompt),
                Err(e @ (BrowserError::PageConditionNotMet { .. } | BrowserError::Serialization(_))) => {
                    log::debug!("Condition '{}' undecided: {}", prompt, e)
                }
                Err(e) => return Err(e),
            }

            let remaining = timeout.saturating_sub(start.elapsed());
            tokio::time::sleep(WAIT_FOR_POLL.min(remaining)).await;
        }

        let screenshot = self.screenshot(true).await.unwrap_or_default();
        Err(BrowserError::PageConditionNotMet {
            message: format!("'{}' was not met within {}ms", prompt, timeout.as_millis()),
            screenshot,
        })
    }

    /// The page, or the section matching `prompt`, as Markdown
    pub async fn markdown(&self, prompt: Option<&str>) -> Result<String> {
        let _scope = self.log().scope("markdown");

        let html = match prompt {
            Some(prompt) => {
                let request =
                    format!("Extract and return the html for this requested section of the website:\n\n{}", prompt);
                match self.extract(&request, Some(json!({ "type": "string" })), &ExtractOptions::default()).await? {
                    Some(Value::String(html)) => html,
                    Some(other) => other.to_string(),
                    None => {
                        return Err(BrowserError::ElementNotFound(format!("No section matches '{}'", prompt)));
                    }
                }
            }
            None => self.snapshot().await?.html,
        };

        Ok(collapse_blank_lines(&html2md::parse_html(&html)))
    }
}

/// Collapse runs of three or more newlines to two
fn collapse_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut newlines = 0;

    for c in text.chars() {
        if c == '\n' {
            newlines += 1;
            if newlines <= 2 {
                out.push(c);
            }
        } else {
            newlines = 0;
            out.push(c);
        }
    }

    out
}
