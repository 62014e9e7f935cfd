//! Resolved elements and the interactions performed on them.
//!
//! Every interaction goes through a fallback chain: a real input event once
//! the element is visible, then a forced real event on a short timeout, then a
//! synthetic DOM event. When an expected outcome is given, the page is
//! snapshotted before and after and the remote verifier judges the result.

use crate::api::{InteractionResponse, InteractionType, MakeInteractionRequest, PageDelta, Status};
use crate::browser::driver::Rect;
use crate::dom::locator::Locator;
use crate::error::{BrowserError, Result};
use crate::logging::{ActionScope, EventKind};
use crate::page::resolve::GetElementOptions;
use crate::page::{absolute_paths, scripts, Page};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Instant;

/// Default wait for an element to become visible before a real input event
pub const DEFAULT_INTERACTION_TIMEOUT: Duration = Duration::from_millis(2000);

/// Timeout of the forced fallback attempt
const FORCED_TIMEOUT: Duration = Duration::from_millis(2000);

const VISIBILITY_POLL: Duration = Duration::from_millis(100);

/// How long to watch the active page's URL after a verified interaction
const NAVIGATION_WINDOW: Duration = Duration::from_millis(2000);

const NAVIGATION_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    Forced,
    Synthetic,
}

#[derive(Debug, Deserialize)]
struct ElementBox {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    visible: bool,
}

impl ElementBox {
    fn rect(&self) -> Rect {
        Rect { x: self.x, y: self.y, width: self.width, height: self.height }
    }
}

/// Options for clicking
#[derive(Debug, Clone)]
pub struct ClickOptions {
    /// Wait for the element to become visible
    pub timeout: Duration,
    /// Skip the visibility wait
    pub force: bool,
    /// Outcome the remote verifier should confirm
    pub expected_outcome: Option<String>,
    /// Resolution settings for prompt-based clicks
    pub resolve: GetElementOptions,
}

impl Default for ClickOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_INTERACTION_TIMEOUT,
            force: false,
            expected_outcome: None,
            resolve: GetElementOptions::default(),
        }
    }
}

impl ClickOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn expected_outcome(mut self, outcome: impl Into<String>) -> Self {
        self.expected_outcome = Some(outcome.into());
        self
    }

    pub fn resolve(mut self, options: GetElementOptions) -> Self {
        self.resolve = options;
        self
    }
}

/// Options for filling
#[derive(Debug, Clone)]
pub struct FillOptions {
    pub timeout: Duration,
    pub force: bool,
    pub expected_outcome: Option<String>,
    pub resolve: GetElementOptions,
}

impl Default for FillOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_INTERACTION_TIMEOUT,
            force: false,
            expected_outcome: None,
            resolve: GetElementOptions::default(),
        }
    }
}

impl FillOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn expected_outcome(mut self, outcome: impl Into<String>) -> Self {
        self.expected_outcome = Some(outcome.into());
        self
    }

    pub fn resolve(mut self, options: GetElementOptions) -> Self {
        self.resolve = options;
        self
    }
}

/// Options for hovering
#[derive(Debug, Clone)]
pub struct HoverOptions {
    pub timeout: Duration,
    pub force: bool,
    pub expected_outcome: Option<String>,
    pub resolve: GetElementOptions,
}

impl Default for HoverOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_INTERACTION_TIMEOUT,
            force: false,
            expected_outcome: None,
            resolve: GetElementOptions::default(),
        }
    }
}

impl HoverOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn expected_outcome(mut self, outcome: impl Into<String>) -> Self {
        self.expected_outcome = Some(outcome.into());
        self
    }

    pub fn resolve(mut self, options: GetElementOptions) -> Self {
        self.resolve = options;
        self
    }
}

struct Interaction<'a> {
    kind: InteractionType,
    value: Option<&'a str>,
    timeout: Duration,
    force: bool,
    expected_outcome: Option<&'a str>,
}

/// An element resolved on a page, addressed by its frame path and identity token
#[derive(Clone)]
pub struct Element {
    locator: Locator,
    page: Page,
}

impl std::fmt::Debug for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Element").field("locator", &self.locator).field("page", &self.page.id()).finish()
    }
}

impl Element {
    pub(crate) fn new(locator: Locator, page: Page) -> Self {
        Self { locator, page }
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    /// Identity token qualified by its frame path
    pub fn id(&self) -> String {
        self.locator.qualified_id()
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub async fn click(&self, options: ClickOptions) -> Result<InteractionResponse> {
        let scope = self.page.log().scope("click");
        self.interact(
            Interaction {
                kind: InteractionType::Click,
                value: None,
                timeout: options.timeout,
                force: options.force,
                expected_outcome: options.expected_outcome.as_deref(),
            },
            &scope,
        )
        .await
    }

    /// Replace the element's value with `value`
    pub async fn fill(&self, value: &str, options: FillOptions) -> Result<InteractionResponse> {
        let scope = self.page.log().scope("fill");
        self.interact(
            Interaction {
                kind: InteractionType::Fill,
                value: Some(value),
                timeout: options.timeout,
                force: options.force,
                expected_outcome: options.expected_outcome.as_deref(),
            },
            &scope,
        )
        .await
    }

    pub async fn hover(&self, options: HoverOptions) -> Result<InteractionResponse> {
        let scope = self.page.log().scope("hover");
        self.interact(
            Interaction {
                kind: InteractionType::Hover,
                value: None,
                timeout: options.timeout,
                force: options.force,
                expected_outcome: options.expected_outcome.as_deref(),
            },
            &scope,
        )
        .await
    }

    pub async fn focus(&self) -> Result<()> {
        self.run(&scripts::focus(&self.locator)).await.map(|_| ())
    }

    pub async fn outer_html(&self) -> Result<String> {
        let value = self.run(&scripts::outer_html(&self.locator)).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| BrowserError::EvaluationFailed(format!("outerHTML of {} is not a string", self.locator)))
    }

    /// Box in top-level page coordinates, `None` when the element is detached
    pub async fn bounding_box(&self) -> Result<Option<Rect>> {
        Ok(self.read_box(false).await?.map(|b| b.rect()))
    }

    /// Base64 JPEG of the element's box
    pub async fn screenshot(&self) -> Result<String> {
        let rect = self
            .read_box(true)
            .await?
            .map(|b| b.rect())
            .filter(|rect| !rect.is_empty())
            .ok_or_else(|| BrowserError::ElementNotFound(format!("{} has no visible box", self.locator)))?;
        self.page.driver().screenshot_clip(rect).await
    }

    /// Outline the element for `duration`
    pub async fn highlight(&self, duration: Duration) -> Result<()> {
        self.run(&scripts::highlight(&self.locator, duration.as_millis() as u64)).await.map(|_| ())
    }

    /// Set files on this `<input type=file>`; paths are made absolute
    pub async fn upload_files(&self, paths: &[PathBuf]) -> Result<()> {
        let _scope = self.page.log().scope("set_input_files");
        let files = absolute_paths(paths)?;
        self.page.driver().set_input_files(&self.locator.frame_path, &self.locator.css(), &files).await
    }

    /// Evaluate an element script; a `null` answer means the element is gone
    async fn run(&self, script: &str) -> Result<serde_json::Value> {
        let value = self.page.driver().evaluate(&self.locator.frame_path, script).await?;
        if value.is_null() {
            return Err(BrowserError::ElementNotFound(format!("{} is not attached", self.locator)));
        }
        Ok(value)
    }

    async fn read_box(&self, scroll_into_view: bool) -> Result<Option<ElementBox>> {
        let value = self
            .page
            .driver()
            .evaluate(&self.locator.frame_path, &scripts::bounding_box(&self.locator, scroll_into_view))
            .await?;
        if value.is_null() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(value)?))
    }

    /// Poll until the element is attached (and visible, when required)
    async fn wait_for_box(&self, timeout: Duration, require_visible: bool) -> Result<Rect> {
        let deadline = Instant::now() + timeout;

        loop {
            match self.read_box(true).await {
                Ok(Some(b)) if !require_visible || (b.visible && !b.rect().is_empty()) => return Ok(b.rect()),
                Ok(_) => {}
                Err(e @ BrowserError::FrameUnreachable(_)) => log::debug!("Waiting for {}: {}", self.locator, e),
                Err(e) => return Err(e),
            }

            let now = Instant::now();
            if now >= deadline {
                let state = if require_visible { "visible" } else { "attached" };
                return Err(BrowserError::Timeout(format!(
                    "{} was not {} within {}ms",
                    self.locator,
                    state,
                    timeout.as_millis()
                )));
            }
            tokio::time::sleep(VISIBILITY_POLL.min(deadline - now)).await;
        }
    }

    async fn interact(&self, interaction: Interaction<'_>, scope: &ActionScope) -> Result<InteractionResponse> {
        let Some(expected) = interaction.expected_outcome else {
            self.perform(&interaction, scope).await?;
            return Ok(InteractionResponse { status: Status::Success, message: String::new() });
        };

        let before = self.page.snapshot().await?;
        let page_before = self.page.information_from(&before);

        self.perform(&interaction, scope).await?;

        let url_changed = self.wait_for_url_change(&before.url).await;
        let after_page = match self.page.context().active_driver().await {
            Ok(driver) => Page::new(driver, self.page.context().clone()),
            Err(e) => {
                log::debug!("Falling back to the interacted page: {}", e);
                self.page.clone()
            }
        };
        let after = after_page.snapshot().await?;

        let request = MakeInteractionRequest {
            url: before.url.clone(),
            dendrite_id: self.locator.qualified_id(),
            interaction_type: interaction.kind,
            value: interaction.value.map(str::to_string),
            expected_outcome: expected.to_string(),
            url_changed,
            page_delta: PageDelta { page_before, page_after: after_page.information_from(&after) },
        };

        let response = self.page.api().verify_outcome(&request).await?;
        if response.status == Status::Failed {
            scope.record(EventKind::Failed, response.message.clone(), None);
            return Err(BrowserError::IncorrectOutcome {
                message: response.message,
                screenshot: after.screenshot_or_empty(),
            });
        }

        scope.record(EventKind::Info, format!("verified: {}", response.message), None);
        Ok(response)
    }

    /// True when the active page's URL moves away from `start_url` within the navigation window
    async fn wait_for_url_change(&self, start_url: &str) -> bool {
        let deadline = Instant::now() + NAVIGATION_WINDOW;

        loop {
            let current = match self.page.context().active_driver().await {
                Ok(driver) => driver.url().await,
                Err(e) => Err(e),
            };
            match current {
                Ok(url) if url != start_url => {
                    log::debug!("URL changed from {} to {}", start_url, url);
                    return true;
                }
                Ok(_) => {}
                Err(e) => log::debug!("Could not read the page URL: {}", e),
            }

            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            tokio::time::sleep(NAVIGATION_POLL.min(deadline - now)).await;
        }
    }

    async fn perform(&self, interaction: &Interaction<'_>, scope: &ActionScope) -> Result<()> {
        let modes: &[Mode] =
            if interaction.force { &[Mode::Forced, Mode::Synthetic] } else { &[Mode::Normal, Mode::Forced, Mode::Synthetic] };

        let mut last_error = None;
        for &mode in modes {
            match self.perform_once(interaction, mode).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    log::warn!("{} on {} failed in {:?} mode: {}", interaction.kind.as_str(), self.locator, mode, e);
                    scope.record(EventKind::Fallback, format!("{:?}: {}", mode, e), None);
                    last_error = Some(e);
                }
            }
        }

        Err(match last_error {
            Some(e) => e,
            None => BrowserError::ElementNotFound(self.locator.to_string()),
        })
    }

    async fn perform_once(&self, interaction: &Interaction<'_>, mode: Mode) -> Result<()> {
        let driver = self.page.driver();

        if mode == Mode::Synthetic {
            let script = match interaction.kind {
                InteractionType::Click => scripts::dispatch_click(&self.locator),
                InteractionType::Hover => scripts::dispatch_hover(&self.locator),
                InteractionType::Fill => scripts::set_value(&self.locator, interaction.value.unwrap_or_default()),
            };
            return self.run(&script).await.map(|_| ());
        }

        let rect = match mode {
            Mode::Normal => self.wait_for_box(interaction.timeout, true).await?,
            _ => self.wait_for_box(FORCED_TIMEOUT, false).await?,
        };

        match interaction.kind {
            InteractionType::Click => driver.click_at(rect.center()).await,
            InteractionType::Hover => driver.move_mouse_to(rect.center()).await,
            InteractionType::Fill => {
                self.run(&scripts::clear_value(&self.locator)).await?;
                driver.type_text(interaction.value.unwrap_or_default()).await
            }
        }
    }
}

impl Page {
    async fn require_element(&self, prompt: &str, options: &GetElementOptions) -> Result<Element> {
        self.get_element(prompt, options)
            .await?
            .ok_or_else(|| BrowserError::ElementNotFound(format!("No element matches '{}'", prompt)))
    }

    /// Resolve `prompt` and click the element
    pub async fn click(&self, prompt: &str, options: ClickOptions) -> Result<InteractionResponse> {
        let element = self.require_element(prompt, &options.resolve).await?;
        element.click(options).await
    }

    /// Resolve `prompt` and fill the element with `value`
    pub async fn fill(&self, prompt: &str, value: &str, options: FillOptions) -> Result<InteractionResponse> {
        let element = self.require_element(prompt, &options.resolve).await?;
        element.fill(value, options).await
    }

    /// Resolve `prompt` and hover the element
    pub async fn hover(&self, prompt: &str, options: HoverOptions) -> Result<InteractionResponse> {
        let element = self.require_element(prompt, &options.resolve).await?;
        element.hover(options).await
    }

    /// Resolve every prompt concurrently, then fill each element with its value
    pub async fn fill_fields(&self, fields: &IndexMap<String, String>, options: FillOptions) -> Result<()> {
        let prompts: IndexMap<String, String> = fields.keys().map(|prompt| (prompt.clone(), prompt.clone())).collect();
        let elements = self.get_fields(&prompts, &options.resolve).await?;

        for (prompt, value) in fields {
            let element = elements
                .get(prompt)
                .ok_or_else(|| BrowserError::ElementNotFound(format!("No element matches '{}'", prompt)))?;
            element.fill(value, options.clone()).await?;
        }
        Ok(())
    }
}
