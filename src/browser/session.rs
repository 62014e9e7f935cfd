use crate::api::dto::{AuthenticateRequest, UploadAuthSessionRequest};
use crate::api::{ApiConfig, BrowserApi, HttpBrowserApi};
use crate::auth::{AuthSession, DomainState, StorageState};
use crate::browser::chrome::ChromeBrowser;
use crate::browser::config::{ConnectionOptions, LaunchOptions};
use crate::browser::driver::{BrowserDriver, Download, LifecycleEvent, PageDriver};
use crate::browser::page_manager::{Followup, PageManager};
use crate::error::{BrowserError, Result};
use crate::logging::ActionLog;
use crate::page::{GotoOptions, Page};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Per-session settings shared by every page
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub downloads_dir: PathBuf,
    pub auth_domains: Vec<String>,
    pub action_log: ActionLog,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            downloads_dir: std::env::temp_dir().join("intent-browser-downloads"),
            auth_domains: Vec::new(),
            action_log: ActionLog::disabled(),
        }
    }
}

impl SessionSettings {
    fn new(downloads_dir: PathBuf, auth_domains: Vec<String>, record_actions: bool) -> Self {
        let action_log = if record_actions { ActionLog::enabled() } else { ActionLog::disabled() };
        Self { downloads_dir, auth_domains, action_log }
    }
}

/// State shared by a session and all of its pages
pub(crate) struct BrowserContext {
    pub(crate) driver: Arc<dyn BrowserDriver>,
    pub(crate) api: Arc<dyn BrowserApi>,
    pub(crate) settings: SessionSettings,
    pages: Mutex<PageManager>,
}

impl BrowserContext {
    /// Feed pending lifecycle events to the page manager and run their follow-ups
    pub(crate) async fn sync_pages(&self) {
        let events = self.driver.drain_events().await;
        self.apply(events).await;
    }

    pub(crate) async fn apply(&self, events: Vec<LifecycleEvent>) {
        if events.is_empty() {
            return;
        }

        let followups: Vec<Followup> = {
            let mut pages = self.pages.lock();
            events.into_iter().map(|event| pages.apply(event)).collect()
        };

        for followup in followups {
            match followup {
                Followup::BringToFront(page) => {
                    if let Err(e) = page.bring_to_front().await {
                        log::warn!("Failed to bring page {} to front: {}", page.id(), e);
                    }
                }
                Followup::Reload(page) => {
                    if let Err(e) = page.reload().await {
                        log::warn!("Failed to reload crashed page {}: {}", page.id(), e);
                    }
                }
                Followup::None => {}
            }
        }
    }

    /// The active page, opening one if none is open
    pub(crate) async fn active_driver(&self) -> Result<Arc<dyn PageDriver>> {
        self.sync_pages().await;

        {
            let pages = self.pages.lock();
            if pages.is_closed() {
                return Err(BrowserError::BrowserNotLaunched("The browser session is closed".to_string()));
            }
            if let Some(page) = pages.active() {
                return Ok(page);
            }
        }

        log::debug!("No active page, opening one");
        self.open_driver().await
    }

    /// Open a page and make it active
    pub(crate) async fn open_driver(&self) -> Result<Arc<dyn PageDriver>> {
        if self.pages.lock().is_closed() {
            return Err(BrowserError::BrowserNotLaunched("The browser session is closed".to_string()));
        }
        let page = self.driver.new_page().await?;
        self.pages.lock().on_opened(page.clone());
        Ok(page)
    }
}

/// An intent-driven browser session.
///
/// The session owns the browser process (or connection), the remote service
/// client and the set of open pages. It is cheap to clone; clones share state.
///
/// # Example
///
/// ```rust,no_run
/// use intent_browser::{ApiConfig, Browser, ClickOptions, GotoOptions, LaunchOptions};
///
/// # async fn run() -> intent_browser::Result<()> {
/// let browser = Browser::launch(LaunchOptions::new(), ApiConfig::from_env()?).await?;
/// let page = browser.goto("news.ycombinator.com", GotoOptions::default()).await?;
/// page.click("the 'new' link in the header", ClickOptions::default()).await?;
/// browser.close().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Browser {
    ctx: Arc<BrowserContext>,
}

impl Browser {
    /// Launch a new browser instance with the given options
    pub async fn launch(options: LaunchOptions, api: ApiConfig) -> Result<Self> {
        let api = Arc::new(HttpBrowserApi::new(api)?);
        let driver = Arc::new(ChromeBrowser::launch(&options).await?);
        let settings =
            SessionSettings::new(options.resolved_downloads_dir(), options.auth_domains.clone(), options.record_actions);
        Self::from_drivers(driver, api, settings).await
    }

    /// Connect to an existing browser instance via WebSocket
    pub async fn connect(options: ConnectionOptions, api: ApiConfig) -> Result<Self> {
        let api = Arc::new(HttpBrowserApi::new(api)?);
        let driver = Arc::new(ChromeBrowser::connect(&options).await?);
        let settings =
            SessionSettings::new(options.resolved_downloads_dir(), options.auth_domains.clone(), options.record_actions);
        Self::from_drivers(driver, api, settings).await
    }

    /// Build a session over arbitrary driver and service implementations.
    ///
    /// When auth domains are configured, their stored session is fetched and
    /// applied before this returns.
    pub async fn from_drivers(
        driver: Arc<dyn BrowserDriver>,
        api: Arc<dyn BrowserApi>,
        settings: SessionSettings,
    ) -> Result<Self> {
        let browser =
            Self { ctx: Arc::new(BrowserContext { driver, api, settings, pages: Mutex::new(PageManager::new()) }) };

        if !browser.ctx.settings.auth_domains.is_empty() {
            browser.load_auth_session().await?;
        }

        Ok(browser)
    }

    async fn load_auth_session(&self) -> Result<()> {
        let domains = self.ctx.settings.auth_domains.clone();
        let scope = self.ctx.settings.action_log.scope("authenticate");

        let session = self.ctx.api.authenticate(&AuthenticateRequest { domains: domains.clone() }).await?;
        if let Some(user_agent) = &session.user_agent {
            log::debug!("Stored session was recorded with user agent {}", user_agent);
        }

        let state = session.to_storage_state();
        scope.record(
            crate::logging::EventKind::Info,
            format!("Applying {} cookies and {} origins", state.cookies.len(), state.origins.len()),
            None,
        );
        log::info!("Loaded auth session for {:?}", domains);
        self.ctx.driver.apply_storage_state(&state).await
    }

    pub fn action_log(&self) -> &ActionLog {
        &self.ctx.settings.action_log
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.ctx.settings
    }

    /// The active page. If no page is open, a new one is opened and made active.
    pub async fn active_page(&self) -> Result<Page> {
        let driver = self.ctx.active_driver().await?;
        Ok(Page::new(driver, self.ctx.clone()))
    }

    /// All open pages, in opening order
    pub async fn pages(&self) -> Result<Vec<Page>> {
        self.ctx.sync_pages().await;
        let drivers = self.ctx.pages.lock().pages();
        Ok(drivers.into_iter().map(|driver| Page::new(driver, self.ctx.clone())).collect())
    }

    /// Make an open page the active one
    pub async fn switch_to(&self, page: &Page) -> Result<()> {
        if !self.ctx.pages.lock().activate(page.id()) {
            return Err(BrowserError::TabOperationFailed(format!("Page {} is not open", page.id())));
        }
        page.bring_to_front().await
    }

    /// Open a new page, make it active and navigate it
    pub async fn new_tab(&self, url: &str, options: GotoOptions) -> Result<Page> {
        let driver = self.ctx.open_driver().await?;
        let page = Page::new(driver, self.ctx.clone());
        page.goto(url, options).await?;
        Ok(page)
    }

    /// Navigate the active page
    pub async fn goto(&self, url: &str, options: GotoOptions) -> Result<Page> {
        let page = self.active_page().await?;
        page.goto(url, options).await?;
        Ok(page)
    }

    /// Wait for a download on the active page
    pub async fn get_download(&self, timeout: Duration) -> Result<Download> {
        self.active_page().await?.get_download(timeout).await
    }

    /// Wait for a file chooser on the active page and answer it with `paths`
    pub async fn upload_files(&self, paths: &[PathBuf], timeout: Duration) -> Result<()> {
        self.active_page().await?.upload_files(paths, timeout).await
    }

    /// Cookies and local storage of the running browser
    pub async fn storage_state(&self) -> Result<StorageState> {
        self.ctx.driver.storage_state().await
    }

    pub fn is_closed(&self) -> bool {
        self.ctx.pages.lock().is_closed()
    }

    /// Close the session.
    ///
    /// Lifecycle events stop being handled first. With auth domains configured
    /// the current storage state is uploaded before the browser is released.
    pub async fn close(&self) -> Result<()> {
        if !self.ctx.pages.lock().close() {
            return Ok(());
        }
        let _scope = self.ctx.settings.action_log.scope("close");

        let domains = &self.ctx.settings.auth_domains;
        if !domains.is_empty() {
            let storage_state = self.ctx.driver.storage_state().await?;
            let auth_data = AuthSession {
                user_agent: None,
                domain_states: domains
                    .iter()
                    .map(|domain| DomainState { domain: domain.clone(), storage_state: storage_state.clone() })
                    .collect(),
            };
            self.ctx.api.upload_auth_session(&UploadAuthSessionRequest { auth_data, storage_state }).await?;
            log::info!("Uploaded auth session for {:?}", domains);
        }

        self.ctx.driver.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Cookie, StorageState};
    use crate::testing::{Harness, MockApi, MockBrowser, MockPage};

    fn cookie(name: &str) -> Cookie {
        Cookie {
            name: name.to_string(),
            value: "v".to_string(),
            domain: "example.com".to_string(),
            path: "/".to_string(),
            expires: -1.0,
            http_only: false,
            secure: true,
            same_site: None,
        }
    }

    #[tokio::test]
    async fn test_active_page_opens_lazily() {
        let driver = Arc::new(MockBrowser::new());
        let browser = Browser::from_drivers(driver.clone(), Arc::new(MockApi::new()), SessionSettings::default())
            .await
            .unwrap();

        let page = browser.active_page().await.unwrap();
        assert_eq!(driver.opened().len(), 1);

        let again = browser.active_page().await.unwrap();
        assert_eq!(page.id(), again.id());
        assert_eq!(driver.opened().len(), 1);
    }

    #[tokio::test]
    async fn test_external_page_becomes_active() {
        let harness = Harness::new(MockPage::new("https://a.test/"), MockApi::new()).await;
        assert_eq!(harness.active().await.id(), harness.page.id());

        let popup = Arc::new(MockPage::new("https://b.test/"));
        harness.driver.open_external(popup.clone());
        assert_eq!(harness.active().await.id(), popup.id());

        harness.driver.push_event(LifecycleEvent::Closed(popup.id().to_string()));
        assert_eq!(harness.active().await.id(), harness.page.id());
        assert_eq!(harness.page.fronts(), 1);
    }

    #[tokio::test]
    async fn test_crashed_page_is_reloaded() {
        let harness = Harness::new(MockPage::new("https://a.test/"), MockApi::new()).await;
        harness.active().await;

        harness.driver.push_event(LifecycleEvent::Crashed(harness.page.id().to_string()));
        assert_eq!(harness.active().await.id(), harness.page.id());
        assert_eq!(harness.page.reloads(), 1);
    }

    #[tokio::test]
    async fn test_new_tab_navigates_and_activates() {
        let harness = Harness::new(MockPage::new("https://a.test/"), MockApi::new()).await;

        let page = harness.browser.new_tab("example.com/docs", GotoOptions::default()).await.unwrap();
        assert_eq!(page.url().await.unwrap(), "https://example.com/docs");
        assert_eq!(harness.active().await.id(), page.id());
        assert_eq!(harness.browser.pages().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_auth_session_applied_and_uploaded() {
        let api = MockApi::new();
        api.on_authenticate(|request, _| {
            assert_eq!(request.domains, vec!["example.com".to_string()]);
            Ok(AuthSession {
                user_agent: Some("agent".to_string()),
                domain_states: vec![DomainState {
                    domain: "example.com".to_string(),
                    storage_state: StorageState { cookies: vec![cookie("sid")], origins: Vec::new() },
                }],
            })
        });
        let settings = SessionSettings { auth_domains: vec!["example.com".to_string()], ..Default::default() };
        let harness = Harness::with_settings(MockPage::new("https://example.com/"), api, settings).await;

        let applied = harness.driver.applied_states();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].cookies[0].name, "sid");

        harness.driver.set_storage_state(StorageState { cookies: vec![cookie("fresh")], origins: Vec::new() });
        harness.browser.close().await.unwrap();

        let uploads = harness.api.uploads.lock().clone();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].storage_state.cookies[0].name, "fresh");
        assert_eq!(uploads[0].auth_data.domain_states[0].domain, "example.com");
        assert!(harness.driver.is_closed());
    }

    #[tokio::test]
    async fn test_closed_session_rejects_pages() {
        let harness = Harness::new(MockPage::new("https://a.test/"), MockApi::new()).await;
        harness.browser.close().await.unwrap();
        harness.browser.close().await.unwrap();

        assert!(harness.browser.is_closed());
        assert!(harness.api.uploads.lock().is_empty());
        assert!(matches!(harness.browser.active_page().await, Err(BrowserError::BrowserNotLaunched(_))));
    }

    #[tokio::test]
    #[ignore] // Ignore by default, run with: cargo test -- --ignored
    async fn test_launch_browser() {
        let api = ApiConfig::new("test-key").unwrap();
        let browser = Browser::launch(LaunchOptions::new().headless(true), api).await.unwrap();

        let page = browser.goto("about:blank", GotoOptions::default()).await.unwrap();
        assert_eq!(page.url().await.unwrap(), "about:blank");
        browser.close().await.unwrap();
    }
}
