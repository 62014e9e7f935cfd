//! Pages and the intent operations on them.
//!
//! A [`Page`] is a handle to one open page of a session. It combines the
//! native driver with the session's remote service client, so every
//! capability (resolution, actions, extraction, keyboard, navigation) is a set
//! of methods on the same type, split across the submodules.

mod element;
mod extract;
mod keyboard;
mod navigation;
mod resolve;
mod retry;
pub(crate) mod scripts;

pub use element::{ClickOptions, Element, FillOptions, HoverOptions, DEFAULT_INTERACTION_TIMEOUT};
pub use extract::{AskResponse, ExtractOptions, DEFAULT_ASK_TIMEOUT, DEFAULT_EXTRACT_TIMEOUT, DEFAULT_WAIT_FOR_TIMEOUT};
pub use keyboard::{PressOptions, ScrollOptions};
pub use navigation::{normalize_url, GotoOptions, DEFAULT_NAVIGATION_TIMEOUT};
pub use resolve::{ElementsResponse, GetElementOptions, DEFAULT_RESOLVE_TIMEOUT};

use crate::api::{BrowserApi, PageInformation};
use crate::browser::driver::{Download, FileChooser, LifecycleEvent, PageDriver};
use crate::browser::session::BrowserContext;
use crate::dom::snapshot::{build_snapshot, PageSnapshot};
use crate::error::Result;
use crate::logging::{ActionLog, EventKind};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Default wait for file choosers and downloads
pub const DEFAULT_EVENT_TIMEOUT: Duration = Duration::from_secs(30);

/// One open page of a session. Cheap to clone.
#[derive(Clone)]
pub struct Page {
    driver: Arc<dyn PageDriver>,
    ctx: Arc<BrowserContext>,
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page").field("id", &self.driver.id()).finish()
    }
}

impl Page {
    pub(crate) fn new(driver: Arc<dyn PageDriver>, ctx: Arc<BrowserContext>) -> Self {
        Self { driver, ctx }
    }

    pub fn id(&self) -> &str {
        self.driver.id()
    }

    /// The native driver behind this page
    pub fn driver(&self) -> &Arc<dyn PageDriver> {
        &self.driver
    }

    pub(crate) fn api(&self) -> &dyn BrowserApi {
        self.ctx.api.as_ref()
    }

    pub(crate) fn log(&self) -> &ActionLog {
        &self.ctx.settings.action_log
    }

    pub(crate) fn context(&self) -> &Arc<BrowserContext> {
        &self.ctx
    }

    pub async fn url(&self) -> Result<String> {
        self.driver.url().await
    }

    /// Time since the last main-frame navigation
    pub fn time_since_navigation(&self) -> Duration {
        self.driver.events().since_navigation()
    }

    /// Tag every reachable frame and capture the composite document and a screenshot
    pub async fn snapshot(&self) -> Result<PageSnapshot> {
        build_snapshot(self.driver.as_ref()).await
    }

    /// A fresh snapshot in the form sent to the remote service
    pub async fn page_information(&self) -> Result<PageInformation> {
        let snapshot = self.snapshot().await?;
        Ok(self.information_from(&snapshot))
    }

    pub(crate) fn information_from(&self, snapshot: &PageSnapshot) -> PageInformation {
        PageInformation::from_snapshot(snapshot, self.time_since_navigation().as_secs_f64())
    }

    /// Base64 JPEG of the viewport or the whole page
    pub async fn screenshot(&self, full_page: bool) -> Result<String> {
        self.driver.screenshot(full_page).await
    }

    /// Evaluate a JavaScript expression in the top-level document
    pub async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        self.driver.evaluate(&[], script).await
    }

    pub async fn reload(&self) -> Result<()> {
        self.driver.reload().await
    }

    pub async fn bring_to_front(&self) -> Result<()> {
        self.driver.bring_to_front().await
    }

    /// Close this page. If it was active, the most recently opened remaining page takes over.
    pub async fn close(&self) -> Result<()> {
        self.driver.close().await?;
        self.ctx.apply(vec![LifecycleEvent::Closed(self.id().to_string())]).await;
        Ok(())
    }

    /// Wait for the page to open a file chooser
    pub async fn get_file_chooser(&self, timeout: Duration) -> Result<FileChooser> {
        self.driver.events().file_chooser.get(timeout).await
    }

    /// Wait for a file chooser and answer it with `paths`, made absolute
    pub async fn upload_files(&self, paths: &[PathBuf], timeout: Duration) -> Result<()> {
        let scope = self.log().scope("upload_files");
        let files = absolute_paths(paths)?;
        let chooser = self.get_file_chooser(timeout).await?;
        scope.record(EventKind::Info, format!("Setting {} file(s)", files.len()), None);
        self.driver.accept_file_chooser(&chooser, &files).await
    }

    /// Wait for the page to start a download
    pub async fn get_download(&self, timeout: Duration) -> Result<Download> {
        self.driver.events().download.get(timeout).await
    }
}

pub(crate) fn absolute_paths(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    paths.iter().map(|path| Ok(std::path::absolute(path)?)).collect()
}
