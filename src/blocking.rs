//! Blocking front-end.
//!
//! The types here wrap the async [`crate::Browser`], [`crate::Page`] and
//! [`crate::Element`] and drive them on a single-threaded runtime owned by the
//! session. Do not call them from inside an async context.
//!
//! ```rust,no_run
//! use intent_browser::blocking::Browser;
//! use intent_browser::{ApiConfig, ClickOptions, GotoOptions, LaunchOptions};
//!
//! # fn main() -> intent_browser::Result<()> {
//! let browser = Browser::launch(LaunchOptions::new(), ApiConfig::from_env()?)?;
//! let page = browser.goto("example.com", GotoOptions::default())?;
//! page.click("the 'More information' link", ClickOptions::default())?;
//! browser.close()?;
//! # Ok(())
//! # }
//! ```

use crate::api::{ApiConfig, InteractionResponse, PageInformation};
use crate::auth::StorageState;
use crate::browser::config::{ConnectionOptions, LaunchOptions};
use crate::browser::driver::{Download, Rect};
use crate::dom::locator::Locator;
use crate::error::Result;
use crate::page::{
    AskResponse, ClickOptions, ExtractOptions, FillOptions, GetElementOptions, GotoOptions, HoverOptions,
    PressOptions, ScrollOptions,
};
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

#[derive(Clone)]
struct Handle {
    runtime: Arc<Runtime>,
}

impl Handle {
    fn new() -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        Ok(Self { runtime: Arc::new(runtime) })
    }

    fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

/// Blocking browser session
#[derive(Clone)]
pub struct Browser {
    inner: crate::Browser,
    handle: Handle,
}

impl Browser {
    pub fn launch(options: LaunchOptions, api: ApiConfig) -> Result<Self> {
        let handle = Handle::new()?;
        let inner = handle.block_on(crate::Browser::launch(options, api))?;
        Ok(Self { inner, handle })
    }

    pub fn connect(options: ConnectionOptions, api: ApiConfig) -> Result<Self> {
        let handle = Handle::new()?;
        let inner = handle.block_on(crate::Browser::connect(options, api))?;
        Ok(Self { inner, handle })
    }

    /// The async session behind this handle
    pub fn as_async(&self) -> &crate::Browser {
        &self.inner
    }

    fn page(&self, inner: crate::Page) -> Page {
        Page { inner, handle: self.handle.clone() }
    }

    pub fn active_page(&self) -> Result<Page> {
        let inner = self.handle.block_on(self.inner.active_page())?;
        Ok(self.page(inner))
    }

    pub fn pages(&self) -> Result<Vec<Page>> {
        let pages = self.handle.block_on(self.inner.pages())?;
        Ok(pages.into_iter().map(|inner| self.page(inner)).collect())
    }

    pub fn switch_to(&self, page: &Page) -> Result<()> {
        self.handle.block_on(self.inner.switch_to(&page.inner))
    }

    pub fn new_tab(&self, url: &str, options: GotoOptions) -> Result<Page> {
        let inner = self.handle.block_on(self.inner.new_tab(url, options))?;
        Ok(self.page(inner))
    }

    pub fn goto(&self, url: &str, options: GotoOptions) -> Result<Page> {
        let inner = self.handle.block_on(self.inner.goto(url, options))?;
        Ok(self.page(inner))
    }

    pub fn get_download(&self, timeout: Duration) -> Result<Download> {
        self.handle.block_on(self.inner.get_download(timeout))
    }

    pub fn upload_files(&self, paths: &[PathBuf], timeout: Duration) -> Result<()> {
        self.handle.block_on(self.inner.upload_files(paths, timeout))
    }

    pub fn storage_state(&self) -> Result<StorageState> {
        self.handle.block_on(self.inner.storage_state())
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    pub fn close(&self) -> Result<()> {
        self.handle.block_on(self.inner.close())
    }
}

/// Blocking page handle
#[derive(Clone)]
pub struct Page {
    inner: crate::Page,
    handle: Handle,
}

impl Page {
    pub fn as_async(&self) -> &crate::Page {
        &self.inner
    }

    fn element(&self, inner: crate::Element) -> Element {
        Element { inner, handle: self.handle.clone() }
    }

    pub fn id(&self) -> &str {
        self.inner.id()
    }

    pub fn url(&self) -> Result<String> {
        self.handle.block_on(self.inner.url())
    }

    pub fn goto(&self, url: &str, options: GotoOptions) -> Result<()> {
        self.handle.block_on(self.inner.goto(url, options))
    }

    pub fn reload(&self) -> Result<()> {
        self.handle.block_on(self.inner.reload())
    }

    pub fn close(&self) -> Result<()> {
        self.handle.block_on(self.inner.close())
    }

    pub fn page_information(&self) -> Result<PageInformation> {
        self.handle.block_on(self.inner.page_information())
    }

    pub fn screenshot(&self, full_page: bool) -> Result<String> {
        self.handle.block_on(self.inner.screenshot(full_page))
    }

    pub fn evaluate(&self, script: &str) -> Result<Value> {
        self.handle.block_on(self.inner.evaluate(script))
    }

    pub fn get_element(&self, prompt: &str, options: &GetElementOptions) -> Result<Option<Element>> {
        let found = self.handle.block_on(self.inner.get_element(prompt, options))?;
        Ok(found.map(|inner| self.element(inner)))
    }

    pub fn get_elements(&self, prompt: &str, options: &GetElementOptions) -> Result<Vec<Element>> {
        let found = self.handle.block_on(self.inner.get_elements(prompt, options))?;
        Ok(found.into_iter().map(|inner| self.element(inner)).collect())
    }

    /// Resolve several fields; unresolved fields are absent
    pub fn get_fields(
        &self,
        fields: &IndexMap<String, String>,
        options: &GetElementOptions,
    ) -> Result<IndexMap<String, Element>> {
        let response = self.handle.block_on(self.inner.get_fields(fields, options))?;
        Ok(response.into_inner().into_iter().map(|(field, inner)| (field, self.element(inner))).collect())
    }

    pub fn click(&self, prompt: &str, options: ClickOptions) -> Result<InteractionResponse> {
        self.handle.block_on(self.inner.click(prompt, options))
    }

    pub fn fill(&self, prompt: &str, value: &str, options: FillOptions) -> Result<InteractionResponse> {
        self.handle.block_on(self.inner.fill(prompt, value, options))
    }

    pub fn hover(&self, prompt: &str, options: HoverOptions) -> Result<InteractionResponse> {
        self.handle.block_on(self.inner.hover(prompt, options))
    }

    pub fn fill_fields(&self, fields: &IndexMap<String, String>, options: FillOptions) -> Result<()> {
        self.handle.block_on(self.inner.fill_fields(fields, options))
    }

    pub fn extract(&self, prompt: &str, schema: Option<Value>, options: &ExtractOptions) -> Result<Option<Value>> {
        self.handle.block_on(self.inner.extract(prompt, schema, options))
    }

    pub fn extract_as<T>(&self, prompt: &str, options: &ExtractOptions) -> Result<Option<T>>
    where
        T: DeserializeOwned + JsonSchema,
    {
        self.handle.block_on(self.inner.extract_as(prompt, options))
    }

    pub fn ask(&self, prompt: &str, return_schema: Option<Value>, timeout: Duration) -> Result<AskResponse> {
        self.handle.block_on(self.inner.ask(prompt, return_schema, timeout))
    }

    pub fn ask_bool(&self, prompt: &str, timeout: Duration) -> Result<bool> {
        self.handle.block_on(self.inner.ask_bool(prompt, timeout))
    }

    pub fn wait_for(&self, prompt: &str, timeout: Duration) -> Result<()> {
        self.handle.block_on(self.inner.wait_for(prompt, timeout))
    }

    pub fn markdown(&self, prompt: Option<&str>) -> Result<String> {
        self.handle.block_on(self.inner.markdown(prompt))
    }

    pub fn press(&self, key: &str, options: &PressOptions) -> Result<()> {
        self.handle.block_on(self.inner.press(key, options))
    }

    pub fn scroll_to_bottom(&self, options: &ScrollOptions) -> Result<()> {
        self.handle.block_on(self.inner.scroll_to_bottom(options))
    }

    pub fn upload_files(&self, paths: &[PathBuf], timeout: Duration) -> Result<()> {
        self.handle.block_on(self.inner.upload_files(paths, timeout))
    }

    pub fn get_download(&self, timeout: Duration) -> Result<Download> {
        self.handle.block_on(self.inner.get_download(timeout))
    }
}

/// Blocking element handle
#[derive(Clone)]
pub struct Element {
    inner: crate::Element,
    handle: Handle,
}

impl Element {
    pub fn as_async(&self) -> &crate::Element {
        &self.inner
    }

    pub fn locator(&self) -> &Locator {
        self.inner.locator()
    }

    pub fn click(&self, options: ClickOptions) -> Result<InteractionResponse> {
        self.handle.block_on(self.inner.click(options))
    }

    pub fn fill(&self, value: &str, options: FillOptions) -> Result<InteractionResponse> {
        self.handle.block_on(self.inner.fill(value, options))
    }

    pub fn hover(&self, options: HoverOptions) -> Result<InteractionResponse> {
        self.handle.block_on(self.inner.hover(options))
    }

    pub fn focus(&self) -> Result<()> {
        self.handle.block_on(self.inner.focus())
    }

    pub fn outer_html(&self) -> Result<String> {
        self.handle.block_on(self.inner.outer_html())
    }

    pub fn bounding_box(&self) -> Result<Option<Rect>> {
        self.handle.block_on(self.inner.bounding_box())
    }

    pub fn screenshot(&self) -> Result<String> {
        self.handle.block_on(self.inner.screenshot())
    }

    pub fn highlight(&self, duration: Duration) -> Result<()> {
        self.handle.block_on(self.inner.highlight(duration))
    }

    pub fn upload_files(&self, paths: &[PathBuf]) -> Result<()> {
        self.handle.block_on(self.inner.upload_files(paths))
    }
}
