//! `headless_chrome` implementation of the driver seams.
//!
//! Every CDP call blocks, so each one runs on the blocking pool. Browser-level
//! lifecycle is reconstructed by reconciling the engine's tab list with the
//! pages already reported; crash, file chooser, download and navigation
//! notifications come from per-tab event listeners.

use crate::auth::{Cookie, LocalStorageEntry, OriginState, StorageState};
use crate::browser::config::{ConnectionOptions, LaunchOptions};
use crate::browser::driver::{
    BrowserDriver, Download, FileChooser, LifecycleEvent, Modifier, PageDriver, PageEvents, Point, Rect,
};
use crate::error::{BrowserError, Result};
use async_trait::async_trait;
use headless_chrome::browser::tab::point::Point as ChromePoint;
use headless_chrome::browser::tab::ModifierKey;
use headless_chrome::protocol::cdp::types::Event;
use headless_chrome::protocol::cdp::{Network, Page, DOM};
use headless_chrome::{Browser, Tab};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Idle timeout of the DevTools connection
const IDLE_TIMEOUT: Duration = Duration::from_secs(60 * 60);

const LOAD_POLL_INTERVAL: Duration = Duration::from_millis(100);

const SCREENSHOT_QUALITY: u32 = 80;

const PAGE_SIZE_SCRIPT: &str = "JSON.stringify({ width: Math.max(document.documentElement.scrollWidth, document.body ? document.body.scrollWidth : 0), height: Math.max(document.documentElement.scrollHeight, document.body ? document.body.scrollHeight : 0) })";

const SCROLL_OFFSET_SCRIPT: &str = "JSON.stringify({ x: window.scrollX, y: window.scrollY })";

const LOCAL_STORAGE_SCRIPT: &str = "JSON.stringify({ origin: location.origin, entries: Object.entries(window.localStorage || {}) })";

/// Run a blocking closure against a tab on the blocking pool
async fn on_tab<T, F>(tab: &Arc<Tab>, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&Tab) -> Result<T> + Send + 'static,
{
    let tab = tab.clone();
    tokio::task::spawn_blocking(move || f(&tab))
        .await
        .map_err(|e| BrowserError::TabOperationFailed(format!("Browser task failed: {}", e)))?
}

/// Statements that walk from the top window into the frame at `frame_path`,
/// leaving it in `win`, or evaluate `on_unreachable` when a hop cannot be entered
fn frame_walk(frame_path: &[String], on_unreachable: &str) -> String {
    let path = Value::from(frame_path.to_vec()).to_string();
    format!(
        "let win = window; \
         for (const id of {path}) {{ \
           const sel = 'iframe[d-id=\"' + id + '\"], frame[d-id=\"' + id + '\"]'; \
           const frame = win.document.querySelector(sel); \
           let next = null; \
           try {{ next = frame && frame.contentWindow; if (next && !next.document.body) {{ next = null; }} }} catch (e) {{ next = null; }} \
           if (!next) {{ {on_unreachable} }} \
           win = next; \
         }}"
    )
}

/// Wrap an expression so it runs inside the frame at `frame_path` and reports
/// `{ok, value}` / `{ok, error}` / `{unreachable}` as a JSON string
fn in_frame(frame_path: &[String], script: &str) -> String {
    let walk = frame_walk(frame_path, "return JSON.stringify({ unreachable: id });");
    let script = Value::String(script.to_string()).to_string();
    format!(
        "(function () {{ {walk} \
           try {{ const value = win.eval({script}); return JSON.stringify({{ ok: true, value: value === undefined ? null : value }}); }} \
           catch (e) {{ return JSON.stringify({{ ok: false, error: String(e) }}); }} \
         }})()"
    )
}

fn parse_frame_result(frame_path: &[String], raw: Option<Value>) -> Result<Value> {
    let text = raw
        .as_ref()
        .and_then(Value::as_str)
        .ok_or_else(|| BrowserError::EvaluationFailed("Frame script returned no result".to_string()))?;
    let result: Value = serde_json::from_str(text)?;

    if let Some(id) = result.get("unreachable") {
        return Err(BrowserError::FrameUnreachable(format!("Cannot enter frame {} of {:?}", id, frame_path)));
    }
    if result.get("ok").and_then(Value::as_bool) != Some(true) {
        let error = result.get("error").and_then(Value::as_str).unwrap_or("unknown error");
        return Err(BrowserError::EvaluationFailed(error.to_string()));
    }
    Ok(result.get("value").cloned().unwrap_or(Value::Null))
}

fn modifier_key(modifier: Modifier) -> ModifierKey {
    match modifier {
        Modifier::Alt => ModifierKey::Alt,
        Modifier::Control => ModifierKey::Ctrl,
        Modifier::Meta => ModifierKey::Meta,
        Modifier::Shift => ModifierKey::Shift,
    }
}

fn evaluate_json(tab: &Tab, script: &str) -> Result<Value> {
    let value = tab
        .evaluate(script, false)
        .map_err(|e| BrowserError::EvaluationFailed(e.to_string()))?
        .value
        .and_then(|v| v.as_str().map(str::to_string))
        .ok_or_else(|| BrowserError::EvaluationFailed("Script returned no value".to_string()))?;
    Ok(serde_json::from_str(&value)?)
}

fn capture(tab: &Tab, clip: Option<Page::Viewport>, beyond_viewport: bool) -> Result<String> {
    tab.call_method(Page::CaptureScreenshot {
        format: Some(Page::CaptureScreenshotFormatOption::Jpeg),
        quality: Some(SCREENSHOT_QUALITY),
        clip,
        from_surface: Some(true),
        capture_beyond_viewport: Some(beyond_viewport),
        optimize_for_speed: None,
    })
    .map(|shot| shot.data)
    .map_err(|e| BrowserError::TabOperationFailed(format!("Failed to capture screenshot: {}", e)))
}

/// A Chrome tab driven over CDP
pub struct ChromePage {
    id: String,
    tab: Arc<Tab>,
    events: Arc<PageEvents>,
}

impl ChromePage {
    /// Wrap a tab: install event listeners, intercept file choosers and route downloads.
    /// Blocking.
    fn attach(tab: Arc<Tab>, downloads_dir: &Path, crashes: Arc<Mutex<Vec<String>>>) -> Result<Self> {
        let id = tab.get_target_id().to_string();
        let events = Arc::new(PageEvents::default());

        let listener = {
            let events = events.clone();
            let downloads_dir = downloads_dir.to_path_buf();
            let id = id.clone();
            Arc::new(move |event: &Event| match event {
                Event::PageFileChooserOpened(ev) => {
                    log::debug!("File chooser opened on {}", id);
                    events.file_chooser.set(FileChooser {
                        backend_node_id: ev.params.backend_node_id,
                        frame_id: ev.params.frame_id.clone(),
                        multiple: format!("{:?}", ev.params.mode).contains("Multiple"),
                    });
                }
                Event::PageDownloadWillBegin(ev) => {
                    log::debug!("Download {} started on {}", ev.params.suggested_filename, id);
                    events.download.set(Download {
                        guid: ev.params.guid.clone(),
                        url: ev.params.url.clone(),
                        suggested_filename: ev.params.suggested_filename.clone(),
                        path: downloads_dir.join(&ev.params.suggested_filename),
                    });
                }
                Event::PageFrameNavigated(ev) if ev.params.frame.parent_id.is_none() => events.mark_navigated(),
                Event::InspectorTargetCrashed(_) => crashes.lock().push(id.clone()),
                _ => {}
            })
        };

        tab.add_event_listener(listener)
            .map_err(|e| BrowserError::TabOperationFailed(format!("Failed to listen on tab {}: {}", id, e)))?;

        if let Err(e) = tab.set_file_chooser_dialog_interception(true, None) {
            log::warn!("File chooser interception unavailable on {}: {}", id, e);
        }

        std::fs::create_dir_all(downloads_dir)?;
        if let Err(e) = tab.call_method(Page::SetDownloadBehavior {
            behavior: Page::SetDownloadBehaviorBehaviorOption::Allow,
            download_path: Some(downloads_dir.to_string_lossy().into_owned()),
        }) {
            log::warn!("Download routing unavailable on {}: {}", id, e);
        }

        Ok(Self { id, tab, events })
    }

    pub fn tab(&self) -> &Arc<Tab> {
        &self.tab
    }
}

#[async_trait]
impl PageDriver for ChromePage {
    fn id(&self) -> &str {
        &self.id
    }

    fn events(&self) -> &PageEvents {
        &self.events
    }

    async fn url(&self) -> Result<String> {
        on_tab(&self.tab, |tab| Ok(tab.get_url())).await
    }

    async fn goto(&self, url: &str) -> Result<()> {
        let target = url.to_string();
        on_tab(&self.tab, move |tab| {
            tab.navigate_to(&target)
                .map_err(|e| BrowserError::NavigationFailed(format!("Failed to navigate to {}: {}", target, e)))?
                .wait_until_navigated()
                .map_err(|e| BrowserError::NavigationFailed(format!("Navigation to {} did not finish: {}", target, e)))?;
            Ok(())
        })
        .await?;
        self.events.mark_navigated();
        Ok(())
    }

    async fn reload(&self) -> Result<()> {
        on_tab(&self.tab, |tab| {
            tab.reload(false, None).map_err(|e| BrowserError::NavigationFailed(format!("Failed to reload: {}", e)))?;
            Ok(())
        })
        .await
    }

    async fn bring_to_front(&self) -> Result<()> {
        on_tab(&self.tab, |tab| {
            tab.bring_to_front()
                .map_err(|e| BrowserError::TabOperationFailed(format!("Failed to bring tab to front: {}", e)))?;
            Ok(())
        })
        .await
    }

    async fn close(&self) -> Result<()> {
        on_tab(&self.tab, |tab| {
            tab.close(true).map_err(|e| BrowserError::TabOperationFailed(format!("Failed to close tab: {}", e)))?;
            Ok(())
        })
        .await
    }

    async fn evaluate(&self, frame_path: &[String], script: &str) -> Result<Value> {
        let path = frame_path.to_vec();
        let expression = in_frame(frame_path, script);
        on_tab(&self.tab, move |tab| {
            let object = tab.evaluate(&expression, false).map_err(|e| BrowserError::EvaluationFailed(e.to_string()))?;
            parse_frame_result(&path, object.value)
        })
        .await
    }

    async fn wait_for_load(&self, timeout: Duration) -> Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let state = self.evaluate(&[], "document.readyState").await.ok();
            if state.as_ref().and_then(Value::as_str) == Some("complete") {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(BrowserError::Timeout(format!(
                    "Page did not finish loading within {}ms",
                    timeout.as_millis()
                )));
            }
            tokio::time::sleep(LOAD_POLL_INTERVAL).await;
        }
    }

    async fn screenshot(&self, full_page: bool) -> Result<String> {
        on_tab(&self.tab, move |tab| {
            if !full_page {
                return capture(tab, None, false);
            }
            let size = evaluate_json(tab, PAGE_SIZE_SCRIPT)?;
            let clip = Page::Viewport {
                x: 0.0,
                y: 0.0,
                width: size["width"].as_f64().unwrap_or(1280.0),
                height: size["height"].as_f64().unwrap_or(800.0),
                scale: 1.0,
            };
            capture(tab, Some(clip), true)
        })
        .await
    }

    async fn screenshot_clip(&self, clip: Rect) -> Result<String> {
        on_tab(&self.tab, move |tab| {
            let offset = evaluate_json(tab, SCROLL_OFFSET_SCRIPT)?;
            let viewport = Page::Viewport {
                x: clip.x + offset["x"].as_f64().unwrap_or_default(),
                y: clip.y + offset["y"].as_f64().unwrap_or_default(),
                width: clip.width,
                height: clip.height,
                scale: 1.0,
            };
            capture(tab, Some(viewport), true)
        })
        .await
    }

    async fn click_at(&self, point: Point) -> Result<()> {
        on_tab(&self.tab, move |tab| {
            tab.click_point(ChromePoint { x: point.x, y: point.y })
                .map_err(|e| BrowserError::TabOperationFailed(format!("Click at ({}, {}) failed: {}", point.x, point.y, e)))?;
            Ok(())
        })
        .await
    }

    async fn move_mouse_to(&self, point: Point) -> Result<()> {
        on_tab(&self.tab, move |tab| {
            tab.move_mouse_to_point(ChromePoint { x: point.x, y: point.y })
                .map_err(|e| BrowserError::TabOperationFailed(format!("Mouse move failed: {}", e)))?;
            Ok(())
        })
        .await
    }

    async fn type_text(&self, text: &str) -> Result<()> {
        let text = text.to_string();
        on_tab(&self.tab, move |tab| {
            tab.type_str(&text).map_err(|e| BrowserError::TabOperationFailed(format!("Typing failed: {}", e)))?;
            Ok(())
        })
        .await
    }

    async fn press_key(&self, key: &str, modifiers: &[Modifier]) -> Result<()> {
        let key = key.to_string();
        let modifiers: Vec<ModifierKey> = modifiers.iter().copied().map(modifier_key).collect();
        on_tab(&self.tab, move |tab| {
            let modifiers = if modifiers.is_empty() { None } else { Some(modifiers.as_slice()) };
            tab.press_key_with_modifiers(&key, modifiers)
                .map_err(|e| BrowserError::TabOperationFailed(format!("Failed to press {}: {}", key, e)))?;
            Ok(())
        })
        .await
    }

    async fn accept_file_chooser(&self, chooser: &FileChooser, files: &[PathBuf]) -> Result<()> {
        let backend_node_id = chooser.backend_node_id.ok_or_else(|| {
            BrowserError::InvalidArgument("File chooser is not attached to an input element".to_string())
        })?;
        let files: Vec<String> = files.iter().map(|f| f.to_string_lossy().into_owned()).collect();
        on_tab(&self.tab, move |tab| {
            tab.call_method(DOM::SetFileInputFiles {
                files,
                node_id: None,
                backend_node_id: Some(backend_node_id),
                object_id: None,
            })
            .map_err(|e| BrowserError::TabOperationFailed(format!("Failed to set files: {}", e)))?;
            Ok(())
        })
        .await
    }

    async fn set_input_files(&self, frame_path: &[String], selector: &str, files: &[PathBuf]) -> Result<()> {
        let walk = frame_walk(frame_path, "return null;");
        let selector_literal = Value::String(selector.to_string()).to_string();
        let expression = format!("(function () {{ {} return win.document.querySelector({}); }})()", walk, selector_literal);
        let selector = selector.to_string();
        let files: Vec<String> = files.iter().map(|f| f.to_string_lossy().into_owned()).collect();

        on_tab(&self.tab, move |tab| {
            let object_id = tab
                .evaluate(&expression, false)
                .map_err(|e| BrowserError::EvaluationFailed(e.to_string()))?
                .object_id
                .ok_or_else(|| BrowserError::ElementNotFound(format!("No file input matches {}", selector)))?;
            tab.call_method(DOM::SetFileInputFiles { files, node_id: None, backend_node_id: None, object_id: Some(object_id) })
                .map_err(|e| BrowserError::TabOperationFailed(format!("Failed to set files: {}", e)))?;
            Ok(())
        })
        .await
    }
}

/// A Chrome process (launched or connected) driven over CDP
pub struct ChromeBrowser {
    browser: Browser,
    known: Mutex<HashMap<String, Arc<ChromePage>>>,
    /// Targets opened for internal work, never surfaced as pages
    helpers: Arc<Mutex<HashSet<String>>>,
    crashes: Arc<Mutex<Vec<String>>>,
    downloads_dir: PathBuf,
}

impl ChromeBrowser {
    /// Launch a new browser instance with the given options
    pub async fn launch(options: &LaunchOptions) -> Result<Self> {
        let options = options.clone();
        let downloads_dir = options.resolved_downloads_dir();

        let browser = tokio::task::spawn_blocking(move || {
            let mut launch_opts = headless_chrome::LaunchOptions::default();

            // Hide the automation flags anti-bot checks look for
            launch_opts.ignore_default_args.push(OsStr::new("--enable-automation"));
            launch_opts.args.push(OsStr::new("--disable-blink-features=AutomationControlled"));

            launch_opts.idle_browser_timeout = IDLE_TIMEOUT;
            launch_opts.headless = options.headless;
            launch_opts.window_size = Some((options.window_width, options.window_height));
            launch_opts.path = options.chrome_path;
            launch_opts.user_data_dir = options.user_data_dir;
            launch_opts.sandbox = options.sandbox;

            Browser::new(launch_opts).map_err(|e| BrowserError::LaunchFailed(e.to_string()))
        })
        .await
        .map_err(|e| BrowserError::LaunchFailed(e.to_string()))??;

        Ok(Self::wrap(browser, downloads_dir))
    }

    /// Connect to an existing browser instance via WebSocket
    pub async fn connect(options: &ConnectionOptions) -> Result<Self> {
        let ws_url = options.ws_url.clone();
        let connect = tokio::task::spawn_blocking(move || {
            Browser::connect_with_timeout(ws_url, IDLE_TIMEOUT).map_err(|e| BrowserError::ConnectionFailed(e.to_string()))
        });

        let browser = tokio::time::timeout(Duration::from_millis(options.timeout), connect)
            .await
            .map_err(|_| {
                BrowserError::ConnectionFailed(format!("No connection to {} within {}ms", options.ws_url, options.timeout))
            })?
            .map_err(|e| BrowserError::ConnectionFailed(e.to_string()))??;

        Ok(Self::wrap(browser, options.resolved_downloads_dir()))
    }

    fn wrap(browser: Browser, downloads_dir: PathBuf) -> Self {
        Self {
            browser,
            known: Mutex::new(HashMap::new()),
            helpers: Arc::new(Mutex::new(HashSet::new())),
            crashes: Arc::new(Mutex::new(Vec::new())),
            downloads_dir,
        }
    }

    /// Get the underlying Browser instance
    pub fn browser(&self) -> &Browser {
        &self.browser
    }

    fn tabs(&self) -> Result<Vec<Arc<Tab>>> {
        let tabs = self
            .browser
            .get_tabs()
            .lock()
            .map_err(|e| BrowserError::TabOperationFailed(format!("Failed to get tabs: {}", e)))?
            .clone();
        Ok(tabs)
    }
}

#[async_trait]
impl BrowserDriver for ChromeBrowser {
    async fn new_page(&self) -> Result<Arc<dyn PageDriver>> {
        let browser = self.browser.clone();
        let downloads_dir = self.downloads_dir.clone();
        let crashes = self.crashes.clone();

        let page = tokio::task::spawn_blocking(move || {
            let tab = browser
                .new_tab()
                .map_err(|e| BrowserError::TabOperationFailed(format!("Failed to create tab: {}", e)))?;
            ChromePage::attach(tab, &downloads_dir, crashes).map(Arc::new)
        })
        .await
        .map_err(|e| BrowserError::TabOperationFailed(e.to_string()))??;

        self.known.lock().insert(page.id.clone(), page.clone());
        Ok(page)
    }

    async fn drain_events(&self) -> Vec<LifecycleEvent> {
        let tabs = match self.tabs() {
            Ok(tabs) => tabs,
            Err(e) => {
                log::warn!("Cannot reconcile tabs: {}", e);
                return Vec::new();
            }
        };

        let mut events = Vec::new();
        let live: Vec<String> = tabs.iter().map(|tab| tab.get_target_id().to_string()).collect();

        let fresh: Vec<Arc<Tab>> = {
            let known = self.known.lock();
            let mut helpers = self.helpers.lock();
            helpers.retain(|id| live.contains(id));
            tabs.into_iter()
                .filter(|tab| {
                    let id = tab.get_target_id().as_str();
                    !known.contains_key(id) && !helpers.contains(id)
                })
                .collect()
        };

        if !fresh.is_empty() {
            let downloads_dir = self.downloads_dir.clone();
            let crashes = self.crashes.clone();
            let attached = tokio::task::spawn_blocking(move || {
                fresh
                    .into_iter()
                    .filter_map(|tab| match ChromePage::attach(tab, &downloads_dir, crashes.clone()) {
                        Ok(page) => Some(Arc::new(page)),
                        Err(e) => {
                            log::warn!("Failed to attach to a new tab: {}", e);
                            None
                        }
                    })
                    .collect::<Vec<_>>()
            })
            .await
            .unwrap_or_else(|e| {
                log::warn!("Attaching new tabs failed: {}", e);
                Vec::new()
            });

            let mut known = self.known.lock();
            for page in attached {
                known.insert(page.id.clone(), page.clone());
                events.push(LifecycleEvent::Opened(page));
            }
        }

        {
            let mut known = self.known.lock();
            let gone: Vec<String> = known.keys().filter(|id| !live.contains(id)).cloned().collect();
            for id in gone {
                known.remove(&id);
                events.push(LifecycleEvent::Closed(id));
            }
        }

        events.extend(self.crashes.lock().drain(..).map(LifecycleEvent::Crashed));
        events
    }

    async fn storage_state(&self) -> Result<StorageState> {
        let tabs = self.tabs()?;
        tokio::task::spawn_blocking(move || {
            let mut state = StorageState::default();

            for tab in tabs {
                match tab.get_cookies() {
                    Ok(cookies) => {
                        for cookie in cookies {
                            let cookie: Cookie = serde_json::from_value(serde_json::to_value(&cookie)?)?;
                            let duplicate = state
                                .cookies
                                .iter()
                                .any(|c| c.name == cookie.name && c.domain == cookie.domain && c.path == cookie.path);
                            if !duplicate {
                                state.cookies.push(cookie);
                            }
                        }
                    }
                    Err(e) => log::debug!("No cookies from tab: {}", e),
                }

                let Ok(storage) = evaluate_json(&tab, LOCAL_STORAGE_SCRIPT) else {
                    continue;
                };
                let origin = storage["origin"].as_str().unwrap_or_default().to_string();
                if !origin.starts_with("http") || state.origins.iter().any(|o| o.origin == origin) {
                    continue;
                }
                let local_storage = storage["entries"]
                    .as_array()
                    .map(|entries| {
                        entries
                            .iter()
                            .filter_map(|entry| {
                                Some(LocalStorageEntry {
                                    name: entry.get(0)?.as_str()?.to_string(),
                                    value: entry.get(1)?.as_str()?.to_string(),
                                })
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                state.origins.push(OriginState { origin, local_storage });
            }

            Ok(state)
        })
        .await
        .map_err(|e| BrowserError::TabOperationFailed(e.to_string()))?
    }

    async fn apply_storage_state(&self, state: &StorageState) -> Result<()> {
        let browser = self.browser.clone();
        let helpers = self.helpers.clone();
        let state = state.clone();

        tokio::task::spawn_blocking(move || {
            let tab = browser
                .new_tab()
                .map_err(|e| BrowserError::TabOperationFailed(format!("Failed to create tab: {}", e)))?;
            helpers.lock().insert(tab.get_target_id().to_string());

            let cookies = state
                .cookies
                .iter()
                .map(|cookie| {
                    let mut param = json!({
                        "name": cookie.name,
                        "value": cookie.value,
                        "domain": cookie.domain,
                        "path": cookie.path,
                        "secure": cookie.secure,
                        "httpOnly": cookie.http_only,
                    });
                    if cookie.expires > 0.0 {
                        param["expires"] = json!(cookie.expires);
                    }
                    if let Some(same_site) = &cookie.same_site {
                        param["sameSite"] = json!(same_site);
                    }
                    serde_json::from_value::<Network::CookieParam>(param).map_err(BrowserError::from)
                })
                .collect::<Result<Vec<_>>>()?;

            if !cookies.is_empty() {
                tab.set_cookies(cookies)
                    .map_err(|e| BrowserError::TabOperationFailed(format!("Failed to set cookies: {}", e)))?;
            }

            for origin in &state.origins {
                if origin.local_storage.is_empty() {
                    continue;
                }
                if let Err(e) = tab.navigate_to(&origin.origin).and_then(|tab| tab.wait_until_navigated()) {
                    log::warn!("Skipping local storage for {}: {}", origin.origin, e);
                    continue;
                }
                let entries = serde_json::to_string(&origin.local_storage)?;
                let script = format!(
                    "(function () {{ for (const e of {}) {{ window.localStorage.setItem(e.name, e.value); }} return true; }})()",
                    entries
                );
                tab.evaluate(&script, false).map_err(|e| BrowserError::EvaluationFailed(e.to_string()))?;
            }

            if let Err(e) = tab.close(false) {
                log::debug!("Failed to close storage tab: {}", e);
            }
            Ok(())
        })
        .await
        .map_err(|e| BrowserError::TabOperationFailed(e.to_string()))?
    }

    async fn close(&self) -> Result<()> {
        // headless_chrome has no explicit close; the process goes away with the
        // last handle, so close every tab to shut the session down now.
        let tabs = self.tabs()?;
        tokio::task::spawn_blocking(move || {
            for tab in tabs {
                if let Err(e) = tab.close(false) {
                    log::debug!("Failed to close tab: {}", e);
                }
            }
        })
        .await
        .map_err(|e| BrowserError::TabOperationFailed(e.to_string()))?;
        self.known.lock().clear();
        Ok(())
    }
}
