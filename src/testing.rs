//! In-memory drivers and a scripted remote service for unit tests.

use crate::api::dto::*;
use crate::api::BrowserApi;
use crate::auth::{AuthSession, StorageState};
use crate::browser::driver::{
    BrowserDriver, FileChooser, LifecycleEvent, Modifier, PageDriver, PageEvents, Point, Rect,
};
use crate::browser::session::{Browser, SessionSettings};
use crate::dom::snapshot::CONTENT_SCRIPT;
use crate::error::{BrowserError, Result};
use crate::page::Page;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

type ScriptResponder = Box<dyn Fn(&[String], &str) -> Result<Value> + Send + Sync>;

#[derive(Default)]
struct PageState {
    url: String,
    html: HashMap<Vec<String>, String>,
    url_after_click: Option<String>,
    tag_failures: usize,
    tag_calls: usize,
    load_waits: usize,
    fail_screenshots: bool,
    fail_clicks: bool,
    screenshots: usize,
    scripts: Vec<String>,
    clicks: Vec<Point>,
    moves: Vec<Point>,
    typed: Vec<String>,
    keys: Vec<(String, Vec<Modifier>)>,
    gotos: Vec<String>,
    reloads: usize,
    fronts: usize,
    closed: bool,
    chooser_files: Vec<PathBuf>,
    input_files: Vec<(String, Vec<PathBuf>)>,
}

/// Scripted page. Tagging and serialization are answered from per-frame HTML;
/// any other script goes to the responder, or gets a default answer.
pub struct MockPage {
    id: String,
    events: PageEvents,
    state: Mutex<PageState>,
    responder: Mutex<Option<ScriptResponder>>,
}

static PAGE_COUNTER: AtomicUsize = AtomicUsize::new(0);

impl MockPage {
    pub fn new(url: &str) -> Self {
        let id = format!("mock-{}", PAGE_COUNTER.fetch_add(1, Ordering::SeqCst));
        let page = Self {
            id,
            events: PageEvents::default(),
            state: Mutex::new(PageState { url: url.to_string(), ..Default::default() }),
            responder: Mutex::new(None),
        };
        page.set_html(&[], "<html><body></body></html>");
        page
    }

    pub fn set_html(&self, frame_path: &[&str], html: &str) {
        let path = frame_path.iter().map(|s| s.to_string()).collect();
        self.state.lock().html.insert(path, html.to_string());
    }

    pub fn set_url(&self, url: &str) {
        self.state.lock().url = url.to_string();
    }

    /// The next real click navigates to `url`
    pub fn navigate_on_click(&self, url: &str) {
        self.state.lock().url_after_click = Some(url.to_string());
    }

    /// Fail the next `n` tagging evaluations
    pub fn fail_tagging(&self, n: usize) {
        self.state.lock().tag_failures = n;
    }

    pub fn fail_screenshots(&self, fail: bool) {
        self.state.lock().fail_screenshots = fail;
    }

    pub fn fail_clicks(&self, fail: bool) {
        self.state.lock().fail_clicks = fail;
    }

    pub fn respond_with(&self, responder: impl Fn(&[String], &str) -> Result<Value> + Send + Sync + 'static) {
        *self.responder.lock() = Some(Box::new(responder));
    }

    pub fn tag_calls(&self) -> usize {
        self.state.lock().tag_calls
    }

    pub fn load_waits(&self) -> usize {
        self.state.lock().load_waits
    }

    pub fn screenshots_taken(&self) -> usize {
        self.state.lock().screenshots
    }

    /// Scripts other than tagging and serialization, in call order
    pub fn scripts(&self) -> Vec<String> {
        self.state.lock().scripts.clone()
    }

    pub fn clicks(&self) -> Vec<Point> {
        self.state.lock().clicks.clone()
    }

    pub fn moves(&self) -> Vec<Point> {
        self.state.lock().moves.clone()
    }

    pub fn typed(&self) -> Vec<String> {
        self.state.lock().typed.clone()
    }

    pub fn keys(&self) -> Vec<(String, Vec<Modifier>)> {
        self.state.lock().keys.clone()
    }

    pub fn gotos(&self) -> Vec<String> {
        self.state.lock().gotos.clone()
    }

    pub fn reloads(&self) -> usize {
        self.state.lock().reloads
    }

    pub fn fronts(&self) -> usize {
        self.state.lock().fronts
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn chooser_files(&self) -> Vec<PathBuf> {
        self.state.lock().chooser_files.clone()
    }

    pub fn input_files(&self) -> Vec<(String, Vec<PathBuf>)> {
        self.state.lock().input_files.clone()
    }

    fn default_response(script: &str) -> Value {
        if script.contains("getBoundingClientRect") {
            json!({"x": 10.0, "y": 20.0, "width": 100.0, "height": 30.0, "visible": true})
        } else if script.contains("return el.outerHTML") {
            json!("<button d-id=\"mock\">Mock</button>")
        } else {
            json!(true)
        }
    }
}

#[async_trait]
impl PageDriver for MockPage {
    fn id(&self) -> &str {
        &self.id
    }

    fn events(&self) -> &PageEvents {
        &self.events
    }

    async fn url(&self) -> Result<String> {
        Ok(self.state.lock().url.clone())
    }

    async fn goto(&self, url: &str) -> Result<()> {
        {
            let mut state = self.state.lock();
            state.url = url.to_string();
            state.gotos.push(url.to_string());
        }
        self.events.mark_navigated();
        Ok(())
    }

    async fn reload(&self) -> Result<()> {
        self.state.lock().reloads += 1;
        Ok(())
    }

    async fn bring_to_front(&self) -> Result<()> {
        self.state.lock().fronts += 1;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.state.lock().closed = true;
        Ok(())
    }

    async fn evaluate(&self, frame_path: &[String], script: &str) -> Result<Value> {
        if script.contains("framePath") {
            let mut state = self.state.lock();
            state.tag_calls += 1;
            if !state.html.contains_key(frame_path) {
                return Err(BrowserError::FrameUnreachable(format!("{:?}", frame_path)));
            }
            if state.tag_failures > 0 {
                state.tag_failures -= 1;
                return Err(BrowserError::EvaluationFailed("document is not ready".to_string()));
            }
            return Ok(json!(1));
        }

        if script == CONTENT_SCRIPT {
            let state = self.state.lock();
            return state
                .html
                .get(frame_path)
                .map(|html| Value::String(html.clone()))
                .ok_or_else(|| BrowserError::FrameUnreachable(format!("{:?}", frame_path)));
        }

        self.state.lock().scripts.push(script.to_string());
        match self.responder.lock().as_ref() {
            Some(responder) => responder(frame_path, script),
            None => Ok(Self::default_response(script)),
        }
    }

    async fn wait_for_load(&self, _timeout: Duration) -> Result<()> {
        self.state.lock().load_waits += 1;
        Ok(())
    }

    async fn screenshot(&self, _full_page: bool) -> Result<String> {
        let mut state = self.state.lock();
        if state.fail_screenshots {
            return Err(BrowserError::TabOperationFailed("screenshot unavailable".to_string()));
        }
        state.screenshots += 1;
        Ok(format!("shot-{}", state.screenshots))
    }

    async fn screenshot_clip(&self, clip: Rect) -> Result<String> {
        Ok(format!("clip-{}x{}", clip.width, clip.height))
    }

    async fn click_at(&self, point: Point) -> Result<()> {
        let mut state = self.state.lock();
        if state.fail_clicks {
            return Err(BrowserError::TabOperationFailed("click intercepted".to_string()));
        }
        state.clicks.push(point);
        if let Some(url) = state.url_after_click.take() {
            state.url = url;
        }
        Ok(())
    }

    async fn move_mouse_to(&self, point: Point) -> Result<()> {
        self.state.lock().moves.push(point);
        Ok(())
    }

    async fn type_text(&self, text: &str) -> Result<()> {
        self.state.lock().typed.push(text.to_string());
        Ok(())
    }

    async fn press_key(&self, key: &str, modifiers: &[Modifier]) -> Result<()> {
        self.state.lock().keys.push((key.to_string(), modifiers.to_vec()));
        Ok(())
    }

    async fn accept_file_chooser(&self, _chooser: &FileChooser, files: &[PathBuf]) -> Result<()> {
        self.state.lock().chooser_files = files.to_vec();
        Ok(())
    }

    async fn set_input_files(&self, _frame_path: &[String], selector: &str, files: &[PathBuf]) -> Result<()> {
        self.state.lock().input_files.push((selector.to_string(), files.to_vec()));
        Ok(())
    }
}

/// Browser whose lifecycle events are pushed by the test
#[derive(Default)]
pub struct MockBrowser {
    opened: Mutex<Vec<Arc<MockPage>>>,
    pending: Mutex<Vec<LifecycleEvent>>,
    storage: Mutex<StorageState>,
    applied: Mutex<Vec<StorageState>>,
    closed: Mutex<bool>,
}

impl MockBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a page opened outside of `new_page` (popup, target=_blank)
    pub fn open_external(&self, page: Arc<MockPage>) {
        self.pending.lock().push(LifecycleEvent::Opened(page));
    }

    pub fn push_event(&self, event: LifecycleEvent) {
        self.pending.lock().push(event);
    }

    /// Pages created through `new_page`
    pub fn opened(&self) -> Vec<Arc<MockPage>> {
        self.opened.lock().clone()
    }

    pub fn set_storage_state(&self, state: StorageState) {
        *self.storage.lock() = state;
    }

    pub fn applied_states(&self) -> Vec<StorageState> {
        self.applied.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.lock()
    }
}

#[async_trait]
impl BrowserDriver for MockBrowser {
    async fn new_page(&self) -> Result<Arc<dyn PageDriver>> {
        let page = Arc::new(MockPage::new("about:blank"));
        self.opened.lock().push(page.clone());
        Ok(page)
    }

    async fn drain_events(&self) -> Vec<LifecycleEvent> {
        std::mem::take(&mut *self.pending.lock())
    }

    async fn storage_state(&self) -> Result<StorageState> {
        Ok(self.storage.lock().clone())
    }

    async fn apply_storage_state(&self, state: &StorageState) -> Result<()> {
        self.applied.lock().push(state.clone());
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        *self.closed.lock() = true;
        Ok(())
    }
}

type Handler<Req, Resp> = Box<dyn Fn(&Req, usize) -> Result<Resp> + Send + Sync>;

/// Remote service stub. Each endpoint answers through a handler that receives
/// the request and the zero-based call index; every request is recorded.
pub struct MockApi {
    resolve: Mutex<Handler<GetElementsRequest, GetElementResponse>>,
    verify: Mutex<Handler<MakeInteractionRequest, InteractionResponse>>,
    extract: Mutex<Handler<ExtractRequest, ExtractResponse>>,
    ask: Mutex<Handler<AskPageRequest, AskPageResponse>>,
    authenticate: Mutex<Handler<AuthenticateRequest, AuthSession>>,
    pub resolve_requests: Mutex<Vec<GetElementsRequest>>,
    pub verify_requests: Mutex<Vec<MakeInteractionRequest>>,
    pub extract_requests: Mutex<Vec<ExtractRequest>>,
    pub ask_requests: Mutex<Vec<AskPageRequest>>,
    pub uploads: Mutex<Vec<UploadAuthSessionRequest>>,
}

impl Default for MockApi {
    fn default() -> Self {
        Self {
            resolve: Mutex::new(Box::new(|_, _| Ok(MockApi::no_match()))),
            verify: Mutex::new(Box::new(|_, _| Ok(InteractionResponse { status: Status::Success, message: String::new() }))),
            extract: Mutex::new(Box::new(|_, _| Ok(MockApi::extract_status(Status::Impossible, None)))),
            ask: Mutex::new(Box::new(|_, _| {
                Ok(AskPageResponse { status: Status::Success, description: String::new(), return_data: json!(true) })
            })),
            authenticate: Mutex::new(Box::new(|_, _| Ok(AuthSession { user_agent: None, domain_states: Vec::new() }))),
            resolve_requests: Mutex::new(Vec::new()),
            verify_requests: Mutex::new(Vec::new()),
            extract_requests: Mutex::new(Vec::new()),
            ask_requests: Mutex::new(Vec::new()),
            uploads: Mutex::new(Vec::new()),
        }
    }
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selectors(list: &[&str]) -> GetElementResponse {
        GetElementResponse {
            status: Status::Success,
            selectors: Some(Selectors::List(list.iter().map(|s| Candidate::Plain(s.to_string())).collect())),
            message: None,
        }
    }

    pub fn no_match() -> GetElementResponse {
        GetElementResponse { status: Status::Failed, selectors: None, message: Some("nothing yet".to_string()) }
    }

    pub fn extract_status(status: Status, data: Option<Value>) -> ExtractResponse {
        ExtractResponse { status, message: None, return_data: data, created_script: None, used_cache: false }
    }

    pub fn on_resolve(&self, f: impl Fn(&GetElementsRequest, usize) -> Result<GetElementResponse> + Send + Sync + 'static) {
        *self.resolve.lock() = Box::new(f);
    }

    pub fn on_verify(
        &self,
        f: impl Fn(&MakeInteractionRequest, usize) -> Result<InteractionResponse> + Send + Sync + 'static,
    ) {
        *self.verify.lock() = Box::new(f);
    }

    pub fn on_extract(&self, f: impl Fn(&ExtractRequest, usize) -> Result<ExtractResponse> + Send + Sync + 'static) {
        *self.extract.lock() = Box::new(f);
    }

    pub fn on_ask(&self, f: impl Fn(&AskPageRequest, usize) -> Result<AskPageResponse> + Send + Sync + 'static) {
        *self.ask.lock() = Box::new(f);
    }

    pub fn on_authenticate(
        &self,
        f: impl Fn(&AuthenticateRequest, usize) -> Result<AuthSession> + Send + Sync + 'static,
    ) {
        *self.authenticate.lock() = Box::new(f);
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolve_requests.lock().len()
    }
}

#[async_trait]
impl BrowserApi for MockApi {
    async fn resolve_elements(&self, request: &GetElementsRequest) -> Result<GetElementResponse> {
        let call = {
            let mut requests = self.resolve_requests.lock();
            requests.push(request.clone());
            requests.len() - 1
        };
        (*self.resolve.lock())(request, call)
    }

    async fn verify_outcome(&self, request: &MakeInteractionRequest) -> Result<InteractionResponse> {
        let call = {
            let mut requests = self.verify_requests.lock();
            requests.push(request.clone());
            requests.len() - 1
        };
        (*self.verify.lock())(request, call)
    }

    async fn extract(&self, request: &ExtractRequest) -> Result<ExtractResponse> {
        let call = {
            let mut requests = self.extract_requests.lock();
            requests.push(request.clone());
            requests.len() - 1
        };
        (*self.extract.lock())(request, call)
    }

    async fn ask(&self, request: &AskPageRequest) -> Result<AskPageResponse> {
        let call = {
            let mut requests = self.ask_requests.lock();
            requests.push(request.clone());
            requests.len() - 1
        };
        (*self.ask.lock())(request, call)
    }

    async fn authenticate(&self, request: &AuthenticateRequest) -> Result<AuthSession> {
        (*self.authenticate.lock())(request, 0)
    }

    async fn upload_auth_session(&self, request: &UploadAuthSessionRequest) -> Result<()> {
        self.uploads.lock().push(request.clone());
        Ok(())
    }
}

/// A session over mocks with `page` already open and active
pub struct Harness {
    pub browser: Browser,
    pub driver: Arc<MockBrowser>,
    pub api: Arc<MockApi>,
    pub page: Arc<MockPage>,
}

impl Harness {
    pub async fn new(page: MockPage, api: MockApi) -> Self {
        Self::with_settings(page, api, SessionSettings::default()).await
    }

    pub async fn with_settings(page: MockPage, api: MockApi, settings: SessionSettings) -> Self {
        let driver = Arc::new(MockBrowser::new());
        let api = Arc::new(api);
        let page = Arc::new(page);
        driver.open_external(page.clone());

        let browser = Browser::from_drivers(driver.clone(), api.clone(), settings)
            .await
            .expect("mock session starts");

        Self { browser, driver, api, page }
    }

    pub async fn active(&self) -> Page {
        self.browser.active_page().await.expect("active page")
    }
}
