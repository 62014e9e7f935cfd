use std::path::PathBuf;

/// Options for launching a new browser instance
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Run the browser without a visible window
    pub headless: bool,

    /// Browser window width in pixels
    pub window_width: u32,

    /// Browser window height in pixels
    pub window_height: u32,

    /// Path to a Chrome/Chromium binary (auto-detected when `None`)
    pub chrome_path: Option<PathBuf>,

    /// Persistent profile directory
    pub user_data_dir: Option<PathBuf>,

    /// Enable the Chrome sandbox
    pub sandbox: bool,

    /// Directory downloads are written to
    pub downloads_dir: Option<PathBuf>,

    /// Domains whose stored auth session is loaded at launch and uploaded on close
    pub auth_domains: Vec<String>,

    /// Keep a structured [`crate::logging::ActionLog`] of every high-level call
    pub record_actions: bool,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1280,
            window_height: 800,
            chrome_path: None,
            user_data_dir: None,
            sandbox: true,
            downloads_dir: None,
            auth_domains: Vec::new(),
            record_actions: false,
        }
    }
}

impl LaunchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn window_size(mut self, width: u32, height: u32) -> Self {
        self.window_width = width;
        self.window_height = height;
        self
    }

    pub fn chrome_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.chrome_path = Some(path.into());
        self
    }

    pub fn user_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.user_data_dir = Some(dir.into());
        self
    }

    pub fn sandbox(mut self, sandbox: bool) -> Self {
        self.sandbox = sandbox;
        self
    }

    pub fn downloads_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.downloads_dir = Some(dir.into());
        self
    }

    /// Load (and later persist) the remote auth session for these domains
    pub fn auth<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.auth_domains = domains.into_iter().map(Into::into).collect();
        self
    }

    pub fn record_actions(mut self, record: bool) -> Self {
        self.record_actions = record;
        self
    }

    /// Downloads directory, falling back to `<tmp>/intent-browser-downloads`
    pub fn resolved_downloads_dir(&self) -> PathBuf {
        resolve_downloads_dir(&self.downloads_dir)
    }
}

/// Options for connecting to an already running browser
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    /// DevTools websocket URL, e.g. `ws://localhost:9222/devtools/browser/<id>`
    pub ws_url: String,

    /// Connection timeout in milliseconds
    pub timeout: u64,

    /// Directory downloads are written to
    pub downloads_dir: Option<PathBuf>,

    /// Domains whose stored auth session is loaded on connect and uploaded on close
    pub auth_domains: Vec<String>,

    pub record_actions: bool,
}

impl ConnectionOptions {
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
            timeout: 30_000,
            downloads_dir: None,
            auth_domains: Vec::new(),
            record_actions: false,
        }
    }

    pub fn timeout(mut self, timeout: u64) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn downloads_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.downloads_dir = Some(dir.into());
        self
    }

    pub fn auth<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.auth_domains = domains.into_iter().map(Into::into).collect();
        self
    }

    pub fn record_actions(mut self, record: bool) -> Self {
        self.record_actions = record;
        self
    }

    pub fn resolved_downloads_dir(&self) -> PathBuf {
        resolve_downloads_dir(&self.downloads_dir)
    }
}

fn resolve_downloads_dir(dir: &Option<PathBuf>) -> PathBuf {
    dir.clone().unwrap_or_else(|| std::env::temp_dir().join("intent-browser-downloads"))
}
