//! Native browser seams.
//!
//! The core never talks to a browser engine directly. Everything it needs from a
//! page goes through [`PageDriver`] and everything it needs from the browser
//! process goes through [`BrowserDriver`]. [`crate::browser::chrome`] implements
//! both on top of `headless_chrome`.

use crate::auth::StorageState;
use crate::browser::event_slot::EventSlot;
use crate::error::{BrowserError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// A point in top-level viewport coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// An axis-aligned box in top-level page coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn center(&self) -> Point {
        Point { x: self.x + self.width / 2.0, y: self.y + self.height / 2.0 }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Keyboard modifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    Alt,
    Control,
    Meta,
    Shift,
}

impl FromStr for Modifier {
    type Err = BrowserError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "alt" | "option" => Ok(Modifier::Alt),
            "control" | "ctrl" => Ok(Modifier::Control),
            "meta" | "command" | "cmd" => Ok(Modifier::Meta),
            "shift" => Ok(Modifier::Shift),
            other => Err(BrowserError::InvalidArgument(format!("Unknown key modifier '{}'", other))),
        }
    }
}

/// A file chooser dialog intercepted on a page
#[derive(Debug, Clone, PartialEq)]
pub struct FileChooser {
    /// Backend node of the `<input type=file>` that opened the chooser
    pub backend_node_id: Option<u32>,
    pub frame_id: String,
    pub multiple: bool,
}

/// A download started by a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Download {
    pub guid: String,
    pub url: String,
    pub suggested_filename: String,
    /// Where the browser writes the file
    pub path: PathBuf,
}

/// Per-page event state filled by the driver and consumed by the core
#[derive(Debug)]
pub struct PageEvents {
    pub file_chooser: EventSlot<FileChooser>,
    pub download: EventSlot<Download>,
    last_navigation: Mutex<Instant>,
}

impl Default for PageEvents {
    fn default() -> Self {
        Self {
            file_chooser: EventSlot::new(),
            download: EventSlot::new(),
            last_navigation: Mutex::new(Instant::now()),
        }
    }
}

impl PageEvents {
    /// Record a main-frame navigation
    pub fn mark_navigated(&self) {
        *self.last_navigation.lock() = Instant::now();
    }

    /// Time since the last main-frame navigation
    pub fn since_navigation(&self) -> Duration {
        self.last_navigation.lock().elapsed()
    }
}

/// Browser-level lifecycle notifications
#[derive(Clone)]
pub enum LifecycleEvent {
    Opened(Arc<dyn PageDriver>),
    Closed(String),
    Crashed(String),
}

impl std::fmt::Debug for LifecycleEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleEvent::Opened(page) => f.debug_tuple("Opened").field(&page.id()).finish(),
            LifecycleEvent::Closed(id) => f.debug_tuple("Closed").field(id).finish(),
            LifecycleEvent::Crashed(id) => f.debug_tuple("Crashed").field(id).finish(),
        }
    }
}

/// Native commands for a single page.
///
/// `frame_path` addresses a nested frame by the identity tokens of the iframe
/// elements leading to it; an empty path is the top-level document.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Stable identifier of the page (target id)
    fn id(&self) -> &str;

    /// Event slots and navigation clock for this page
    fn events(&self) -> &PageEvents;

    async fn url(&self) -> Result<String>;

    async fn goto(&self, url: &str) -> Result<()>;

    async fn reload(&self) -> Result<()>;

    async fn bring_to_front(&self) -> Result<()>;

    async fn close(&self) -> Result<()>;

    /// Evaluate `script` as an expression inside the frame at `frame_path` and return its JSON value
    async fn evaluate(&self, frame_path: &[String], script: &str) -> Result<serde_json::Value>;

    /// Wait until the current document has finished loading, bounded by `timeout`
    async fn wait_for_load(&self, timeout: Duration) -> Result<()>;

    /// Base64 JPEG of the viewport or the full scrollable page
    async fn screenshot(&self, full_page: bool) -> Result<String>;

    /// Base64 JPEG of a region of the page
    async fn screenshot_clip(&self, clip: Rect) -> Result<String>;

    async fn click_at(&self, point: Point) -> Result<()>;

    async fn move_mouse_to(&self, point: Point) -> Result<()>;

    /// Type text into the focused element
    async fn type_text(&self, text: &str) -> Result<()>;

    async fn press_key(&self, key: &str, modifiers: &[Modifier]) -> Result<()>;

    /// Answer an intercepted file chooser with absolute file paths
    async fn accept_file_chooser(&self, chooser: &FileChooser, files: &[PathBuf]) -> Result<()>;

    /// Assign files to the `<input type=file>` matching `selector` inside the frame at `frame_path`
    async fn set_input_files(&self, frame_path: &[String], selector: &str, files: &[PathBuf]) -> Result<()>;
}

/// Browser-process commands
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Open a new page. The returned page is not reported again by [`BrowserDriver::drain_events`].
    async fn new_page(&self) -> Result<Arc<dyn PageDriver>>;

    /// Lifecycle events observed since the previous call
    async fn drain_events(&self) -> Vec<LifecycleEvent>;

    /// Cookies and per-origin local storage of the running browser
    async fn storage_state(&self) -> Result<StorageState>;

    async fn apply_storage_state(&self, state: &StorageState) -> Result<()>;

    /// Release the browser. Further calls may fail.
    async fn close(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_parsing() {
        assert_eq!("Shift".parse::<Modifier>().unwrap(), Modifier::Shift);
        assert_eq!("ctrl".parse::<Modifier>().unwrap(), Modifier::Control);
        assert_eq!("Control".parse::<Modifier>().unwrap(), Modifier::Control);
        assert_eq!("Command".parse::<Modifier>().unwrap(), Modifier::Meta);
        assert!(matches!("hyper".parse::<Modifier>(), Err(BrowserError::InvalidArgument(_))));
    }

    #[test]
    fn test_rect_center() {
        let rect = Rect { x: 10.0, y: 20.0, width: 100.0, height: 40.0 };
        assert_eq!(rect.center(), Point { x: 60.0, y: 40.0 });
        assert!(!rect.is_empty());
        assert!(Rect { x: 0.0, y: 0.0, width: 0.0, height: 10.0 }.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_clock() {
        let events = PageEvents::default();
        tokio::time::advance(Duration::from_secs(3)).await;
        assert_eq!(events.since_navigation(), Duration::from_secs(3));

        events.mark_navigated();
        assert_eq!(events.since_navigation(), Duration::ZERO);
    }
}
