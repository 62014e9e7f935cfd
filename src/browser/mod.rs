//! Browser sessions, the native driver seams and their Chrome implementation.

pub mod chrome;
pub mod config;
pub mod driver;
pub mod event_slot;
pub mod page_manager;
pub mod session;

pub use chrome::{ChromeBrowser, ChromePage};
pub use config::{ConnectionOptions, LaunchOptions};
pub use driver::{BrowserDriver, Download, FileChooser, LifecycleEvent, Modifier, PageDriver, PageEvents, Point, Rect};
pub use event_slot::EventSlot;
pub use session::{Browser, SessionSettings};
