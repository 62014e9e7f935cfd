use crate::browser::driver::{LifecycleEvent, PageDriver};
use std::sync::Arc;

/// Follow-up work for a lifecycle transition. It runs after the manager's lock is released.
pub enum Followup {
    None,
    /// The page was promoted to active and should be brought to the foreground
    BringToFront(Arc<dyn PageDriver>),
    /// The page crashed and should be reloaded in place
    Reload(Arc<dyn PageDriver>),
}

/// Open pages of a session and which one is active.
///
/// Only lifecycle handlers mutate this state; once the session is closed every
/// event is ignored.
#[derive(Default)]
pub struct PageManager {
    pages: Vec<Arc<dyn PageDriver>>,
    active: Option<String>,
    closed: bool,
}

impl PageManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: LifecycleEvent) -> Followup {
        if self.closed {
            log::debug!("Ignoring {:?} on a closed session", event);
            return Followup::None;
        }

        match event {
            LifecycleEvent::Opened(page) => {
                self.on_opened(page);
                Followup::None
            }
            LifecycleEvent::Closed(id) => self.on_closed(&id).map(Followup::BringToFront).unwrap_or(Followup::None),
            LifecycleEvent::Crashed(id) => self.on_crashed(&id).map(Followup::Reload).unwrap_or(Followup::None),
        }
    }

    /// Track a new page and make it active
    pub fn on_opened(&mut self, page: Arc<dyn PageDriver>) {
        if self.closed {
            return;
        }
        if self.pages.iter().any(|p| p.id() == page.id()) {
            log::debug!("Page {} is already tracked", page.id());
        } else {
            self.pages.push(page.clone());
        }
        log::info!("Page {} opened and is now active", page.id());
        self.active = Some(page.id().to_string());
    }

    /// Forget a page. Returns the page promoted to active, if the closed page was active.
    pub fn on_closed(&mut self, id: &str) -> Option<Arc<dyn PageDriver>> {
        let position = self.pages.iter().position(|p| p.id() == id)?;
        self.pages.remove(position);
        log::info!("Page {} closed", id);

        if self.active.as_deref() != Some(id) {
            return None;
        }

        match self.pages.last() {
            Some(next) => {
                log::info!("Page {} promoted to active", next.id());
                self.active = Some(next.id().to_string());
                Some(next.clone())
            }
            None => {
                self.active = None;
                None
            }
        }
    }

    /// The crashed page, if tracked. The active page is left unchanged.
    pub fn on_crashed(&self, id: &str) -> Option<Arc<dyn PageDriver>> {
        let page = self.pages.iter().find(|p| p.id() == id)?;
        log::warn!("Page {} crashed, reloading", id);
        Some(page.clone())
    }

    pub fn active(&self) -> Option<Arc<dyn PageDriver>> {
        let id = self.active.as_deref()?;
        self.pages.iter().find(|p| p.id() == id).cloned()
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Make a tracked page active
    pub fn activate(&mut self, id: &str) -> bool {
        if self.closed || !self.pages.iter().any(|p| p.id() == id) {
            return false;
        }
        self.active = Some(id.to_string());
        true
    }

    pub fn pages(&self) -> Vec<Arc<dyn PageDriver>> {
        self.pages.clone()
    }

    /// Mark the session closed. Returns false if it already was.
    pub fn close(&mut self) -> bool {
        if self.closed {
            return false;
        }
        self.closed = true;
        self.active = None;
        true
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockPage;

    fn open(manager: &mut PageManager) -> Arc<dyn PageDriver> {
        let page: Arc<dyn PageDriver> = Arc::new(MockPage::new("about:blank"));
        manager.apply(LifecycleEvent::Opened(page.clone()));
        page
    }

    #[test]
    fn test_opened_page_becomes_active() {
        let mut manager = PageManager::new();
        let first = open(&mut manager);
        assert_eq!(manager.active_id(), Some(first.id()));

        let second = open(&mut manager);
        assert_eq!(manager.active_id(), Some(second.id()));
        assert_eq!(manager.pages().len(), 2);
    }

    #[test]
    fn test_closing_active_promotes_most_recent() {
        let mut manager = PageManager::new();
        let _a = open(&mut manager);
        let b = open(&mut manager);
        let c = open(&mut manager);

        let followup = manager.apply(LifecycleEvent::Closed(c.id().to_string()));
        match followup {
            Followup::BringToFront(page) => assert_eq!(page.id(), b.id()),
            _ => panic!("expected the promoted page to be brought to front"),
        }
        assert_eq!(manager.active_id(), Some(b.id()));
        assert_eq!(manager.pages().len(), 2);
    }

    #[test]
    fn test_closing_inactive_keeps_active() {
        let mut manager = PageManager::new();
        let a = open(&mut manager);
        let b = open(&mut manager);

        assert!(manager.on_closed(a.id()).is_none());
        assert_eq!(manager.active_id(), Some(b.id()));
    }

    #[test]
    fn test_closing_last_page_unsets_active() {
        let mut manager = PageManager::new();
        let a = open(&mut manager);

        assert!(manager.on_closed(a.id()).is_none());
        assert!(manager.active().is_none());
        assert!(manager.pages().is_empty());
    }

    #[test]
    fn test_crash_requests_reload_without_switching() {
        let mut manager = PageManager::new();
        let a = open(&mut manager);
        let b = open(&mut manager);

        match manager.apply(LifecycleEvent::Crashed(a.id().to_string())) {
            Followup::Reload(page) => assert_eq!(page.id(), a.id()),
            _ => panic!("expected a reload"),
        }
        assert_eq!(manager.active_id(), Some(b.id()));
    }

    #[test]
    fn test_events_after_close_are_ignored() {
        let mut manager = PageManager::new();
        let a = open(&mut manager);
        assert!(manager.close());
        assert!(!manager.close());

        open(&mut manager);
        assert!(matches!(manager.apply(LifecycleEvent::Closed(a.id().to_string())), Followup::None));
        assert!(matches!(manager.apply(LifecycleEvent::Crashed(a.id().to_string())), Followup::None));
        assert_eq!(manager.pages().len(), 1);
        assert!(manager.active().is_none());
    }
}
