//! Structured action log.
//!
//! An [`ActionLog`] is an explicit handle threaded through the browser context.
//! Each high-level call opens an [`ActionScope`]; the scope records its start
//! when created and its finish (with elapsed time) when dropped. Events are
//! mirrored to the `log` facade at debug level.
//!
//! The buffer is bounded: once it holds `capacity` events the oldest are
//! dropped. Long-running sessions that export events should call
//! [`ActionLog::clear`] after each export.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Started,
    Attempt,
    Fallback,
    Info,
    Failed,
    Finished,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionEvent {
    pub action: String,
    pub kind: EventKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Unix milliseconds
    pub timestamp: u128,
}

/// Events kept by [`ActionLog::enabled`]
pub const DEFAULT_CAPACITY: usize = 10_000;

#[derive(Debug)]
struct Inner {
    events: Mutex<VecDeque<ActionEvent>>,
    capacity: usize,
}

/// Cloneable handle to a shared event buffer. The default handle is disabled.
#[derive(Debug, Clone, Default)]
pub struct ActionLog {
    inner: Option<Arc<Inner>>,
}

impl ActionLog {
    pub fn enabled() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Enabled log keeping at most `capacity` of the newest events
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { inner: Some(Arc::new(Inner { events: Mutex::new(VecDeque::new()), capacity })) }
    }

    pub fn disabled() -> Self {
        Self { inner: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Open a scope for one action
    pub fn scope(&self, action: impl Into<String>) -> ActionScope {
        let scope = ActionScope { log: self.clone(), action: action.into(), started: Instant::now() };
        scope.push(EventKind::Started, String::new(), None);
        scope
    }

    pub fn events(&self) -> Vec<ActionEvent> {
        self.inner.as_ref().map(|inner| inner.events.lock().iter().cloned().collect()).unwrap_or_default()
    }

    /// One JSON object per line
    pub fn to_json_lines(&self) -> String {
        self.events()
            .iter()
            .filter_map(|event| serde_json::to_string(event).ok())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Drop every buffered event
    pub fn clear(&self) {
        if let Some(inner) = &self.inner {
            inner.events.lock().clear();
        }
    }
}

/// RAII guard for one logged action
#[derive(Debug)]
pub struct ActionScope {
    log: ActionLog,
    action: String,
    started: Instant,
}

impl ActionScope {
    pub fn record(&self, kind: EventKind, message: impl Into<String>, data: Option<serde_json::Value>) {
        self.push(kind, message.into(), data);
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    fn push(&self, kind: EventKind, message: String, data: Option<serde_json::Value>) {
        log::debug!("[{}] {:?} {}", self.action, kind, message);

        let Some(inner) = &self.log.inner else {
            return;
        };

        let timestamp = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis()).unwrap_or_default();
        let mut events = inner.events.lock();
        if events.len() >= inner.capacity {
            events.pop_front();
        }
        events.push_back(ActionEvent { action: self.action.clone(), kind, message, data, timestamp });
    }
}

impl Drop for ActionScope {
    fn drop(&mut self) {
        let elapsed_ms = self.started.elapsed().as_millis() as u64;
        self.push(EventKind::Finished, String::new(), Some(serde_json::json!({ "elapsed_ms": elapsed_ms })));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_records_start_and_finish() {
        let log = ActionLog::enabled();
        {
            let scope = log.scope("click");
            scope.record(EventKind::Fallback, "forced click", None);
        }

        let kinds: Vec<EventKind> = log.events().into_iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EventKind::Started, EventKind::Fallback, EventKind::Finished]);
        assert!(log.events().iter().all(|e| e.action == "click"));
    }

    #[test]
    fn test_buffer_drops_oldest_events() {
        let log = ActionLog::with_capacity(3);
        {
            let scope = log.scope("scroll");
            scope.record(EventKind::Attempt, "first", None);
            scope.record(EventKind::Attempt, "second", None);
        }

        let events = log.events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].message, "first");
        assert_eq!(events[2].kind, EventKind::Finished);

        log.clear();
        assert!(log.events().is_empty());
    }

    #[test]
    fn test_disabled_log_is_noop() {
        let log = ActionLog::disabled();
        {
            let scope = log.scope("extract");
            scope.record(EventKind::Info, "ignored", None);
        }
        assert!(log.events().is_empty());
        assert!(log.to_json_lines().is_empty());
    }

    #[test]
    fn test_json_lines() {
        let log = ActionLog::enabled();
        drop(log.scope("ask"));

        let lines = log.to_json_lines();
        let parsed: Vec<serde_json::Value> =
            lines.lines().map(|line| serde_json::from_str(line).unwrap()).collect();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0]["kind"], "started");
        assert!(parsed[1]["data"]["elapsed_ms"].is_u64());

        log.clear();
        assert!(log.events().is_empty());
    }
}
