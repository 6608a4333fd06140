//! DOM events and listener bookkeeping.

use std::rc::Rc;

use super::document::NodeId;
use super::Dom;

pub const CLICK: &str = "click";
pub const CONTEXT_MENU: &str = "contextmenu";
pub const KEY_UP: &str = "keyup";
pub const LOADED_METADATA: &str = "loadedmetadata";

/// An event travelling through the document.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind: String,
    pub target: NodeId,
    pub current_target: NodeId,
    pub bubbles: bool,
    /// Key name for keyboard events.
    pub key: Option<String>,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl Event {
    /// A bubbling event aimed at `target`.
    pub fn new(kind: &str, target: NodeId) -> Self {
        Self {
            kind: kind.to_string(),
            target,
            current_target: target,
            bubbles: true,
            key: None,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    /// An event that only reaches capture listeners and the target itself.
    pub fn non_bubbling(kind: &str, target: NodeId) -> Self {
        Self {
            bubbles: false,
            ..Self::new(kind, target)
        }
    }

    /// A bubbling keyboard event.
    pub fn key(kind: &str, target: NodeId, key: &str) -> Self {
        Self {
            key: Some(key.to_string()),
            ..Self::new(kind, target)
        }
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

/// How a listener is attached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerOptions {
    pub capture: bool,
    pub once: bool,
}

impl ListenerOptions {
    pub fn capture() -> Self {
        Self {
            capture: true,
            once: false,
        }
    }

    pub fn once() -> Self {
        Self {
            capture: false,
            once: true,
        }
    }
}

/// Token returned by `add_event_listener`, used to remove the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(u64);

pub type Listener = Rc<dyn Fn(&Dom, &mut Event)>;

struct Entry {
    handle: ListenerHandle,
    target: NodeId,
    kind: String,
    options: ListenerOptions,
    callback: Listener,
}

/// Every listener registered on a document.
#[derive(Default)]
pub(super) struct ListenerTable {
    next: u64,
    entries: Vec<Entry>,
}

impl ListenerTable {
    pub(super) fn add(
        &mut self,
        target: NodeId,
        kind: &str,
        options: ListenerOptions,
        callback: Listener,
    ) -> ListenerHandle {
        self.next += 1;
        let handle = ListenerHandle(self.next);
        self.entries.push(Entry {
            handle,
            target,
            kind: kind.to_string(),
            options,
            callback,
        });
        handle
    }

    pub(super) fn remove(&mut self, handle: ListenerHandle) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.handle != handle);
        self.entries.len() != before
    }

    pub(super) fn contains(&self, handle: ListenerHandle) -> bool {
        self.entries.iter().any(|e| e.handle == handle)
    }

    pub(super) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Listeners for one phase at one node, in registration order.
    pub(super) fn snapshot(
        &self,
        target: NodeId,
        kind: &str,
        capture: bool,
    ) -> Vec<(ListenerHandle, bool, Listener)> {
        self.entries
            .iter()
            .filter(|e| e.target == target && e.kind == kind && e.options.capture == capture)
            .map(|e| (e.handle, e.options.once, Rc::clone(&e.callback)))
            .collect()
    }
}
