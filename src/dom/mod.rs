//! Page document abstraction.
//!
//! The feature engine never talks to a browser directly. It drives a
//! [`Dom`], a shared handle over an arena [`Document`] plus its event
//! listeners. A web frontend backs the same surface with the real page; tests
//! and tools use the in-memory tree as-is.
//!
//! # Architecture
//!
//! ```text
//! Dom (Rc, cloneable)
//! ├── document: RefCell<Document>    tree, attributes, media, mutation log
//! └── listeners: RefCell<ListenerTable>
//! ```
//!
//! Listeners run with no borrow held, so they are free to mutate the tree or
//! dispatch further events.

mod document;
pub mod events;
mod html;
mod selector;

use std::cell::RefCell;
use std::rc::Rc;

pub use document::{Document, MediaState, MutationBatch, NodeId, NodeKind, TextSplit};
pub use events::{Event, ListenerHandle, ListenerOptions};
pub use html::HtmlError;
pub use selector::{Selector, SelectorError};

use events::ListenerTable;

/// Shared handle to the page document.
#[derive(Clone, Default)]
pub struct Dom {
    document: Rc<RefCell<Document>>,
    listeners: Rc<RefCell<ListenerTable>>,
}

impl std::fmt::Debug for Dom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dom")
            .field("listeners", &self.listener_count())
            .finish_non_exhaustive()
    }
}

impl Dom {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` with shared access to the document.
    pub fn with<R>(&self, f: impl FnOnce(&Document) -> R) -> R {
        f(&self.document.borrow())
    }

    /// Run `f` with exclusive access to the document.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut Document) -> R) -> R {
        f(&mut self.document.borrow_mut())
    }

    pub fn body(&self) -> NodeId {
        self.with(Document::body)
    }

    pub fn head(&self) -> NodeId {
        self.with(Document::head)
    }

    pub fn root(&self) -> NodeId {
        self.with(Document::root)
    }

    /// Parse `html` and append the resulting nodes to `parent`.
    pub fn append_html(&self, parent: NodeId, html: &str) -> Result<Vec<NodeId>, HtmlError> {
        self.with_mut(|doc| doc.append_html(parent, html))
    }

    /// Serialize `node` and its subtree.
    pub fn to_html(&self, node: NodeId) -> String {
        self.with(|doc| doc.to_html(node))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Events
    // ─────────────────────────────────────────────────────────────────────

    pub fn add_event_listener(
        &self,
        target: NodeId,
        kind: &str,
        options: ListenerOptions,
        listener: impl Fn(&Dom, &mut Event) + 'static,
    ) -> ListenerHandle {
        self.listeners
            .borrow_mut()
            .add(target, kind, options, Rc::new(listener))
    }

    /// Returns `false` if the listener was already gone.
    pub fn remove_event_listener(&self, handle: ListenerHandle) -> bool {
        self.listeners.borrow_mut().remove(handle)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Deliver `event` through capture, target and bubble phases.
    ///
    /// Returns the event so callers can inspect `default_prevented`.
    pub fn dispatch(&self, mut event: Event) -> Event {
        let path = self.with(|doc| doc.ancestors_inclusive(event.target));

        for &node in path.iter().rev() {
            self.invoke(node, true, &mut event);
            if event.propagation_stopped() {
                return event;
            }
        }

        for (depth, &node) in path.iter().enumerate() {
            if depth > 0 && !event.bubbles {
                break;
            }
            self.invoke(node, false, &mut event);
            if event.propagation_stopped() {
                break;
            }
        }
        event
    }

    fn invoke(&self, node: NodeId, capture: bool, event: &mut Event) {
        let snapshot = self
            .listeners
            .borrow()
            .snapshot(node, &event.kind, capture);

        for (handle, once, callback) in snapshot {
            // An earlier listener may have removed this one.
            if !self.listeners.borrow().contains(handle) {
                continue;
            }
            if once {
                self.listeners.borrow_mut().remove(handle);
            }
            event.current_target = node;
            callback(self, event);
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Host-side media behaviour
    // ─────────────────────────────────────────────────────────────────────

    /// Record a media element's duration and fire `loadedmetadata` on it.
    pub fn load_media_metadata(&self, media: NodeId, duration: f64) {
        let loaded = self.with_mut(|doc| match doc.media_mut(media) {
            Some(state) => {
                state.duration = Some(duration);
                true
            }
            None => false,
        });
        if loaded {
            self.dispatch(Event::non_bubbling(events::LOADED_METADATA, media));
        }
    }

    /// Enter picture-in-picture unless the element forbids it.
    pub fn request_picture_in_picture(&self, media: NodeId) -> bool {
        self.with_mut(|doc| {
            if doc.has_attribute(media, "disablepictureinpicture") {
                return false;
            }
            match doc.media_mut(media) {
                Some(state) => {
                    state.picture_in_picture = true;
                    true
                }
                None => false,
            }
        })
    }
}
