//! Window-scoped message target.
//!
//! Both script worlds share one window. Anything posted is broadcast to every
//! listener, in post order; a message posted from inside a listener is
//! delivered once the current message has reached every listener.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use serde_json::Value;

type WindowListener = Rc<dyn Fn(&Value)>;

/// Token for removing a window listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowListenerHandle(u64);

#[derive(Default)]
struct WindowInner {
    next: Cell<u64>,
    listeners: RefCell<Vec<(WindowListenerHandle, WindowListener)>>,
    queue: RefCell<VecDeque<Value>>,
    delivering: Cell<bool>,
}

/// Cloneable handle to the shared window.
#[derive(Clone, Default)]
pub struct Window {
    inner: Rc<WindowInner>,
}

impl std::fmt::Debug for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Window")
            .field("listeners", &self.listener_count())
            .finish_non_exhaustive()
    }
}

impl Window {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&self, listener: impl Fn(&Value) + 'static) -> WindowListenerHandle {
        let id = self.inner.next.get() + 1;
        self.inner.next.set(id);
        let handle = WindowListenerHandle(id);
        self.inner
            .listeners
            .borrow_mut()
            .push((handle, Rc::new(listener)));
        handle
    }

    pub fn remove_listener(&self, handle: WindowListenerHandle) -> bool {
        let mut listeners = self.inner.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(h, _)| *h != handle);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    /// Broadcast `message` to every listener.
    pub fn post_message(&self, message: Value) {
        self.inner.queue.borrow_mut().push_back(message);
        if self.inner.delivering.replace(true) {
            return;
        }
        let _delivering = DeliveryGuard(&self.inner.delivering);

        loop {
            let Some(message) = self.inner.queue.borrow_mut().pop_front() else {
                break;
            };
            let snapshot: Vec<(WindowListenerHandle, WindowListener)> =
                self.inner.listeners.borrow().clone();
            for (handle, listener) in snapshot {
                let still_registered = self
                    .inner
                    .listeners
                    .borrow()
                    .iter()
                    .any(|(h, _)| *h == handle);
                if still_registered {
                    listener(&message);
                }
            }
        }
    }
}

/// Clears the delivering flag even if a listener panics.
struct DeliveryGuard<'a>(&'a Cell<bool>);

impl Drop for DeliveryGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}
