//! Preference store adapter.
//!
//! A thin observable façade over the host's key/value store. The engine only
//! depends on three operations: read everything, write one flag, and
//! subscribe to changes. Host failures never reach callers; they are logged
//! and the next change re-reconciles.

mod backend;

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use backend::{JsonFileBackend, MemoryBackend, PreferenceBackend};

/// Stored preferences: identifier to value. Missing means disabled.
pub type PreferenceRecord = BTreeMap<String, Value>;

/// One key's transition, shaped like the host's storage change record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueChange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Value>,
}

/// A batch of key transitions delivered to subscribers.
pub type PreferenceChange = BTreeMap<String, ValueChange>;

type Subscriber = Rc<dyn Fn(&PreferenceChange)>;

struct StoreInner {
    backend: RefCell<Box<dyn PreferenceBackend>>,
    subscribers: RefCell<Vec<Subscriber>>,
    queue: RefCell<VecDeque<PreferenceChange>>,
    delivering: Cell<bool>,
}

/// Cloneable handle to the preference store.
#[derive(Clone)]
pub struct PreferenceStore {
    inner: Rc<StoreInner>,
}

impl std::fmt::Debug for PreferenceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreferenceStore")
            .field("subscribers", &self.inner.subscribers.borrow().len())
            .finish_non_exhaustive()
    }
}

impl PreferenceStore {
    pub fn new(backend: impl PreferenceBackend + 'static) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                backend: RefCell::new(Box::new(backend)),
                subscribers: RefCell::new(Vec::new()),
                queue: RefCell::new(VecDeque::new()),
                delivering: Cell::new(false),
            }),
        }
    }

    /// A store over an empty in-memory backend.
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    /// Every stored preference. Empty if the host store is unavailable.
    pub fn read_all(&self) -> PreferenceRecord {
        match self.inner.backend.borrow().load_all() {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Preference store unavailable, treating as empty: {:#}", e);
                PreferenceRecord::new()
            }
        }
    }

    /// Whether `identifier` is stored as `true`.
    pub fn is_enabled(&self, identifier: &str) -> bool {
        match self.inner.backend.borrow().get(identifier) {
            Ok(value) => value == Some(Value::Bool(true)),
            Err(e) => {
                tracing::warn!("Failed to read preference '{}': {:#}", identifier, e);
                false
            }
        }
    }

    /// Store a flag and notify subscribers if it changed.
    pub fn write(&self, identifier: &str, value: bool) {
        let new_value = Value::Bool(value);
        let result = {
            let mut backend = self.inner.backend.borrow_mut();
            backend.get(identifier).and_then(|old| {
                if old.as_ref() == Some(&new_value) {
                    return Ok(None);
                }
                backend.set(identifier, new_value.clone())?;
                Ok(Some(old))
            })
        };

        match result {
            Ok(Some(old_value)) => self.emit(identifier, old_value, Some(new_value)),
            Ok(None) => {}
            Err(e) => tracing::warn!("Failed to write preference '{}': {:#}", identifier, e),
        }
    }

    /// Delete a key and notify subscribers if it existed.
    pub fn remove(&self, identifier: &str) {
        let result = {
            let mut backend = self.inner.backend.borrow_mut();
            backend.get(identifier).and_then(|old| {
                if old.is_some() {
                    backend.remove(identifier)?;
                }
                Ok(old)
            })
        };

        match result {
            Ok(Some(old_value)) => self.emit(identifier, Some(old_value), None),
            Ok(None) => {}
            Err(e) => tracing::warn!("Failed to remove preference '{}': {:#}", identifier, e),
        }
    }

    /// Register a handler for every future change. Handlers live as long as
    /// the store.
    pub fn subscribe(&self, handler: impl Fn(&PreferenceChange) + 'static) {
        self.inner.subscribers.borrow_mut().push(Rc::new(handler));
    }

    fn emit(&self, identifier: &str, old_value: Option<Value>, new_value: Option<Value>) {
        let mut change = PreferenceChange::new();
        change.insert(
            identifier.to_string(),
            ValueChange {
                old_value,
                new_value,
            },
        );
        self.inner.queue.borrow_mut().push_back(change);

        // A write made from inside a subscriber is delivered after the
        // current change finishes.
        if self.inner.delivering.replace(true) {
            return;
        }
        let _delivering = DeliveryGuard(&self.inner.delivering);
        loop {
            let Some(change) = self.inner.queue.borrow_mut().pop_front() else {
                break;
            };
            let subscribers: Vec<Subscriber> = self.inner.subscribers.borrow().clone();
            for subscriber in subscribers {
                subscriber(&change);
            }
        }
    }
}

/// Clears the delivering flag even if a subscriber panics.
struct DeliveryGuard<'a>(&'a Cell<bool>);

impl Drop for DeliveryGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}
