//! Feature lifecycle engine.
//!
//! Owns the registry, drives features from stored preferences and fans
//! document insertions out to them:
//!
//! - `start` observes the document, reconciles the full preference record
//!   and subscribes to changes.
//! - `reconcile` activates or deactivates features whose stored flag
//!   disagrees with their state, and purges keys no feature owns.
//! - `flush_mutations` hands each recorded insertion batch to every enabled
//!   feature that asked for added nodes.
//!
//! Work is serialized: a reconcile requested while another reconcile or a
//! fan-out is running is queued and run once the current pass returns.
//! Nothing a feature does escapes the engine; failures are logged.

mod reconcile;
mod registry;

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use crate::config::EngineConfig;
use crate::dom::{Document, Dom, MutationBatch};
use crate::storage::PreferenceStore;

pub use reconcile::{Desired, ReconcileItems};
pub use registry::Registry;

struct EngineInner {
    registry: RefCell<Registry>,
    store: PreferenceStore,
    dom: Dom,
    max_mutation_rounds: usize,
    queue: RefCell<VecDeque<ReconcileItems>>,
    busy: Cell<bool>,
    started: Cell<bool>,
}

/// Cloneable handle to the engine.
#[derive(Clone)]
pub struct FeatureEngine {
    inner: Rc<EngineInner>,
}

impl std::fmt::Debug for FeatureEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureEngine")
            .field("registry", &*self.inner.registry.borrow())
            .field("started", &self.inner.started.get())
            .finish_non_exhaustive()
    }
}

/// Clears the busy flag however a pass ends.
struct BusyGuard<'a>(&'a Cell<bool>);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl FeatureEngine {
    pub fn new(registry: Registry, store: PreferenceStore, dom: Dom, config: &EngineConfig) -> Self {
        Self {
            inner: Rc::new(EngineInner {
                registry: RefCell::new(registry),
                store,
                dom,
                max_mutation_rounds: config.max_mutation_rounds.max(1),
                queue: RefCell::new(VecDeque::new()),
                busy: Cell::new(false),
                started: Cell::new(false),
            }),
        }
    }

    /// Observe the document, apply stored preferences and follow changes.
    ///
    /// Returns `false` (and does nothing) if already started.
    pub fn start(&self) -> bool {
        if self.inner.started.replace(true) {
            tracing::warn!("Feature engine already started");
            return false;
        }

        self.inner.dom.with_mut(Document::observe);
        let record = self.inner.store.read_all();
        self.reconcile(ReconcileItems::Record(record));

        let engine = Rc::downgrade(&self.inner);
        self.inner.store.subscribe(move |change| {
            if let Some(inner) = engine.upgrade() {
                FeatureEngine { inner }.reconcile(ReconcileItems::Change(change.clone()));
            }
        });

        tracing::info!(
            features = self.inner.registry.borrow().len(),
            "Feature engine started"
        );
        true
    }

    pub fn is_started(&self) -> bool {
        self.inner.started.get()
    }

    /// Bring features in line with `items`; queued if a pass is running.
    pub fn reconcile(&self, items: ReconcileItems) {
        self.inner.queue.borrow_mut().push_back(items);
        if self.inner.busy.get() {
            return;
        }
        let _busy = self.enter();
        self.drain_reconciles();
    }

    fn enter(&self) -> BusyGuard<'_> {
        self.inner.busy.set(true);
        BusyGuard(&self.inner.busy)
    }

    fn drain_reconciles(&self) {
        loop {
            let next = self.inner.queue.borrow_mut().pop_front();
            match next {
                Some(items) => self.apply(&items),
                None => break,
            }
        }
    }

    fn apply(&self, items: &ReconcileItems) {
        for (identifier, desired) in items.entries() {
            let known = self.inner.registry.borrow().contains(identifier);
            if !known {
                tracing::debug!(key = identifier, "Purging legacy preference");
                self.inner.store.remove(identifier);
                continue;
            }

            let mut registry = self.inner.registry.borrow_mut();
            let Some(feature) = registry.get_mut(identifier) else {
                continue;
            };
            let result = match (desired, feature.is_enabled()) {
                (Desired::Enable, false) => {
                    tracing::info!("Enabling {}", identifier);
                    feature.activate()
                }
                (Desired::Disable, true) => {
                    tracing::info!("Disabling {}", identifier);
                    feature.deactivate()
                }
                _ => Ok(()),
            };
            if let Err(e) = result {
                tracing::warn!("Feature {} failed to change state: {}", identifier, e);
            }
        }
    }

    /// Fan recorded insertions out to features, repeating while features'
    /// own insertions produce new batches, up to the configured round limit.
    ///
    /// Returns the number of batches delivered. A re-entrant call returns 0.
    pub fn flush_mutations(&self) -> usize {
        if self.inner.busy.get() {
            return 0;
        }
        let _busy = self.enter();

        let mut delivered = 0;
        for _ in 0..self.inner.max_mutation_rounds {
            let batches = self.inner.dom.with_mut(Document::take_mutations);
            if batches.is_empty() {
                break;
            }
            for batch in &batches {
                self.fan_out(batch);
            }
            delivered += batches.len();
        }
        if self.inner.dom.with(|doc| doc.has_pending_mutations()) {
            tracing::warn!(
                rounds = self.inner.max_mutation_rounds,
                "Mutation fan-out still producing batches; deferring the rest"
            );
        }

        self.drain_reconciles();
        delivered
    }

    fn fan_out(&self, batch: &MutationBatch) {
        let mut registry = self.inner.registry.borrow_mut();
        for feature in registry.iter_mut() {
            if !feature.is_enabled() || !feature.observes_added_nodes() {
                continue;
            }
            if let Err(e) = feature.on_added_nodes(&batch.added) {
                tracing::warn!("{} failed on added nodes: {}", feature.identifier(), e);
            }
        }
    }

    /// Enabled state of a registered feature.
    pub fn is_enabled(&self, identifier: &str) -> Option<bool> {
        self.inner
            .registry
            .borrow()
            .get(identifier)
            .map(|f| f.is_enabled())
    }

    /// `(identifier, enabled)` for every feature, in registry order.
    pub fn states(&self) -> Vec<(&'static str, bool)> {
        self.inner
            .registry
            .borrow()
            .iter()
            .map(|f| (f.identifier(), f.is_enabled()))
            .collect()
    }

    pub fn store(&self) -> &PreferenceStore {
        &self.inner.store
    }

    pub fn dom(&self) -> &Dom {
        &self.inner.dom
    }
}
