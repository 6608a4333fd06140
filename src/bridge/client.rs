//! Correlated request/response over the shared window.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::sync::oneshot;

use super::message::{BridgeMessage, CorrelationId};
use super::window::{Window, WindowListenerHandle};
use super::{BridgeError, BridgeResult};

type PendingMap = RefCell<HashMap<CorrelationId, oneshot::Sender<BridgeMessage>>>;

/// Removes a pending entry however the request ends: response, timeout or
/// the future being dropped.
struct PendingGuard {
    pending: Weak<PendingMap>,
    id: CorrelationId,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.upgrade() {
            pending.borrow_mut().remove(&self.id);
        }
    }
}

struct ClientInner {
    window: Window,
    pending: Rc<PendingMap>,
    router: WindowListenerHandle,
    default_timeout: Duration,
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        self.window.remove_listener(self.router);
    }
}

/// One world's end of the bridge.
///
/// Owns the table of in-flight requests and a single window listener that
/// routes responses to them by correlation id.
#[derive(Clone)]
pub struct BridgeClient {
    inner: Rc<ClientInner>,
}

impl std::fmt::Debug for BridgeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeClient")
            .field("pending", &self.pending_count())
            .field("default_timeout", &self.inner.default_timeout)
            .finish()
    }
}

impl BridgeClient {
    pub fn new(window: Window, default_timeout: Duration) -> Self {
        let pending: Rc<PendingMap> = Rc::new(RefCell::new(HashMap::new()));
        let routes = Rc::downgrade(&pending);
        let router = window.add_listener(move |raw| route_response(&routes, raw));

        Self {
            inner: Rc::new(ClientInner {
                window,
                pending,
                router,
                default_timeout,
            }),
        }
    }

    pub fn window(&self) -> &Window {
        &self.inner.window
    }

    /// Requests still waiting for a response.
    pub fn pending_count(&self) -> usize {
        self.inner.pending.borrow().len()
    }

    /// Send a request and wait for its response with the default timeout.
    pub async fn request(&self, kind: &str, data: Value) -> BridgeResult<BridgeMessage> {
        self.request_with_timeout(kind, data, self.inner.default_timeout)
            .await
    }

    /// Send a request and wait at most `timeout` for the matching response.
    pub async fn request_with_timeout(
        &self,
        kind: &str,
        data: Value,
        timeout: Duration,
    ) -> BridgeResult<BridgeMessage> {
        let (tx, rx) = oneshot::channel();
        let id = {
            let mut pending = self.inner.pending.borrow_mut();
            let id = loop {
                let candidate = CorrelationId::generate();
                if !pending.contains_key(&candidate) {
                    break candidate;
                }
            };
            pending.insert(id.clone(), tx);
            id
        };
        let _guard = PendingGuard {
            pending: Rc::downgrade(&self.inner.pending),
            id: id.clone(),
        };

        tracing::debug!(%id, kind, "Bridge request");
        self.inner
            .window
            .post_message(BridgeMessage::request(id.clone(), kind, data).to_value());

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(BridgeError::Disconnected {
                kind: kind.to_string(),
            }),
            Err(_) => {
                tracing::debug!(%id, kind, "Bridge request timed out");
                Err(BridgeError::Timeout {
                    kind: kind.to_string(),
                    after: timeout,
                })
            }
        }
    }

    /// Answer a request, spreading `fields` into the response's top level.
    pub fn respond(&self, correlation_id: &CorrelationId, fields: Map<String, Value>) {
        self.inner
            .window
            .post_message(BridgeMessage::response(correlation_id.clone(), fields).to_value());
    }

    /// Fire-and-forget message; nobody replies.
    pub fn notify(&self, kind: &str, data: Value) {
        self.inner
            .window
            .post_message(BridgeMessage::notification(kind, data).to_value());
    }

    /// Answer every request of `kind` with what `handler` returns.
    pub fn serve(
        &self,
        kind: &'static str,
        handler: impl Fn(&BridgeMessage) -> Map<String, Value> + 'static,
    ) -> WindowListenerHandle {
        let client = Rc::downgrade(&self.inner);
        self.inner.window.add_listener(move |raw| {
            let Some(request) = BridgeMessage::from_value(raw) else {
                return;
            };
            if request.is_response || !request.is_kind(kind) {
                return;
            }
            let Some(id) = request.correlation_id.as_ref() else {
                return;
            };
            let Some(inner) = client.upgrade() else {
                return;
            };
            let fields = handler(&request);
            BridgeClient { inner }.respond(id, fields);
        })
    }
}

fn route_response(pending: &Weak<PendingMap>, raw: &Value) {
    if raw.get("isResponse") != Some(&Value::Bool(true)) {
        return;
    }
    let Some(response) = BridgeMessage::from_value(raw) else {
        return;
    };
    let Some(id) = response.correlation_id.clone() else {
        return;
    };
    let Some(pending) = pending.upgrade() else {
        return;
    };

    let waiter = pending.borrow_mut().remove(&id);
    match waiter {
        Some(tx) => {
            let _ = tx.send(response);
        }
        None => tracing::debug!(%id, "Dropping unmatched bridge response"),
    }
}
