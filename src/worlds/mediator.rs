//! Relays `downloadMedia` notifications from the window to the background.

use std::rc::Rc;

use serde_json::json;

use crate::bridge::message::DOWNLOAD_MEDIA;
use crate::bridge::{BridgeMessage, Window, WindowListenerHandle};

use super::Background;

/// The mediator script. Stops relaying when dropped.
#[derive(Debug)]
pub struct Mediator {
    window: Window,
    listener: WindowListenerHandle,
}

impl Mediator {
    pub fn install(window: &Window, background: Rc<Background>) -> Self {
        let listener = window.add_listener(move |raw| {
            let Some(message) = BridgeMessage::from_value(raw) else {
                return;
            };
            if message.is_response || !message.is_kind(DOWNLOAD_MEDIA) {
                return;
            }
            let runtime = json!({"type": DOWNLOAD_MEDIA, "data": message.data});
            match background.handle_message(&runtime) {
                Some(ack) => tracing::debug!(%ack, "Download relayed"),
                None => tracing::debug!("Background ignored relayed download"),
            }
        });
        Self {
            window: window.clone(),
            listener,
        }
    }
}

impl Drop for Mediator {
    fn drop(&mut self) {
        self.window.remove_listener(self.listener);
    }
}
