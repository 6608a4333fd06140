//! Cross-world bridge.
//!
//! The page-world script can read framework internals off DOM nodes but has
//! no privileged APIs; the extension-world script has download and messaging
//! APIs but no framework access. They talk over the shared window:
//!
//! ```text
//! extension world                 window                  page world
//! BridgeClient::request ──▶ {correlationId, type, data} ──▶ BridgeClient::serve
//!                       ◀── {correlationId, isResponse, ..} ◀── respond
//! BridgeClient::notify  ──▶ {type, data}  ──▶ mediator ──▶ background
//! ```
//!
//! Everything on the window is visible to every script on the page, so
//! consumers parse with [`BridgeMessage::from_value`] and filter on
//! `correlationId` and `isResponse` before trusting anything.

mod client;
pub mod message;
mod window;

use std::time::Duration;

use thiserror::Error;

pub use client::BridgeClient;
pub use message::{BridgeMessage, CorrelationId, DownloadMedia, VoicePostInfoRequest};
pub use window::{Window, WindowListenerHandle};

/// Default time a request waits for its response.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(3_000);

/// Bridge failures surfaced to request callers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BridgeError {
    #[error("Bridge request '{kind}' timed out after {}ms", .after.as_millis())]
    Timeout { kind: String, after: Duration },

    #[error("Bridge closed before '{kind}' was answered")]
    Disconnected { kind: String },
}

/// Result type for bridge requests.
pub type BridgeResult<T> = Result<T, BridgeError>;
