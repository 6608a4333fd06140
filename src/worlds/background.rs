//! Privileged side: downloads and content-script registration.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::bridge::message::DOWNLOAD_MEDIA;
use crate::bridge::DownloadMedia;
use crate::manifest::{registered_scripts, RegisteredScript};

/// The host's download capability.
pub trait DownloadHost {
    fn download(&self, request: &DownloadMedia) -> anyhow::Result<()>;
}

#[derive(Debug, Deserialize)]
struct RuntimeMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

/// Background script state.
pub struct Background {
    downloads: Box<dyn DownloadHost>,
    scripts: Vec<RegisteredScript>,
}

impl std::fmt::Debug for Background {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Background")
            .field("scripts", &self.scripts)
            .finish_non_exhaustive()
    }
}

impl Background {
    pub fn new(downloads: impl DownloadHost + 'static) -> Self {
        Self {
            downloads: Box::new(downloads),
            scripts: Vec::new(),
        }
    }

    /// Register the content scripts for `origins`, replacing any earlier
    /// registration.
    pub fn on_installed(&mut self, origins: &[String]) -> &[RegisteredScript] {
        self.scripts = registered_scripts(origins);
        tracing::info!(scripts = self.scripts.len(), "Registered content scripts");
        &self.scripts
    }

    pub fn registered_scripts(&self) -> &[RegisteredScript] {
        &self.scripts
    }

    /// Handle a runtime message; returns the acknowledgement, if the message
    /// was one this side understands.
    pub fn handle_message(&self, message: &Value) -> Option<Value> {
        let message: RuntimeMessage = serde_json::from_value(message.clone()).ok()?;
        if message.kind != DOWNLOAD_MEDIA {
            return None;
        }
        let request: DownloadMedia = match serde_json::from_value(message.data) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!("Dropping malformed download request: {}", e);
                return None;
            }
        };

        tracing::info!(filename = %request.filename, url = %request.url, "Downloading media");
        match self.downloads.download(&request) {
            Ok(()) => Some(json!({"success": true})),
            Err(e) => {
                tracing::warn!("Download of {} failed: {}", request.filename, e);
                Some(json!({"success": false, "error": e.to_string()}))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct Recorder(Rc<RefCell<Vec<DownloadMedia>>>);

    impl DownloadHost for Recorder {
        fn download(&self, request: &DownloadMedia) -> anyhow::Result<()> {
            if request.url.is_empty() {
                anyhow::bail!("empty url");
            }
            self.0.borrow_mut().push(request.clone());
            Ok(())
        }
    }

    #[test]
    fn test_download_acknowledged() {
        let recorder = Recorder::default();
        let background = Background::new(recorder.clone());

        let ack = background.handle_message(&json!({
            "type": "downloadMedia",
            "data": {"filename": "@u-1.mp4", "url": "b"}
        }));

        assert_eq!(ack, Some(json!({"success": true})));
        assert_eq!(
            *recorder.0.borrow(),
            vec![DownloadMedia {
                filename: "@u-1.mp4".to_string(),
                url: "b".to_string()
            }]
        );
    }

    #[test]
    fn test_other_and_malformed_messages_ignored() {
        let recorder = Recorder::default();
        let background = Background::new(recorder.clone());

        assert_eq!(background.handle_message(&json!({"type": "ping"})), None);
        assert_eq!(
            background.handle_message(&json!({"type": "downloadMedia", "data": {"url": 3}})),
            None
        );
        assert_eq!(background.handle_message(&json!("downloadMedia")), None);
        assert!(recorder.0.borrow().is_empty());
    }

    #[test]
    fn test_failed_download_reported() {
        let background = Background::new(Recorder::default());
        let ack = background
            .handle_message(&json!({
                "type": "downloadMedia",
                "data": {"filename": "f.mp4", "url": ""}
            }))
            .unwrap();
        assert_eq!(ack["success"], json!(false));
    }

    #[test]
    fn test_on_installed_registers_scripts() {
        let mut background = Background::new(Recorder::default());
        assert!(background.registered_scripts().is_empty());

        let origins = vec!["https://x.com/*".to_string()];
        assert_eq!(background.on_installed(&origins).len(), 3);
        assert!(background
            .registered_scripts()
            .iter()
            .all(|s| s.matches == origins));
    }
}
