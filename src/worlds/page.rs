//! Page-world script: framework access, no privileged APIs.

use std::rc::Rc;

use serde_json::{Map, Value};

use crate::bridge::message::GET_VOICE_POST_INFO;
use crate::bridge::{BridgeClient, VoicePostInfoRequest, WindowListenerHandle};
use crate::dom::Dom;
use crate::features::{Feature, VideoMenu};
use crate::page::{self, selectors, FrameworkPropsReader, PropsQuery};

/// Framework props of the post with `post_id`, if it is on the page.
pub fn find_post_properties(
    dom: &Dom,
    props: &dyn FrameworkPropsReader,
    post_id: &str,
) -> Option<Value> {
    dom.with(|doc| {
        doc.query_selector_all(doc.root(), &selectors::POST)
            .into_iter()
            .filter(|&post| page::post_id(doc, post).as_deref() == Some(post_id))
            .find_map(|post| {
                props
                    .read(doc, post, PropsQuery::Find("tweet"))
                    .filter(|tweet| match tweet.get("id_str").and_then(Value::as_str) {
                        Some(id) => id == post_id,
                        None => true,
                    })
            })
    })
}

/// Installed page-world script. Uninstalls itself when dropped.
pub struct PageWorld {
    bridge: BridgeClient,
    video_menu: VideoMenu,
    responder: WindowListenerHandle,
}

impl std::fmt::Debug for PageWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageWorld")
            .field("responder", &self.responder)
            .field("video_menu", &self.video_menu.is_enabled())
            .finish()
    }
}

impl PageWorld {
    pub fn install(dom: Dom, bridge: BridgeClient, props: Rc<dyn FrameworkPropsReader>) -> Self {
        let mut video_menu = VideoMenu::new(dom.clone(), bridge.clone(), props.clone());
        if let Err(e) = video_menu.activate() {
            tracing::warn!("Video menu unavailable: {}", e);
        }

        let responder = bridge.serve(GET_VOICE_POST_INFO, move |request| {
            let properties = serde_json::from_value::<VoicePostInfoRequest>(request.data.clone())
                .ok()
                .and_then(|request| find_post_properties(&dom, props.as_ref(), &request.post_id));
            if properties.is_none() {
                tracing::debug!(data = %request.data, "No voice post properties found");
            }

            let mut fields = Map::new();
            fields.insert("properties".to_string(), properties.unwrap_or(Value::Null));
            fields
        });

        Self {
            bridge,
            video_menu,
            responder,
        }
    }

    pub fn video_menu_active(&self) -> bool {
        self.video_menu.is_enabled()
    }
}

impl Drop for PageWorld {
    fn drop(&mut self) {
        self.bridge.window().remove_listener(self.responder);
        if let Err(e) = self.video_menu.deactivate() {
            tracing::debug!("Video menu teardown failed: {}", e);
        }
    }
}
