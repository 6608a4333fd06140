//! "Download Voice Post" in the drop-down menu of voice posts.
//!
//! Voice posts are stored as videos. The page world holds the post's
//! metadata in framework props; the menu item asks for it over the bridge,
//! picks the best variant and hands the download to the privileged side.

use serde::Deserialize;
use serde_json::Value;

use crate::bridge::message::{DOWNLOAD_MEDIA, GET_VOICE_POST_INFO};
use crate::bridge::{BridgeClient, DownloadMedia, VoicePostInfoRequest};
use crate::dom::{events, Document, Dom, Event, NodeId};
use crate::page::{self, media, selectors, InjectionPoint, MenuItem, VideoVariant};

use super::{Feature, FeatureError, FeatureMeta, FeatureResult, LocalTasks};

pub const META: FeatureMeta = FeatureMeta {
    identifier: "downloadVoicePosts",
    name: "Download Voice Posts",
    description: "Adds a download button on voice post menus.",
};

/// Element id of the injected menu item.
pub const ITEM_ID: &str = "extras-download-voice-post";
const LABEL: &str = "Download Voice Post";
const DOWNLOAD_ICON: &str = concat!(
    "M11.99 16l-5.7-5.7L7.7 8.88l3.29 3.3V2.59h2v9.59l3.3-3.3 ",
    "1.41 1.42-5.71 5.7zM21 15l-.02 3.51c0 1.38-1.12 2.49-2.5 ",
    "2.49H5.5C4.11 21 3 19.88 3 18.5V15h2v3.5c0 ",
    ".28.22.5.5.5h12.98c.28 0 .5-.22.5-.5L19 15h2z"
);

#[derive(Debug, Deserialize)]
struct VoicePostProperties {
    id_str: String,
    user: Author,
    extended_entities: Entities,
}

#[derive(Debug, Deserialize)]
struct Author {
    screen_name: String,
}

#[derive(Debug, Deserialize)]
struct Entities {
    media: Vec<MediaEntity>,
}

#[derive(Debug, Deserialize)]
struct MediaEntity {
    video_info: VideoInfo,
}

#[derive(Debug, Deserialize)]
struct VideoInfo {
    variants: Vec<VideoVariant>,
}

/// Build the download request from a `getVoicePostInfo` response's
/// `properties`.
pub fn download_from_properties(properties: &Value) -> Option<DownloadMedia> {
    let props: VoicePostProperties = serde_json::from_value(properties.clone()).ok()?;
    let variants = &props.extended_entities.media.first()?.video_info.variants;
    let url = media::best_variant(variants)?;
    Some(DownloadMedia {
        filename: media::media_filename(&props.user.screen_name, &props.id_str),
        url: url.to_string(),
    })
}

/// Whether the post that opened the current menu is a voice post.
pub fn is_voice_post_engaged(doc: &Document) -> bool {
    page::active_menu_post(doc)
        .is_some_and(|post| doc.query_selector(post, &selectors::VOICE_POST).is_some())
}

/// Fetch the active post's metadata, request the download, then close the
/// menu from `button`.
pub async fn download_voice_post(dom: &Dom, bridge: &BridgeClient, button: NodeId) -> FeatureResult<()> {
    let result = request_download(dom, bridge).await;
    dom.dispatch(Event::key(events::KEY_UP, button, "Escape"));
    result
}

async fn request_download(dom: &Dom, bridge: &BridgeClient) -> FeatureResult<()> {
    let post_id = dom
        .with(page::active_menu_post_id)
        .ok_or(FeatureError::MissingElement("active menu post"))?;

    let response = bridge
        .request(GET_VOICE_POST_INFO, VoicePostInfoRequest { post_id }.into_value())
        .await?;

    let download = response
        .field("properties")
        .and_then(download_from_properties)
        .ok_or(FeatureError::MissingFrameworkProps("voice post"))?;

    tracing::info!(filename = %download.filename, "Requesting voice post download");
    bridge.notify(DOWNLOAD_MEDIA, download.into_value());
    Ok(())
}

/// `downloadVoicePosts`
pub struct DownloadVoicePosts {
    dom: Dom,
    bridge: BridgeClient,
    tasks: LocalTasks,
    enabled: bool,
}

impl DownloadVoicePosts {
    /// Downloads started from the menu run on `tasks`.
    pub fn new(dom: Dom, bridge: BridgeClient, tasks: LocalTasks) -> Self {
        Self {
            dom,
            bridge,
            tasks,
            enabled: false,
        }
    }

    fn inject(&self, menu: NodeId) -> FeatureResult<()> {
        let point = self
            .dom
            .with(|doc| InjectionPoint::locate(doc, menu, &selectors::MENU_ITEM))
            .ok_or(FeatureError::MissingElement("menu item"))?;

        let item = MenuItem {
            identifier: ITEM_ID,
            label: LABEL,
            icon_path: Some(DOWNLOAD_ICON),
        };
        let (bridge, tasks) = (self.bridge.clone(), self.tasks.clone());
        point.inject(&self.dom, &item, move |dom, event| {
            let (dom, bridge, button) = (dom.clone(), bridge.clone(), event.current_target);
            tasks.spawn(async move {
                if let Err(e) = download_voice_post(&dom, &bridge, button).await {
                    tracing::warn!("Voice post download failed: {}", e);
                }
            });
        });
        Ok(())
    }
}

impl Feature for DownloadVoicePosts {
    fn meta(&self) -> &FeatureMeta {
        &META
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn activate(&mut self) -> FeatureResult<()> {
        if !self.enabled {
            self.enabled = true;
            tracing::debug!("Watching for voice post menus");
        }
        Ok(())
    }

    /// Stops injecting into future menus; items already added stay.
    fn deactivate(&mut self) -> FeatureResult<()> {
        self.enabled = false;
        Ok(())
    }

    fn observes_added_nodes(&self) -> bool {
        true
    }

    fn on_added_nodes(&mut self, added: &[NodeId]) -> FeatureResult<()> {
        let menus: Vec<NodeId> = self.dom.with(|doc| {
            if !is_voice_post_engaged(doc) {
                return Vec::new();
            }
            added
                .iter()
                .filter(|&&node| doc.is_element(node) && doc.is_connected(node))
                .filter_map(|&node| {
                    if doc.matches(node, &selectors::DROPDOWN) {
                        Some(node)
                    } else {
                        doc.query_selector(node, &selectors::DROPDOWN)
                    }
                })
                .collect()
        });
        for menu in menus {
            if let Err(e) = self.inject(menu) {
                tracing::warn!("Skipping voice post menu: {}", e);
            }
        }
        Ok(())
    }
}
