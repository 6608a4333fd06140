//! "Download Media" and "Picture-in-Picture" in the video context menu.
//!
//! Runs in the page world, where framework props are readable. It is not
//! preference-controlled: the page world activates it once at install.

use std::cell::RefCell;
use std::rc::Rc;

use crate::bridge::message::DOWNLOAD_MEDIA;
use crate::bridge::{BridgeClient, DownloadMedia};
use crate::dom::{events, Dom, Event, ListenerHandle, ListenerOptions, NodeId};
use crate::page::media::{self, parse_variants};
use crate::page::{selectors, FrameworkPropsReader, InjectionPoint, MenuItem, PropsQuery};

use super::{Feature, FeatureError, FeatureMeta, FeatureResult};

pub const META: FeatureMeta = FeatureMeta {
    identifier: "videoMenu",
    name: "Video Menu",
    description: "Adds Download Media and Picture-in-Picture to the video context menu.",
};

pub const DOWNLOAD_ITEM_ID: &str = "twitter-extras-download";
pub const PIP_ITEM_ID: &str = "twitter-extras-pip";

/// Read the download request for the video inside `video_component`.
pub fn video_download(
    dom: &Dom,
    props: &dyn FrameworkPropsReader,
    video_component: NodeId,
) -> FeatureResult<DownloadMedia> {
    dom.with(|doc| {
        let photo = doc
            .closest(video_component, &selectors::POST_PHOTO)
            .ok_or(FeatureError::MissingElement("post photo"))?;
        let video_props = props
            .read(doc, photo, PropsQuery::Path(&["children", "props"]))
            .filter(|p| p.get("videoType").is_some_and(|t| !t.is_null()))
            .ok_or(FeatureError::MissingFrameworkProps("post photo"))?;

        let author = video_props.get("authorScreenName").and_then(|v| v.as_str());
        let post_id = video_props.get("tweetId").and_then(|v| v.as_str());
        let variants = video_props
            .get("source")
            .and_then(|s| s.get("variants"))
            .map(parse_variants)
            .unwrap_or_default();

        match (author, post_id, media::best_variant(&variants)) {
            (Some(author), Some(post_id), Some(url)) => Ok(DownloadMedia {
                filename: media::media_filename(author, post_id),
                url: url.to_string(),
            }),
            _ => Err(FeatureError::MissingFrameworkProps("video props")),
        }
    })
}

/// Lift the site's PiP block on the component's video and enter PiP.
pub fn enter_picture_in_picture(dom: &Dom, video_component: NodeId) -> bool {
    let video = dom.with_mut(|doc| {
        let video = doc.query_selector(video_component, &selectors::VIDEO)?;
        doc.remove_attribute(video, "disablepictureinpicture");
        Some(video)
    });
    video.is_some_and(|video| dom.request_picture_in_picture(video))
}

/// `videoMenu`
pub struct VideoMenu {
    dom: Dom,
    bridge: BridgeClient,
    props: Rc<dyn FrameworkPropsReader>,
    listener: Option<ListenerHandle>,
    /// Items added to menus, removed again on deactivate.
    injected: Rc<RefCell<Vec<(NodeId, ListenerHandle)>>>,
}

impl VideoMenu {
    pub fn new(dom: Dom, bridge: BridgeClient, props: Rc<dyn FrameworkPropsReader>) -> Self {
        Self {
            dom,
            bridge,
            props,
            listener: None,
            injected: Rc::default(),
        }
    }
}

fn add_menu_items(
    dom: &Dom,
    bridge: &BridgeClient,
    props: &Rc<dyn FrameworkPropsReader>,
    injected: &RefCell<Vec<(NodeId, ListenerHandle)>>,
    video_component: NodeId,
) {
    let Some(point) =
        dom.with(|doc| InjectionPoint::locate(doc, video_component, &selectors::MENU_ITEM))
    else {
        return;
    };

    let download = MenuItem {
        identifier: DOWNLOAD_ITEM_ID,
        label: "Download Media",
        icon_path: None,
    };
    let (bridge, props) = (bridge.clone(), props.clone());
    let added = point.inject(dom, &download, move |dom, _| {
        match video_download(dom, props.as_ref(), video_component) {
            Ok(request) => {
                tracing::info!(filename = %request.filename, "Requesting video download");
                bridge.notify(DOWNLOAD_MEDIA, request.into_value());
            }
            Err(e) => tracing::debug!("Video download unavailable: {}", e),
        }
    });
    injected.borrow_mut().extend(added);

    let pip = MenuItem {
        identifier: PIP_ITEM_ID,
        label: "Picture-in-Picture",
        icon_path: None,
    };
    let added = point.inject(dom, &pip, move |dom, _| {
        if !enter_picture_in_picture(dom, video_component) {
            tracing::debug!("Picture-in-picture refused");
        }
    });
    injected.borrow_mut().extend(added);
}

impl Feature for VideoMenu {
    fn meta(&self) -> &FeatureMeta {
        &META
    }

    fn is_enabled(&self) -> bool {
        self.listener.is_some()
    }

    fn activate(&mut self) -> FeatureResult<()> {
        if self.listener.is_some() {
            return Ok(());
        }
        let (bridge, props, injected) = (self.bridge.clone(), self.props.clone(), self.injected.clone());
        self.listener = Some(self.dom.add_event_listener(
            self.dom.root(),
            events::CONTEXT_MENU,
            ListenerOptions::capture(),
            move |dom, event: &mut Event| {
                let component = dom.with(|doc| doc.closest(event.target, &selectors::VIDEO_COMPONENT));
                if let Some(component) = component {
                    add_menu_items(dom, &bridge, &props, &injected, component);
                }
            },
        ));
        Ok(())
    }

    fn deactivate(&mut self) -> FeatureResult<()> {
        let Some(handle) = self.listener.take() else {
            return Ok(());
        };
        self.dom.remove_event_listener(handle);
        let injected = std::mem::take(&mut *self.injected.borrow_mut());
        for (node, handle) in injected {
            self.dom.remove_event_listener(handle);
            self.dom.with_mut(|doc| doc.remove(node));
        }
        Ok(())
    }
}
