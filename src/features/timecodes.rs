//! Clickable timecodes in posts with a video.
//!
//! Once a video's duration is known, timestamps in the text of its post (or
//! one of the next two posts in the thread) become links that seek it.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::dom::{
    events, Document, Dom, Event, ListenerHandle, ListenerOptions, NodeId, Selector, TextSplit,
};
use crate::page::selectors;

use super::{install_stylesheet, remove_stylesheet, Feature, FeatureMeta, FeatureResult};

pub const META: FeatureMeta = FeatureMeta {
    identifier: "timecodes",
    name: "Clickable Timecodes",
    description: "Enables clickable timecodes in Tweets with a video.",
};

/// Fewest timestamps a post needs before any are linked.
pub const MIN_TIMECODES: usize = 2;
/// How many posts after the video's own are searched for timestamps.
pub const SCAN_DEPTH: usize = 2;

const STYLE_ID: &str = "feature-timecodes";
const STYLE: &str = r#"
a[data-timecode] {
    cursor: pointer;
    color: rgb(29, 155, 240);
    text-decoration: none;
}
"#;

/// `H:MM:SS`, `HH:MM:SS`, `M:SS` or `MM:SS`.
static TIMECODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:(?:[01]?[0-9]|2[0-3]):)?[0-5]?[0-9]:[0-5][0-9]")
        .unwrap_or_else(|e| panic!("built-in pattern: {e}"))
});

static TIMECODE_LINK: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("a[data-timecode]").unwrap_or_else(|e| panic!("built-in selector: {e}"))
});

/// Every timestamp token in `text`, in order.
pub fn find_timecodes(text: &str) -> Vec<&str> {
    TIMECODE.find_iter(text).map(|m| m.as_str()).collect()
}

/// `"1:02:03"` → 3723. `None` for anything that is not colon-separated
/// integers with at most three parts.
pub fn timestamp_to_seconds(timestamp: &str) -> Option<u32> {
    let parts: Vec<u32> = timestamp
        .split(':')
        .rev()
        .map(|part| part.parse().ok())
        .collect::<Option<_>>()?;
    match parts.as_slice() {
        [s] => Some(*s),
        [s, m] => Some(s + m * 60),
        [s, m, h] => Some(s + m * 60 + h * 3600),
        _ => None,
    }
}

/// `M:SS` below an hour, `H:MM:SS` above.
pub fn seconds_to_timestamp(seconds: u32) -> String {
    let (h, m, s) = (seconds / 3600, seconds / 60 % 60, seconds % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

#[derive(Default)]
struct TimecodeState {
    /// Videos still waiting for `loadedmetadata`.
    waiting: HashMap<NodeId, ListenerHandle>,
    /// Videos whose post text has been processed.
    linked: HashSet<NodeId>,
    /// Text nodes split around links, oldest first.
    splits: Vec<TextSplit>,
}

/// `timecodes`
pub struct Timecodes {
    dom: Dom,
    enabled: bool,
    click_delegate: Option<ListenerHandle>,
    state: Rc<RefCell<TimecodeState>>,
}

impl Timecodes {
    pub fn new(dom: Dom) -> Self {
        Self {
            dom,
            enabled: false,
            click_delegate: None,
            state: Rc::default(),
        }
    }

    fn process_media_within(&self, roots: &[NodeId]) {
        let media: Vec<NodeId> = self.dom.with(|doc| {
            let mut media = Vec::new();
            for &root in roots {
                if !doc.is_connected(root) {
                    continue;
                }
                if doc.matches(root, &selectors::MEDIA) {
                    media.push(root);
                }
                media.extend(doc.query_selector_all(root, &selectors::MEDIA));
            }
            media
        });
        for video in media {
            when_metadata_known(&self.dom, &self.state, video);
        }
    }
}

fn known_duration(doc: &Document, video: NodeId) -> Option<f64> {
    doc.media(video)?.duration.filter(|d| *d > 0.0)
}

fn when_metadata_known(dom: &Dom, state: &Rc<RefCell<TimecodeState>>, video: NodeId) {
    {
        let state = state.borrow();
        if state.linked.contains(&video) || state.waiting.contains_key(&video) {
            return;
        }
    }
    if dom.with(|doc| known_duration(doc, video)).is_some() {
        link_timecodes(dom, state, video);
        return;
    }

    let shared = Rc::downgrade(state);
    let handle = dom.add_event_listener(
        video,
        events::LOADED_METADATA,
        ListenerOptions::once(),
        move |dom, _| {
            if let Some(state) = shared.upgrade() {
                state.borrow_mut().waiting.remove(&video);
                link_timecodes(dom, &state, video);
            }
        },
    );
    state.borrow_mut().waiting.insert(video, handle);
}

fn link_timecodes(dom: &Dom, state: &Rc<RefCell<TimecodeState>>, video: NodeId) {
    if !state.borrow_mut().linked.insert(video) {
        return;
    }
    let splits = dom.with_mut(|doc| {
        let mut splits = Vec::new();
        let Some(duration) = known_duration(doc, video) else {
            return splits;
        };
        let Some((post_text, tokens)) = choose_post_text(doc, video) else {
            return splits;
        };
        let source = doc.attribute(video, "src").map(str::to_string);

        for token in tokens {
            let Some(seconds) = timestamp_to_seconds(&token) else {
                continue;
            };
            if f64::from(seconds) > duration {
                continue;
            }
            splits.extend(link_first_occurrence(doc, post_text, &token, source.as_deref()));
        }
        splits
    });
    tracing::debug!(linked = splits.len(), "Linked timecodes");
    state.borrow_mut().splits.extend(splits);
}

/// The first of the video's post and the next [`SCAN_DEPTH`] posts whose text
/// has at least [`MIN_TIMECODES`] timestamps.
fn choose_post_text(doc: &Document, video: NodeId) -> Option<(NodeId, Vec<String>)> {
    let post = doc.closest(video, &selectors::POST)?;
    let posts = doc.query_selector_all(doc.root(), &selectors::POST);
    let start = posts.iter().position(|&p| p == post)?;

    posts[start..]
        .iter()
        .take(SCAN_DEPTH + 1)
        .find_map(|&candidate| {
            let post_text = doc.query_selector(candidate, &selectors::POST_TEXT)?;
            let text = doc.text_content(post_text);
            let tokens = find_timecodes(&text);
            (tokens.len() >= MIN_TIMECODES)
                .then(|| (post_text, tokens.into_iter().map(str::to_string).collect()))
        })
}

fn inside_link(doc: &Document, node: NodeId) -> bool {
    doc.parent_element(node)
        .is_some_and(|parent| doc.closest(parent, &TIMECODE_LINK).is_some())
}

/// Wrap the first unlinked occurrence of `token` under `post_text`.
fn link_first_occurrence(
    doc: &mut Document,
    post_text: NodeId,
    token: &str,
    source: Option<&str>,
) -> Option<TextSplit> {
    for node in doc.text_nodes(post_text) {
        if inside_link(doc, node) {
            continue;
        }
        let Some(text) = doc.text(node).map(str::to_string) else {
            continue;
        };
        let Some(found) = TIMECODE.find_iter(&text).find(|m| m.as_str() == token) else {
            continue;
        };

        let link = doc.create_element("a");
        doc.set_attribute(link, "href", "#");
        doc.set_attribute(link, "data-timecode", token);
        if let Some(source) = source {
            doc.set_attribute(link, "data-media-src", source);
        }
        doc.set_text_content(link, token);

        let mut replacement = Vec::with_capacity(3);
        if found.start() > 0 {
            replacement.push(doc.create_text(&text[..found.start()]));
        }
        replacement.push(link);
        if found.end() < text.len() {
            replacement.push(doc.create_text(&text[found.end()..]));
        }
        return doc.split_text(node, replacement);
    }
    None
}

/// Body click delegate: seek the link's video.
fn seek_on_click(dom: &Dom, event: &mut Event) {
    dom.with_mut(|doc| {
        let Some(link) = doc.closest(event.target, &TIMECODE_LINK) else {
            return;
        };
        let Some(video) = target_media(doc, link) else {
            return;
        };
        event.prevent_default();

        let Some(seconds) = doc
            .attribute(link, "data-timecode")
            .and_then(timestamp_to_seconds)
        else {
            return;
        };
        if known_duration(doc, video).is_some_and(|d| f64::from(seconds) > d) {
            return;
        }
        if let Some(media) = doc.media_mut(video) {
            media.current_time = f64::from(seconds);
            media.muted = false;
        }
    });
}

/// The video a link was made for: by source URL, else the link's own post.
fn target_media(doc: &Document, link: NodeId) -> Option<NodeId> {
    let by_source = doc.attribute(link, "data-media-src").and_then(|source| {
        doc.query_selector_all(doc.root(), &selectors::MEDIA)
            .into_iter()
            .find(|&video| doc.attribute(video, "src") == Some(source))
    });
    by_source.or_else(|| {
        let post = doc.closest(link, &selectors::POST)?;
        doc.query_selector(post, &selectors::MEDIA)
    })
}

/// Undo splits newest first, so a split of an earlier split's remainder is
/// joined before the earlier one. Links whose split cannot be joined become
/// plain text in place.
fn revert_links(doc: &mut Document, splits: Vec<TextSplit>) -> usize {
    let mut reverted = 0;
    for split in splits.iter().rev() {
        if doc.join_split(split) {
            reverted += 1;
            continue;
        }
        for &piece in &split.pieces {
            if doc.matches(piece, &TIMECODE_LINK) && doc.parent(piece).is_some() {
                let token = doc.text_content(piece);
                let text = doc.create_text(&token);
                doc.replace_with(piece, &[text]);
            }
        }
    }
    reverted
}

impl Feature for Timecodes {
    fn meta(&self) -> &FeatureMeta {
        &META
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn activate(&mut self) -> FeatureResult<()> {
        if self.enabled {
            return Ok(());
        }
        self.enabled = true;
        self.dom.with_mut(|doc| install_stylesheet(doc, STYLE_ID, STYLE));
        self.click_delegate = Some(self.dom.add_event_listener(
            self.dom.body(),
            events::CLICK,
            ListenerOptions::default(),
            seek_on_click,
        ));
        let root = self.dom.root();
        self.process_media_within(&[root]);
        Ok(())
    }

    fn deactivate(&mut self) -> FeatureResult<()> {
        if !self.enabled {
            return Ok(());
        }
        self.enabled = false;
        if let Some(handle) = self.click_delegate.take() {
            self.dom.remove_event_listener(handle);
        }
        let (waiting, splits): (Vec<_>, _) = {
            let mut state = self.state.borrow_mut();
            state.linked.clear();
            let splits = std::mem::take(&mut state.splits);
            (state.waiting.drain().map(|(_, handle)| handle).collect(), splits)
        };
        for handle in waiting {
            self.dom.remove_event_listener(handle);
        }

        let reverted = self.dom.with_mut(|doc| {
            remove_stylesheet(doc, STYLE_ID);
            revert_links(doc, splits)
        });
        tracing::debug!(reverted, "Reverted timecode links");
        Ok(())
    }

    fn observes_added_nodes(&self) -> bool {
        true
    }

    fn on_added_nodes(&mut self, added: &[NodeId]) -> FeatureResult<()> {
        self.process_media_within(added);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THREAD: &str = concat!(
        "<article data-testid='tweet'>",
        "<div data-testid='tweetText'>0:10 start, 1:30 middle</div>",
        "<div data-testid='videoComponent'><video src='https://video.example/a.mp4'></video></div>",
        "</article>"
    );

    fn video(dom: &Dom) -> NodeId {
        dom.with(|doc| doc.query_selector(doc.root(), &selectors::MEDIA))
            .unwrap()
    }

    fn links(dom: &Dom) -> Vec<NodeId> {
        dom.with(|doc| doc.query_selector_all(doc.root(), &TIMECODE_LINK))
    }

    #[test]
    fn test_find_timecodes() {
        assert_eq!(find_timecodes("0:10 start, 1:30 middle"), vec!["0:10", "1:30"]);
        assert_eq!(find_timecodes("at 1:02:03 and 23:59:59"), vec!["1:02:03", "23:59:59"]);
        assert_eq!(find_timecodes("no time 9:7"), Vec::<&str>::new());
    }

    #[test]
    fn test_seconds_conversion() {
        assert_eq!(timestamp_to_seconds("0:10"), Some(10));
        assert_eq!(timestamp_to_seconds("1:30"), Some(90));
        assert_eq!(timestamp_to_seconds("1:02:03"), Some(3723));
        assert_eq!(timestamp_to_seconds("x:10"), None);
        assert_eq!(timestamp_to_seconds("1:1:1:1"), None);

        for token in ["0:10", "1:30", "59:59", "1:02:03", "23:00:00"] {
            let seconds = timestamp_to_seconds(token).unwrap();
            assert_eq!(seconds_to_timestamp(seconds), token);
        }
        assert_eq!(seconds_to_timestamp(timestamp_to_seconds("01:05").unwrap()), "1:05");
    }

    #[test]
    fn test_links_after_metadata() {
        let dom = Dom::new();
        dom.append_html(dom.body(), THREAD).unwrap();
        let mut feature = Timecodes::new(dom.clone());

        feature.activate().unwrap();
        assert!(links(&dom).is_empty());

        dom.load_media_metadata(video(&dom), 200.0);
        let found = links(&dom);
        assert_eq!(found.len(), 2);
        dom.with(|doc| {
            assert_eq!(doc.attribute(found[0], "data-timecode"), Some("0:10"));
            assert_eq!(doc.attribute(found[1], "data-timecode"), Some("1:30"));
            assert_eq!(
                doc.attribute(found[1], "data-media-src"),
                Some("https://video.example/a.mp4")
            );
        });

        let event = dom.dispatch(Event::new(events::CLICK, found[1]));
        assert!(event.default_prevented());
        dom.with(|doc| {
            let media = doc.media(video(&dom)).unwrap();
            assert_eq!(media.current_time, 90.0);
            assert!(!media.muted);
        });
    }

    #[test]
    fn test_token_past_duration_not_linked() {
        let dom = Dom::new();
        dom.append_html(dom.body(), THREAD).unwrap();
        dom.load_media_metadata(video(&dom), 60.0);
        let mut feature = Timecodes::new(dom.clone());

        feature.activate().unwrap();
        let found = links(&dom);
        assert_eq!(found.len(), 1);
        dom.with(|doc| assert_eq!(doc.attribute(found[0], "data-timecode"), Some("0:10")));
    }

    #[test]
    fn test_single_timestamp_not_linked() {
        let dom = Dom::new();
        dom.append_html(
            dom.body(),
            concat!(
                "<article data-testid='tweet'><div data-testid='tweetText'>see 0:10</div>",
                "<div data-testid='videoComponent'><video></video></div></article>"
            ),
        )
        .unwrap();
        dom.load_media_metadata(video(&dom), 100.0);
        let mut feature = Timecodes::new(dom.clone());

        feature.activate().unwrap();
        assert!(links(&dom).is_empty());
    }

    #[test]
    fn test_next_post_in_thread_is_scanned() {
        let dom = Dom::new();
        dom.append_html(
            dom.body(),
            concat!(
                "<article data-testid='tweet'><div data-testid='tweetText'>watch</div>",
                "<div data-testid='videoComponent'><video></video></div></article>",
                "<article data-testid='tweet'><div data-testid='tweetText'>nothing</div></article>",
                "<article data-testid='tweet'><div data-testid='tweetText'>1:00 and 2:00</div></article>"
            ),
        )
        .unwrap();
        dom.load_media_metadata(video(&dom), 300.0);
        let mut feature = Timecodes::new(dom.clone());

        feature.activate().unwrap();
        let found = links(&dom);
        assert_eq!(found.len(), 2);

        // No stored source: the click falls back to the link's own post,
        // which has no video, so nothing happens.
        let event = dom.dispatch(Event::new(events::CLICK, found[0]));
        assert!(!event.default_prevented());
    }

    #[test]
    fn test_added_video_is_processed() {
        let dom = Dom::new();
        let mut feature = Timecodes::new(dom.clone());
        feature.activate().unwrap();

        let added = dom.append_html(dom.body(), THREAD).unwrap();
        feature.on_added_nodes(&added).unwrap();
        dom.load_media_metadata(video(&dom), 120.0);
        assert_eq!(links(&dom).len(), 2);

        // Reprocessing the same video does not nest links.
        feature.on_added_nodes(&added).unwrap();
        assert_eq!(links(&dom).len(), 2);
    }

    #[test]
    fn test_deactivate_reverts() {
        let dom = Dom::new();
        dom.append_html(dom.body(), THREAD).unwrap();
        let before = dom.to_html(dom.root());
        let listeners = dom.listener_count();
        let mut feature = Timecodes::new(dom.clone());

        feature.activate().unwrap();
        dom.load_media_metadata(video(&dom), 200.0);
        assert_eq!(links(&dom).len(), 2);

        feature.deactivate().unwrap();
        assert_eq!(dom.to_html(dom.root()), before);
        assert_eq!(dom.listener_count(), listeners);
    }

    #[test]
    fn test_deactivate_keeps_separate_text_nodes() {
        let dom = Dom::new();
        dom.append_html(
            dom.body(),
            concat!(
                "<article data-testid='tweet'><div data-testid='tweetText'></div>",
                "<div data-testid='videoComponent'><video></video></div></article>"
            ),
        )
        .unwrap();
        let post_text = dom
            .with(|doc| doc.query_selector(doc.root(), &selectors::POST_TEXT))
            .unwrap();
        let before = dom.with_mut(|doc| {
            let intro = doc.create_text("intro ");
            let times = doc.create_text("0:10 then 1:30 end");
            doc.append_child(post_text, intro);
            doc.append_child(post_text, times);
            vec![intro, times]
        });
        dom.load_media_metadata(video(&dom), 200.0);
        let mut feature = Timecodes::new(dom.clone());

        feature.activate().unwrap();
        assert_eq!(links(&dom).len(), 2);

        feature.deactivate().unwrap();
        dom.with(|doc| {
            assert_eq!(doc.children(post_text), before.as_slice());
            assert_eq!(doc.text(before[0]), Some("intro "));
            assert_eq!(doc.text(before[1]), Some("0:10 then 1:30 end"));
        });
    }

    #[test]
    fn test_repeated_activate_and_deactivate() {
        let dom = Dom::new();
        dom.append_html(dom.body(), THREAD).unwrap();
        dom.load_media_metadata(video(&dom), 200.0);
        let before = dom.to_html(dom.root());
        let mut feature = Timecodes::new(dom.clone());

        feature.activate().unwrap();
        let linked = dom.to_html(dom.root());
        let listeners = dom.listener_count();
        feature.activate().unwrap();
        assert_eq!(dom.to_html(dom.root()), linked);
        assert_eq!(dom.listener_count(), listeners);

        feature.deactivate().unwrap();
        feature.deactivate().unwrap();
        assert_eq!(dom.to_html(dom.root()), before);
        assert_eq!(dom.listener_count(), 0);
    }

    #[test]
    fn test_deactivate_drops_pending_metadata_wait() {
        let dom = Dom::new();
        dom.append_html(dom.body(), THREAD).unwrap();
        let mut feature = Timecodes::new(dom.clone());

        feature.activate().unwrap();
        feature.deactivate().unwrap();
        assert_eq!(dom.listener_count(), 0);

        dom.load_media_metadata(video(&dom), 200.0);
        assert!(links(&dom).is_empty());
    }
}
