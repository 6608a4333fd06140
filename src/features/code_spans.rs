//! Inline code spans in post text.
//!
//! Text like ``use `npm install` now`` is split into plain text and `<code>`
//! elements. A span is a single-backtick-delimited run that is not part of a
//! longer backtick sequence, so triple-backtick fences are left alone.

use std::cell::RefCell;

use crate::dom::{Document, Dom, NodeId, TextSplit};
use crate::page::selectors;

use super::{Feature, FeatureMeta, FeatureResult};

pub const META: FeatureMeta = FeatureMeta {
    identifier: "formatCodeBlocks",
    name: "Format Code Blocks",
    description: "Formats inline code blocks.",
};

/// Marks `<code>` elements this feature created.
const MARKER: &str = "data-inline-code";
const CODE_STYLE: &str = "padding: 0.15em; font-size: 0.85em; color: rgb(255, 127, 80);";

/// A piece of text after span detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    /// Inner text of a span, without the backticks.
    Code(&'a str),
}

/// Split `text` into plain and code segments. Empty plain pieces are
/// dropped; empty code spans are kept.
pub fn split_code_spans(text: &str) -> Vec<Segment<'_>> {
    let bytes = text.as_bytes();
    let mut segments = Vec::new();
    let mut plain_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'`' || (i > 0 && bytes[i - 1] == b'`') {
            i += 1;
            continue;
        }
        let Some(offset) = bytes[i + 1..].iter().position(|&b| b == b'`') else {
            break;
        };
        let close = i + 1 + offset;
        if bytes.get(close + 1) == Some(&b'`') {
            i += 1;
            continue;
        }

        if plain_start < i {
            segments.push(Segment::Text(&text[plain_start..i]));
        }
        segments.push(Segment::Code(&text[i + 1..close]));
        plain_start = close + 1;
        i = close + 1;
    }

    if plain_start < text.len() {
        segments.push(Segment::Text(&text[plain_start..]));
    }
    segments
}

/// Whether `text` contains at least one span.
pub fn has_code_spans(text: &str) -> bool {
    split_code_spans(text)
        .iter()
        .any(|s| matches!(s, Segment::Code(_)))
}

/// Inverse of [`split_code_spans`].
pub fn revert_code_spans(segments: &[Segment<'_>]) -> String {
    segments
        .iter()
        .map(|segment| match segment {
            Segment::Text(text) => text.to_string(),
            Segment::Code(code) => format!("`{code}`"),
        })
        .collect()
}

/// Replace every span-bearing text node under `post_text`.
///
/// Returns the splits made, for [`revert_splits`].
pub fn format_post_text(doc: &mut Document, post_text: NodeId) -> Vec<TextSplit> {
    let mut splits = Vec::new();
    for node in doc.text_nodes(post_text) {
        let Some(text) = doc.text(node).map(str::to_string) else {
            continue;
        };
        let segments = split_code_spans(&text);
        if !segments.iter().any(|s| matches!(s, Segment::Code(_))) {
            continue;
        }

        let pieces: Vec<NodeId> = segments
            .iter()
            .map(|segment| match segment {
                Segment::Text(plain) => doc.create_text(plain),
                Segment::Code(code) => {
                    let element = doc.create_element("code");
                    doc.set_attribute(element, MARKER, "");
                    doc.set_attribute(element, "style", CODE_STYLE);
                    doc.set_text_content(element, code);
                    element
                }
            })
            .collect();
        splits.extend(doc.split_text(node, pieces));
    }
    splits
}

/// Undo splits, newest first. A split whose pieces the site has since moved
/// keeps its surviving `<code>` elements as backticked text instead.
///
/// Returns how many splits were joined back whole.
pub fn revert_splits(doc: &mut Document, splits: Vec<TextSplit>) -> usize {
    let mut joined = 0;
    for split in splits.iter().rev() {
        if doc.join_split(split) {
            joined += 1;
            continue;
        }
        for &piece in &split.pieces {
            if doc.has_attribute(piece, MARKER) && doc.parent(piece).is_some() {
                let restored = format!("`{}`", doc.text_content(piece));
                let text = doc.create_text(&restored);
                doc.replace_with(piece, &[text]);
            }
        }
    }
    joined
}

/// `formatCodeBlocks`
pub struct FormatCodeBlocks {
    dom: Dom,
    enabled: bool,
    splits: RefCell<Vec<TextSplit>>,
}

impl FormatCodeBlocks {
    pub fn new(dom: Dom) -> Self {
        Self {
            dom,
            enabled: false,
            splits: RefCell::default(),
        }
    }

    fn format_within(&self, roots: &[NodeId]) -> usize {
        self.dom.with_mut(|doc| {
            let mut targets = Vec::new();
            for &root in roots {
                if !doc.is_connected(root) {
                    continue;
                }
                if doc.matches(root, &selectors::POST_TEXT) {
                    targets.push(root);
                }
                targets.extend(doc.query_selector_all(root, &selectors::POST_TEXT));
            }
            let mut splits = self.splits.borrow_mut();
            let before = splits.len();
            for post_text in targets {
                splits.extend(format_post_text(doc, post_text));
            }
            splits.len() - before
        })
    }
}

impl Feature for FormatCodeBlocks {
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
        let root = self.dom.root();
        let replaced = self.format_within(&[root]);
        tracing::debug!(replaced, "Formatted existing code spans");
        Ok(())
    }

    fn deactivate(&mut self) -> FeatureResult<()> {
        if !self.enabled {
            return Ok(());
        }
        self.enabled = false;
        let splits = std::mem::take(&mut *self.splits.borrow_mut());
        let reverted = self.dom.with_mut(|doc| revert_splits(doc, splits));
        tracing::debug!(reverted, "Reverted code spans");
        Ok(())
    }

    fn observes_added_nodes(&self) -> bool {
        true
    }

    fn on_added_nodes(&mut self, added: &[NodeId]) -> FeatureResult<()> {
        self.format_within(added);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Segment::{Code, Text};

    #[test]
    fn test_split_simple() {
        assert_eq!(
            split_code_spans("use `npm install` now"),
            vec![Text("use "), Code("npm install"), Text(" now")]
        );
        assert_eq!(split_code_spans("`a` and `b`"), vec![Code("a"), Text(" and "), Code("b")]);
    }

    #[test]
    fn test_split_edge_cases() {
        assert_eq!(split_code_spans("`x"), vec![Text("`x")]);
        assert_eq!(split_code_spans("empty `` span"), vec![Text("empty "), Code(""), Text(" span")]);
        assert_eq!(split_code_spans("`a\nb`"), vec![Code("a\nb")]);
        assert_eq!(split_code_spans("```fence```"), vec![Text("```fence```")]);
        assert_eq!(split_code_spans("a `b` `c"), vec![Text("a "), Code("b"), Text(" `c")]);
        assert!(split_code_spans("").is_empty());
        assert!(!has_code_spans("no code here"));
    }

    #[test]
    fn test_revert_inverts_split() {
        for text in [
            "use `npm install` now",
            "`a` `b` `",
            "plain",
            "`` and ```x``` and `ünïcødé`",
            "",
        ] {
            assert_eq!(revert_code_spans(&split_code_spans(text)), text);
        }
    }

    fn post(dom: &Dom, text: &str) -> NodeId {
        let ids = dom
            .append_html(dom.body(), "<div data-testid='tweetText'></div>")
            .unwrap();
        dom.with_mut(|doc| doc.set_text_content(ids[0], text));
        ids[0]
    }

    #[test]
    fn test_activate_formats_and_deactivate_restores() {
        let dom = Dom::new();
        let post_text = post(&dom, "use `npm install` now");
        let before = dom.to_html(dom.body());
        let mut feature = FormatCodeBlocks::new(dom.clone());

        feature.activate().unwrap();
        dom.with(|doc| {
            let children = doc.children(post_text);
            assert_eq!(children.len(), 3);
            assert_eq!(doc.text(children[0]), Some("use "));
            assert_eq!(doc.tag_name(children[1]), Some("code"));
            assert_eq!(doc.text_content(children[1]), "npm install");
            assert_eq!(doc.text(children[2]), Some(" now"));
        });

        feature.deactivate().unwrap();
        dom.with(|doc| assert_eq!(doc.children(post_text).len(), 1));
        assert_eq!(dom.to_html(dom.body()), before);
    }

    #[test]
    fn test_added_nodes_are_formatted() {
        let dom = Dom::new();
        let mut feature = FormatCodeBlocks::new(dom.clone());
        feature.activate().unwrap();

        let added = dom
            .append_html(dom.body(), "<article><div data-testid='tweetText'>run `ls`</div></article>")
            .unwrap();
        feature.on_added_nodes(&added).unwrap();

        assert!(dom
            .to_html(dom.body())
            .contains("run <code data-inline-code=\"\" style=\"padding: 0.15em; font-size: 0.85em; color: rgb(255, 127, 80);\">ls</code>"));
    }

    #[test]
    fn test_deactivate_keeps_separate_text_nodes() {
        let dom = Dom::new();
        let post_text = dom
            .append_html(dom.body(), "<div data-testid='tweetText'></div>")
            .unwrap()[0];
        dom.with_mut(|doc| {
            let see = doc.create_text("see ");
            let code = doc.create_text("`x` here");
            doc.append_child(post_text, see);
            doc.append_child(post_text, code);
        });
        let before = dom.with(|doc| doc.children(post_text).to_vec());
        let mut feature = FormatCodeBlocks::new(dom.clone());

        feature.activate().unwrap();
        dom.with(|doc| assert_eq!(doc.children(post_text).len(), 3));

        feature.deactivate().unwrap();
        dom.with(|doc| {
            assert_eq!(doc.children(post_text), before.as_slice());
            assert_eq!(doc.text(before[0]), Some("see "));
            assert_eq!(doc.text(before[1]), Some("`x` here"));
        });
    }

    #[test]
    fn test_repeated_activate_and_deactivate() {
        let dom = Dom::new();
        let post_text = post(&dom, "use `npm install` now");
        let before = dom.to_html(dom.body());
        let mut feature = FormatCodeBlocks::new(dom.clone());

        feature.activate().unwrap();
        let formatted = dom.to_html(dom.body());
        feature.activate().unwrap();
        assert_eq!(dom.to_html(dom.body()), formatted);

        feature.deactivate().unwrap();
        feature.deactivate().unwrap();
        assert!(!feature.is_enabled());
        assert_eq!(dom.to_html(dom.body()), before);
        dom.with(|doc| assert_eq!(doc.children(post_text).len(), 1));
        assert_eq!(dom.listener_count(), 0);
    }

    #[test]
    fn test_code_outside_post_text_untouched() {
        let dom = Dom::new();
        dom.append_html(dom.body(), "<p>keep `this`</p>").unwrap();
        let before = dom.to_html(dom.body());
        let mut feature = FormatCodeBlocks::new(dom.clone());

        feature.activate().unwrap();
        assert_eq!(dom.to_html(dom.body()), before);
    }
}
