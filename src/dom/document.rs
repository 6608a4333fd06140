//! Arena-backed document tree.
//!
//! Nodes are never freed: removing a node detaches it from its parent, and a
//! detached subtree can be re-attached later. This mirrors how page scripts
//! hold on to nodes they have taken out of the tree.

use serde_json::{Map, Value};

use super::selector::Selector;

/// Identifier of a node inside a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// What kind of node an id refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element,
    Text,
}

/// Playback state of a `video` or `audio` element.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MediaState {
    /// Duration in seconds; `None` until metadata has loaded.
    pub duration: Option<f64>,
    pub current_time: f64,
    pub muted: bool,
    pub picture_in_picture: bool,
}

/// A text node replaced by the pieces it was split into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSplit {
    pub original: NodeId,
    pub pieces: Vec<NodeId>,
}

/// One observed insertion: the nodes added under `target` by a single call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationBatch {
    pub target: NodeId,
    pub added: Vec<NodeId>,
}

#[derive(Debug, Clone)]
struct ElementData {
    tag: String,
    attributes: Vec<(String, String)>,
    /// Script-visible own properties (framework internals live here).
    properties: Map<String, Value>,
    media: Option<MediaState>,
}

#[derive(Debug, Clone)]
enum NodeData {
    Document,
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

const MEDIA_TAGS: &[&str] = &["video", "audio"];

/// An in-memory page document.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    head: NodeId,
    body: NodeId,
    observing: bool,
    mutations: Vec<MutationBatch>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document with `html`, `head` and `body` elements.
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: vec![Node {
                data: NodeData::Document,
                parent: None,
                children: Vec::new(),
            }],
            root: NodeId(0),
            head: NodeId(0),
            body: NodeId(0),
            observing: false,
            mutations: Vec::new(),
        };

        let html = doc.create_element("html");
        let head = doc.create_element("head");
        let body = doc.create_element("body");
        doc.append_child(doc.root, html);
        doc.append_child(html, head);
        doc.append_child(html, body);
        doc.head = head;
        doc.body = body;
        doc
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn head(&self) -> NodeId {
        self.head
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    // ─────────────────────────────────────────────────────────────────────
    // Construction
    // ─────────────────────────────────────────────────────────────────────

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            data,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        let tag = tag.to_ascii_lowercase();
        let media = MEDIA_TAGS
            .contains(&tag.as_str())
            .then(MediaState::default);
        self.push(NodeData::Element(ElementData {
            tag,
            attributes: Vec::new(),
            properties: Map::new(),
            media,
        }))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    /// Copy a node. Attributes, text and (when `deep`) children are copied;
    /// framework properties, media state and listeners are not.
    pub fn clone_node(&mut self, node: NodeId, deep: bool) -> NodeId {
        let data = match &self.nodes[node.0].data {
            NodeData::Document => NodeData::Document,
            NodeData::Text(text) => NodeData::Text(text.clone()),
            NodeData::Element(el) => NodeData::Element(ElementData {
                tag: el.tag.clone(),
                attributes: el.attributes.clone(),
                properties: Map::new(),
                media: el.media.as_ref().map(|_| MediaState::default()),
            }),
        };
        let copy = self.push(data);

        if deep {
            let children = self.nodes[node.0].children.clone();
            for child in children {
                let child_copy = self.clone_node(child, true);
                self.append_child(copy, child_copy);
            }
        }
        copy
    }

    // ─────────────────────────────────────────────────────────────────────
    // Tree mutation
    // ─────────────────────────────────────────────────────────────────────

    fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != node);
        }
    }

    fn record(&mut self, target: NodeId, added: Vec<NodeId>) {
        if self.observing && !added.is_empty() && self.is_connected(target) {
            self.mutations.push(MutationBatch { target, added });
        }
    }

    /// Append `child` as the last child of `parent`, moving it if attached.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_before(parent, child, None);
    }

    /// Insert `child` before `reference` (or at the end when `None`).
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        self.insert_all(parent, &[child], reference);
    }

    pub(super) fn insert_all(&mut self, parent: NodeId, children: &[NodeId], reference: Option<NodeId>) {
        for &child in children {
            self.detach(child);
        }

        let mut index = reference
            .and_then(|r| self.nodes[parent.0].children.iter().position(|&c| c == r))
            .unwrap_or(self.nodes[parent.0].children.len());

        for &child in children {
            self.nodes[child.0].parent = Some(parent);
            self.nodes[parent.0].children.insert(index, child);
            index += 1;
        }

        self.record(parent, children.to_vec());
    }

    /// Detach a node from its parent. No-op for detached nodes.
    pub fn remove(&mut self, node: NodeId) {
        self.detach(node);
    }

    /// Replace `old` with `replacements`, in order, at the same position.
    ///
    /// Returns `false` when `old` has no parent.
    pub fn replace_with(&mut self, old: NodeId, replacements: &[NodeId]) -> bool {
        let Some(parent) = self.parent(old) else {
            return false;
        };
        let next = self.next_sibling(old);
        self.detach(old);
        self.insert_all(parent, replacements, next);
        true
    }

    /// Replace the text node `original` with `pieces`, remembering the split
    /// so [`Document::join_split`] can undo exactly it.
    pub fn split_text(&mut self, original: NodeId, pieces: Vec<NodeId>) -> Option<TextSplit> {
        if self.kind(original) != NodeKind::Text || pieces.is_empty() {
            return None;
        }
        self.replace_with(original, &pieces)
            .then_some(TextSplit { original, pieces })
    }

    /// Put a split's original text node back in place of its pieces.
    /// Neighbouring nodes are left alone.
    ///
    /// Returns `false`, changing nothing, unless every piece is still in
    /// place under one parent.
    pub fn join_split(&mut self, split: &TextSplit) -> bool {
        let Some(&first) = split.pieces.first() else {
            return false;
        };
        let Some(parent) = self.parent(first) else {
            return false;
        };
        if split.pieces.iter().any(|&p| self.parent(p) != Some(parent)) {
            return false;
        }
        self.insert_before(parent, split.original, Some(first));
        for &piece in &split.pieces {
            self.detach(piece);
        }
        true
    }

    /// Replace all children with a single text node.
    pub fn set_text_content(&mut self, node: NodeId, text: &str) {
        if self.kind(node) == NodeKind::Text {
            self.set_text(node, text);
            return;
        }
        let children = std::mem::take(&mut self.nodes[node.0].children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
        if !text.is_empty() {
            let text_node = self.create_text(text);
            self.append_child(node, text_node);
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Navigation
    // ─────────────────────────────────────────────────────────────────────

    pub fn kind(&self, node: NodeId) -> NodeKind {
        match self.nodes[node.0].data {
            NodeData::Document => NodeKind::Document,
            NodeData::Element(_) => NodeKind::Element,
            NodeData::Text(_) => NodeKind::Text,
        }
    }

    pub fn is_element(&self, node: NodeId) -> bool {
        self.kind(node) == NodeKind::Element
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    /// Parent, if it is an element.
    pub fn parent_element(&self, node: NodeId) -> Option<NodeId> {
        self.parent(node).filter(|&p| self.is_element(p))
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    pub fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let siblings = self.children(parent);
        let index = siblings.iter().position(|&c| c == node)?;
        siblings.get(index + 1).copied()
    }

    pub fn previous_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let siblings = self.children(parent);
        let index = siblings.iter().position(|&c| c == node)?;
        index.checked_sub(1).map(|i| siblings[i])
    }

    /// Whether `node` is `ancestor` or lies beneath it.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    /// Whether `node` is attached to this document's tree.
    pub fn is_connected(&self, node: NodeId) -> bool {
        self.contains(self.root, node)
    }

    /// `node` followed by its ancestors up to the detached root or document.
    pub fn ancestors_inclusive(&self, node: NodeId) -> Vec<NodeId> {
        let mut path = vec![node];
        let mut current = self.parent(node);
        while let Some(n) = current {
            path.push(n);
            current = self.parent(n);
        }
        path
    }

    /// All nodes beneath `node` in document order, excluding `node`.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(node).iter().rev().copied().collect();
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.children(n).iter().rev().copied());
        }
        out
    }

    /// Text nodes beneath `node`, in document order.
    pub fn text_nodes(&self, node: NodeId) -> Vec<NodeId> {
        self.descendants(node)
            .into_iter()
            .filter(|&n| self.kind(n) == NodeKind::Text)
            .collect()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Content
    // ─────────────────────────────────────────────────────────────────────

    pub fn tag_name(&self, node: NodeId) -> Option<&str> {
        match &self.nodes[node.0].data {
            NodeData::Element(el) => Some(el.tag.as_str()),
            _ => None,
        }
    }

    /// Contents of a text node.
    pub fn text(&self, node: NodeId) -> Option<&str> {
        match &self.nodes[node.0].data {
            NodeData::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Overwrite a text node's contents. No-op for other node kinds.
    pub fn set_text(&mut self, node: NodeId, text: &str) {
        if let NodeData::Text(current) = &mut self.nodes[node.0].data {
            *current = text.to_string();
        }
    }

    /// Concatenated text of `node` and its descendants.
    pub fn text_content(&self, node: NodeId) -> String {
        if let Some(text) = self.text(node) {
            return text.to_string();
        }
        self.text_nodes(node)
            .into_iter()
            .filter_map(|n| self.text(n))
            .collect()
    }

    fn element(&self, node: NodeId) -> Option<&ElementData> {
        match &self.nodes[node.0].data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    fn element_mut(&mut self, node: NodeId) -> Option<&mut ElementData> {
        match &mut self.nodes[node.0].data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node)?
            .attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn attributes(&self, node: NodeId) -> &[(String, String)] {
        self.element(node)
            .map(|el| el.attributes.as_slice())
            .unwrap_or_default()
    }

    pub fn has_attribute(&self, node: NodeId, name: &str) -> bool {
        self.attribute(node, name).is_some()
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(el) = self.element_mut(node) {
            match el.attributes.iter_mut().find(|(k, _)| k == name) {
                Some((_, v)) => *v = value.to_string(),
                None => el.attributes.push((name.to_string(), value.to_string())),
            }
        }
    }

    pub fn remove_attribute(&mut self, node: NodeId, name: &str) {
        if let Some(el) = self.element_mut(node) {
            el.attributes.retain(|(k, _)| k != name);
        }
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attribute(node, "class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    /// A script-visible own property of an element.
    pub fn property(&self, node: NodeId, name: &str) -> Option<&Value> {
        self.element(node)?.properties.get(name)
    }

    pub fn property_names(&self, node: NodeId) -> Vec<&str> {
        self.element(node)
            .map(|el| el.properties.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn set_property(&mut self, node: NodeId, name: &str, value: Value) {
        if let Some(el) = self.element_mut(node) {
            el.properties.insert(name.to_string(), value);
        }
    }

    pub fn media(&self, node: NodeId) -> Option<&MediaState> {
        self.element(node)?.media.as_ref()
    }

    pub fn media_mut(&mut self, node: NodeId) -> Option<&mut MediaState> {
        self.element_mut(node)?.media.as_mut()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────

    /// First attached element with the given `id` attribute.
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|&n| self.attribute(n, "id") == Some(id))
    }

    pub fn matches(&self, node: NodeId, selector: &Selector) -> bool {
        self.is_element(node) && selector.matches(self, node)
    }

    /// Elements beneath `scope` (excluding `scope`) matching `selector`.
    pub fn query_selector_all(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|&n| self.matches(n, selector))
            .collect()
    }

    pub fn query_selector(&self, scope: NodeId, selector: &Selector) -> Option<NodeId> {
        self.descendants(scope)
            .into_iter()
            .find(|&n| self.matches(n, selector))
    }

    /// Nearest inclusive ancestor element matching `selector`.
    pub fn closest(&self, node: NodeId, selector: &Selector) -> Option<NodeId> {
        self.ancestors_inclusive(node)
            .into_iter()
            .find(|&n| self.matches(n, selector))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Mutation observation
    // ─────────────────────────────────────────────────────────────────────

    /// Start recording insertions anywhere in the document.
    pub fn observe(&mut self) {
        self.observing = true;
    }

    pub fn disconnect(&mut self) {
        self.observing = false;
        self.mutations.clear();
    }

    pub fn is_observing(&self) -> bool {
        self.observing
    }

    /// Drain recorded insertion batches, oldest first.
    pub fn take_mutations(&mut self) -> Vec<MutationBatch> {
        std::mem::take(&mut self.mutations)
    }

    pub fn has_pending_mutations(&self) -> bool {
        !self.mutations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_document_layout() {
        let doc = Document::new();
        assert_eq!(doc.tag_name(doc.head()), Some("head"));
        assert_eq!(doc.tag_name(doc.body()), Some("body"));
        assert!(doc.is_connected(doc.body()));
    }

    #[test]
    fn test_replace_with_keeps_position() {
        let mut doc = Document::new();
        let body = doc.body();
        let a = doc.create_text("a");
        let b = doc.create_text("b");
        let c = doc.create_text("c");
        doc.append_child(body, a);
        doc.append_child(body, b);
        doc.append_child(body, c);

        let x = doc.create_text("x");
        let y = doc.create_text("y");
        assert!(doc.replace_with(b, &[x, y]));

        assert_eq!(doc.children(body), &[a, x, y, c]);
        assert_eq!(doc.parent(b), None);
        assert_eq!(doc.text_content(body), "axyc");
    }

    #[test]
    fn test_split_and_join_leave_neighbours_alone() {
        let mut doc = Document::new();
        let body = doc.body();
        let before = doc.create_text("see ");
        let original = doc.create_text("`x` here");
        doc.append_child(body, before);
        doc.append_child(body, original);

        let code = doc.create_element("code");
        doc.set_text_content(code, "x");
        let rest = doc.create_text(" here");
        let split = doc.split_text(original, vec![code, rest]).unwrap();
        assert_eq!(doc.children(body), &[before, code, rest]);

        assert!(doc.join_split(&split));
        assert_eq!(doc.children(body), &[before, original]);
        assert_eq!(doc.text(before), Some("see "));
        assert_eq!(doc.text(original), Some("`x` here"));
    }

    #[test]
    fn test_join_refused_when_pieces_moved() {
        let mut doc = Document::new();
        let body = doc.body();
        let original = doc.create_text("ab");
        doc.append_child(body, original);
        let a = doc.create_text("a");
        let b = doc.create_text("b");
        let split = doc.split_text(original, vec![a, b]).unwrap();

        doc.remove(b);
        assert!(!doc.join_split(&split));
        assert_eq!(doc.children(body), &[a]);
        assert_eq!(doc.parent(original), None);
    }

    #[test]
    fn test_mutations_recorded_only_when_observing_and_connected() {
        let mut doc = Document::new();
        let body = doc.body();
        let early = doc.create_element("div");
        doc.append_child(body, early);
        assert!(doc.take_mutations().is_empty());

        doc.observe();
        let detached = doc.create_element("div");
        let inner = doc.create_element("span");
        doc.append_child(detached, inner);
        assert!(doc.take_mutations().is_empty());

        doc.append_child(body, detached);
        assert_eq!(
            doc.take_mutations(),
            vec![MutationBatch {
                target: body,
                added: vec![detached]
            }]
        );
    }

    #[test]
    fn test_clone_node_skips_properties() {
        let mut doc = Document::new();
        let div = doc.create_element("div");
        doc.set_attribute(div, "id", "menu");
        doc.set_property(div, "__reactProps$x", serde_json::json!({"a": 1}));
        let child = doc.create_text("label");
        doc.append_child(div, child);

        let copy = doc.clone_node(div, true);
        assert_eq!(doc.attribute(copy, "id"), Some("menu"));
        assert!(doc.property_names(copy).is_empty());
        assert_eq!(doc.text_content(copy), "label");
        assert_eq!(doc.parent(copy), None);
    }

    #[test]
    fn test_media_state_only_on_media_elements() {
        let mut doc = Document::new();
        let video = doc.create_element("VIDEO");
        let div = doc.create_element("div");
        assert!(doc.media(video).is_some());
        assert!(doc.media(div).is_none());
    }
}
