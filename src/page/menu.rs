//! Adding items to the site's own menus.
//!
//! The site's menus have no public extension point. New items are made by
//! deep-cloning an existing item so they inherit its styling, then swapping
//! the label and icon.

use crate::dom::{events, Document, Dom, Event, ListenerHandle, ListenerOptions, NodeId, Selector};

use super::selectors;

/// An item to add to a menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuItem<'a> {
    /// Element id; also guards against adding the item twice.
    pub identifier: &'a str,
    pub label: &'a str,
    /// SVG path data for the icon, if the item should change it.
    pub icon_path: Option<&'a str>,
}

/// A menu and an existing item to model new items on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InjectionPoint {
    container: NodeId,
    exemplar: NodeId,
}

impl InjectionPoint {
    /// Find the first `item` inside `menu`. Items get appended next to it.
    pub fn locate(doc: &Document, menu: NodeId, item: &Selector) -> Option<Self> {
        let exemplar = doc.query_selector(menu, item)?;
        let container = doc.parent_element(exemplar)?;
        Some(Self {
            container,
            exemplar,
        })
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    /// Whether an item with this identifier is already in the menu.
    pub fn has_item(&self, doc: &Document, identifier: &str) -> bool {
        doc.descendants(self.container)
            .into_iter()
            .any(|n| doc.attribute(n, "id") == Some(identifier))
    }

    /// Clone the exemplar into a new item and wire `on_click` to it.
    ///
    /// Returns `None` if the item is already present.
    pub fn inject(
        &self,
        dom: &Dom,
        item: &MenuItem<'_>,
        on_click: impl Fn(&Dom, &mut Event) + 'static,
    ) -> Option<(NodeId, ListenerHandle)> {
        let node = dom.with_mut(|doc| {
            if self.has_item(doc, item.identifier) {
                return None;
            }
            let node = doc.clone_node(self.exemplar, true);
            doc.set_attribute(node, "id", item.identifier);
            if let Some(label) = doc.query_selector(node, &selectors::MENU_LABEL) {
                doc.set_text_content(label, item.label);
            }
            if let (Some(d), Some(path)) =
                (item.icon_path, doc.query_selector(node, &selectors::MENU_ICON_PATH))
            {
                doc.set_attribute(path, "d", d);
            }
            doc.append_child(self.container, node);
            Some(node)
        })?;

        tracing::debug!(item = item.identifier, "Injected menu item");
        let handle = dom.add_event_listener(node, events::CLICK, ListenerOptions::default(), on_click);
        Some((node, handle))
    }
}
