//! Framework-internal props on DOM nodes.
//!
//! The site renders with React, which stores each element's props on the
//! node under a randomized `__reactProps$…` key. Reading them is the only way
//! to get at media variants and post metadata, and also the first thing to
//! break when the site changes, so access goes through
//! [`FrameworkPropsReader`].

use serde_json::Value;

use crate::dom::{Document, NodeId};

/// What to pull out of an element's props.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropsQuery<'a> {
    /// The whole props object.
    Root,
    /// Follow these keys from the root.
    Path(&'a [&'a str]),
    /// Depth-first search for the first truthy value stored under this key.
    Find(&'a str),
}

/// Reads framework props off elements.
pub trait FrameworkPropsReader {
    fn read(&self, doc: &Document, node: NodeId, query: PropsQuery<'_>) -> Option<Value>;
}

/// Reads React's `__reactProps$<random>` own property.
#[derive(Debug, Clone)]
pub struct ReactPropsReader {
    prefix: String,
}

impl Default for ReactPropsReader {
    fn default() -> Self {
        Self {
            prefix: "__reactProps".to_string(),
        }
    }
}

impl ReactPropsReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe a different property prefix.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn props<'d>(&self, doc: &'d Document, node: NodeId) -> Option<&'d Value> {
        let key = doc
            .property_names(node)
            .into_iter()
            .find(|name| name.starts_with(&self.prefix))?;
        doc.property(node, key)
    }
}

impl FrameworkPropsReader for ReactPropsReader {
    fn read(&self, doc: &Document, node: NodeId, query: PropsQuery<'_>) -> Option<Value> {
        let props = self.props(doc, node)?;
        let found = match query {
            PropsQuery::Root => Some(props),
            PropsQuery::Path(path) => value_at_path(props, path),
            PropsQuery::Find(key) => find_property(props, key),
        };
        found.filter(|v| !v.is_null()).cloned()
    }
}

/// Follow `path` through nested objects.
pub fn value_at_path<'v>(value: &'v Value, path: &[&str]) -> Option<&'v Value> {
    path.iter().try_fold(value, |current, key| current.get(*key))
}

/// Depth-first search for `key`, own properties first.
///
/// A direct hit is returned even if falsy; nested hits only count when
/// truthy, so an empty placeholder deeper in the tree does not hide a real
/// value in a later branch.
pub fn find_property<'v>(value: &'v Value, key: &str) -> Option<&'v Value> {
    match value {
        Value::Object(map) => {
            if let Some(hit) = map.get(key) {
                return Some(hit);
            }
            map.values()
                .filter(|v| v.is_object() || v.is_array())
                .find_map(|v| find_property(v, key).filter(|hit| is_truthy(hit)))
        }
        Value::Array(items) => items
            .iter()
            .filter(|v| v.is_object() || v.is_array())
            .find_map(|v| find_property(v, key).filter(|hit| is_truthy(hit))),
        _ => None,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn element_with_props(props: Value) -> (Document, NodeId) {
        let mut doc = Document::new();
        let node = doc.create_element("div");
        doc.set_property(node, "__reactFiber$abc", json!({"ignored": true}));
        doc.set_property(node, "__reactProps$abc", props);
        (doc, node)
    }

    #[test]
    fn test_read_path() {
        let (doc, node) = element_with_props(json!({
            "children": {"props": {"videoType": "video", "tweetId": "9"}}
        }));
        let reader = ReactPropsReader::new();

        let props = reader
            .read(&doc, node, PropsQuery::Path(&["children", "props"]))
            .unwrap();
        assert_eq!(props["tweetId"], json!("9"));
        assert_eq!(reader.read(&doc, node, PropsQuery::Path(&["missing"])), None);
    }

    #[test]
    fn test_find_property_depth_first() {
        let value = json!({
            "a": {"tweet": null},
            "b": [{"x": 1}, {"tweet": {"id_str": "7"}}]
        });
        assert_eq!(find_property(&value, "tweet"), Some(&json!({"id_str": "7"})));
        assert_eq!(find_property(&json!({"tweet": false}), "tweet"), Some(&json!(false)));
        assert_eq!(find_property(&json!({"a": 1}), "tweet"), None);
    }

    #[test]
    fn test_missing_props_and_custom_prefix() {
        let mut doc = Document::new();
        let bare = doc.create_element("div");
        assert_eq!(ReactPropsReader::new().read(&doc, bare, PropsQuery::Root), None);

        doc.set_property(bare, "__vueProps", json!({"k": 1}));
        let reader = ReactPropsReader::with_prefix("__vue");
        assert_eq!(reader.read(&doc, bare, PropsQuery::Find("k")), Some(json!(1)));
    }
}
