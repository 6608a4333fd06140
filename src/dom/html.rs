//! Minimal HTML fragment parsing and serialization.
//!
//! Enough to build page fixtures and compare snapshots: elements with quoted
//! or bare attributes, text, comments (dropped), void elements and the five
//! basic character references.

use thiserror::Error;

use super::document::{Document, NodeId, NodeKind};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HtmlError {
    #[error("Unterminated tag at byte {0}")]
    UnterminatedTag(usize),

    #[error("Unterminated attribute value at byte {0}")]
    UnterminatedAttribute(usize),

    #[error("Unexpected closing tag </{0}>")]
    UnexpectedClose(String),
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr",
];

fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attribute(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}

impl Document {
    /// Parse `html` and append the top-level nodes to `parent` in one batch.
    pub fn append_html(&mut self, parent: NodeId, html: &str) -> Result<Vec<NodeId>, HtmlError> {
        let holder = self.create_element("template");
        let mut stack = vec![holder];
        let bytes = html.as_bytes();
        let mut pos = 0;

        while pos < bytes.len() {
            if html[pos..].starts_with("<!--") {
                pos = html[pos..]
                    .find("-->")
                    .map(|end| pos + end + 3)
                    .ok_or(HtmlError::UnterminatedTag(pos))?;
            } else if html[pos..].starts_with("</") {
                let end = html[pos..]
                    .find('>')
                    .map(|e| pos + e)
                    .ok_or(HtmlError::UnterminatedTag(pos))?;
                let name = html[pos + 2..end].trim().to_ascii_lowercase();
                let open = stack
                    .iter()
                    .rposition(|&n| n != holder && self.tag_name(n) == Some(name.as_str()))
                    .ok_or_else(|| HtmlError::UnexpectedClose(name.clone()))?;
                stack.truncate(open);
                pos = end + 1;
            } else if bytes[pos] == b'<' {
                pos = self.parse_open_tag(html, pos, &mut stack)?;
            } else {
                let end = html[pos..].find('<').map_or(html.len(), |e| pos + e);
                let text = self.create_text(&decode_entities(&html[pos..end]));
                let current = *stack.last().unwrap_or(&holder);
                self.append_child(current, text);
                pos = end;
            }
        }

        let nodes = self.children(holder).to_vec();
        for &node in &nodes {
            self.remove(node);
        }
        // One batch for the whole fragment, like appending a DocumentFragment.
        self.insert_all(parent, &nodes, None);
        Ok(nodes)
    }

    fn parse_open_tag(
        &mut self,
        html: &str,
        start: usize,
        stack: &mut Vec<NodeId>,
    ) -> Result<usize, HtmlError> {
        let bytes = html.as_bytes();
        let mut pos = start + 1;
        let name_end = html[pos..]
            .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
            .map(|e| pos + e)
            .ok_or(HtmlError::UnterminatedTag(start))?;
        let tag = html[pos..name_end].to_ascii_lowercase();
        let element = self.create_element(&tag);
        pos = name_end;

        let mut self_closing = false;
        loop {
            while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            match bytes.get(pos) {
                None => return Err(HtmlError::UnterminatedTag(start)),
                Some(b'>') => {
                    pos += 1;
                    break;
                }
                Some(b'/') => {
                    self_closing = true;
                    pos += 1;
                }
                Some(_) => {
                    let name_end = html[pos..]
                        .find(|c: char| c.is_whitespace() || c == '=' || c == '>' || c == '/')
                        .map(|e| pos + e)
                        .ok_or(HtmlError::UnterminatedTag(start))?;
                    let name = html[pos..name_end].to_ascii_lowercase();
                    pos = name_end;

                    let mut value = String::new();
                    if bytes.get(pos) == Some(&b'=') {
                        pos += 1;
                        match bytes.get(pos) {
                            Some(&quote @ (b'"' | b'\'')) => {
                                let close = html[pos + 1..]
                                    .find(quote as char)
                                    .map(|e| pos + 1 + e)
                                    .ok_or(HtmlError::UnterminatedAttribute(pos))?;
                                value = decode_entities(&html[pos + 1..close]);
                                pos = close + 1;
                            }
                            _ => {
                                let end = html[pos..]
                                    .find(|c: char| c.is_whitespace() || c == '>')
                                    .map(|e| pos + e)
                                    .ok_or(HtmlError::UnterminatedTag(start))?;
                                value = decode_entities(&html[pos..end]);
                                pos = end;
                            }
                        }
                    }
                    self.set_attribute(element, &name, &value);
                }
            }
        }

        if let Some(&current) = stack.last() {
            self.append_child(current, element);
        }
        if !self_closing && !is_void(&tag) {
            stack.push(element);
        }
        Ok(pos)
    }

    /// Serialize `node` and its subtree.
    pub fn to_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    fn write_html(&self, node: NodeId, out: &mut String) {
        match self.kind(node) {
            NodeKind::Text => out.push_str(&escape_text(self.text(node).unwrap_or_default())),
            NodeKind::Document => {
                for &child in self.children(node) {
                    self.write_html(child, out);
                }
            }
            NodeKind::Element => {
                let tag = self.tag_name(node).unwrap_or_default();
                out.push('<');
                out.push_str(tag);
                for (name, value) in self.attributes(node) {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape_attribute(value));
                    out.push('"');
                }
                out.push('>');
                if is_void(tag) {
                    return;
                }
                for &child in self.children(node) {
                    self.write_html(child, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
}
