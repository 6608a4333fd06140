//! A small CSS selector engine.
//!
//! Supports what the site integration needs: type, `#id`, `.class` and
//! attribute conditions (`[a]`, `[a='v']`, `[a^='v']`, `[a*='v']`,
//! `[a$='v']`) combined with descendant and `>` child combinators, plus
//! comma-separated lists.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::document::{Document, NodeId};

/// Selector parse failure.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid selector '{selector}': {message}")]
pub struct SelectorError {
    pub selector: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals,
    Prefix,
    Substring,
    Suffix,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrCondition {
    name: String,
    op: AttrOp,
    value: String,
}

impl AttrCondition {
    fn matches(&self, actual: Option<&str>) -> bool {
        let Some(actual) = actual else {
            return false;
        };
        match self.op {
            AttrOp::Exists => true,
            AttrOp::Equals => actual == self.value,
            AttrOp::Prefix => !self.value.is_empty() && actual.starts_with(&self.value),
            AttrOp::Substring => !self.value.is_empty() && actual.contains(&self.value),
            AttrOp::Suffix => !self.value.is_empty() && actual.ends_with(&self.value),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<AttrCondition>,
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.id.is_none() && self.classes.is_empty() && self.attributes.is_empty()
    }

    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let Some(tag) = doc.tag_name(node) else {
            return false;
        };
        if let Some(expected) = &self.tag {
            if expected != "*" && expected != tag {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if doc.attribute(node, "id") != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|c| doc.has_class(node, c)) {
            return false;
        }
        self.attributes
            .iter()
            .all(|cond| cond.matches(doc.attribute(node, &cond.name)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    /// Left to right; `combinators[i]` joins `compounds[i]` and `compounds[i + 1]`.
    compounds: Vec<Compound>,
    combinators: Vec<Combinator>,
}

impl Complex {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.matches_at(doc, node, self.compounds.len() - 1)
    }

    fn matches_at(&self, doc: &Document, node: NodeId, index: usize) -> bool {
        if !self.compounds[index].matches(doc, node) {
            return false;
        }
        if index == 0 {
            return true;
        }
        match self.combinators[index - 1] {
            Combinator::Child => doc
                .parent_element(node)
                .is_some_and(|parent| self.matches_at(doc, parent, index - 1)),
            Combinator::Descendant => {
                let mut current = doc.parent_element(node);
                while let Some(ancestor) = current {
                    if self.matches_at(doc, ancestor, index - 1) {
                        return true;
                    }
                    current = doc.parent_element(ancestor);
                }
                false
            }
        }
    }
}

/// A parsed selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    alternatives: Vec<Complex>,
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        Parser::new(source).parse()
    }

    /// Whether `node` matches any alternative in the list.
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.alternatives.iter().any(|alt| alt.matches(doc, node))
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> SelectorError {
        SelectorError {
            selector: self.source.to_string(),
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn parse(mut self) -> Result<Selector, SelectorError> {
        let mut alternatives = Vec::new();
        loop {
            alternatives.push(self.parse_complex()?);
            match self.peek() {
                Some(',') => self.pos += 1,
                None => break,
                Some(c) => return Err(self.error(format!("unexpected '{c}'"))),
            }
        }
        Ok(Selector {
            source: self.source.to_string(),
            alternatives,
        })
    }

    fn parse_complex(&mut self) -> Result<Complex, SelectorError> {
        self.skip_whitespace();
        let mut compounds = vec![self.parse_compound()?];
        let mut combinators = Vec::new();

        loop {
            let had_space = self.skip_whitespace();
            match self.peek() {
                None | Some(',') => break,
                Some('>') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    combinators.push(Combinator::Child);
                }
                Some(_) if had_space => combinators.push(Combinator::Descendant),
                Some(c) => return Err(self.error(format!("unexpected '{c}'"))),
            }
            compounds.push(self.parse_compound()?);
        }

        Ok(Complex {
            compounds,
            combinators,
        })
    }

    fn parse_compound(&mut self) -> Result<Compound, SelectorError> {
        let mut compound = Compound::default();

        if self.peek() == Some('*') {
            self.pos += 1;
            compound.tag = Some("*".to_string());
        } else if self.peek().is_some_and(is_ident_char) {
            compound.tag = Some(self.parse_ident()?.to_ascii_lowercase());
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    compound.id = Some(self.parse_ident()?);
                }
                Some('.') => {
                    self.pos += 1;
                    compound.classes.push(self.parse_ident()?);
                }
                Some('[') => {
                    self.pos += 1;
                    compound.attributes.push(self.parse_attribute()?);
                }
                Some(':') => return Err(self.error("pseudo-classes are not supported")),
                _ => break,
            }
        }

        if compound.is_empty() {
            return Err(self.error("expected a simple selector"));
        }
        Ok(compound)
    }

    fn parse_ident(&mut self) -> Result<String, SelectorError> {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error("expected an identifier"));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn parse_attribute(&mut self) -> Result<AttrCondition, SelectorError> {
        self.skip_whitespace();
        let name = self.parse_ident()?;
        self.skip_whitespace();

        let op = match self.peek() {
            Some(']') => {
                self.pos += 1;
                return Ok(AttrCondition {
                    name,
                    op: AttrOp::Exists,
                    value: String::new(),
                });
            }
            Some('=') => AttrOp::Equals,
            Some('^') => AttrOp::Prefix,
            Some('*') => AttrOp::Substring,
            Some('$') => AttrOp::Suffix,
            _ => return Err(self.error("expected an attribute operator")),
        };
        self.pos += 1;
        if op != AttrOp::Equals {
            if self.peek() != Some('=') {
                return Err(self.error("expected '='"));
            }
            self.pos += 1;
        }
        self.skip_whitespace();

        let value = match self.peek() {
            Some(quote @ ('\'' | '"')) => {
                self.pos += 1;
                let start = self.pos;
                while self.peek().is_some_and(|c| c != quote) {
                    self.pos += 1;
                }
                if self.peek().is_none() {
                    return Err(self.error("unterminated string"));
                }
                let value: String = self.chars[start..self.pos].iter().collect();
                self.pos += 1;
                value
            }
            _ => self.parse_ident()?,
        };

        self.skip_whitespace();
        if self.peek() != Some(']') {
            return Err(self.error("expected ']'"));
        }
        self.pos += 1;

        Ok(AttrCondition { name, op, value })
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}
