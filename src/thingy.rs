//! Hierarchical configuration tree.
//!
//! A [`Thingy`] is a named node with ordered children. Leaves carry values, so
//! `NAME "personal"` becomes a node `NAME` holding a single leaf `personal`, and
//! the string form of the `NAME` node is `personal`. Data source definitions,
//! search strategies and column transformations are all read from such trees.
//!
//! Lookups come in two flavours that fail differently:
//! * [`Thingy::get`], [`Thingy::first_child`] and [`Thingy::last_child`] fail with
//!   [`WolldbError::NodeNotFound`], a structural signal.
//! * [`Thingy::require`] fails with [`WolldbError::Config`] carrying a message meant
//!   for whoever maintains the configuration.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;

use crate::error::{Result, WolldbError};

#[derive(Parser)]
#[grammar = "thingy.pest"]
pub struct ThingyParser;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Thingy {
    name: String,
    children: Vec<Thingy>,
}

impl Thingy {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }
    /// Shorthand for a node holding exactly one leaf, as in `NAME "x"`.
    pub fn keyed(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name).with(Self::new(value))
    }
    pub fn with(mut self, child: Thingy) -> Self {
        self.children.push(child);
        self
    }
    pub fn add(&mut self, child: Thingy) -> &mut Thingy {
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
    pub fn count(&self) -> usize {
        self.children.len()
    }
    pub fn iter(&self) -> std::slice::Iter<'_, Thingy> {
        self.children.iter()
    }
    pub fn first_child(&self) -> Result<&Thingy> {
        self.children
            .first()
            .ok_or_else(|| WolldbError::NodeNotFound(format!("\"{}\" has no children", self.name)))
    }
    pub fn last_child(&self) -> Result<&Thingy> {
        self.children
            .last()
            .ok_or_else(|| WolldbError::NodeNotFound(format!("\"{}\" has no children", self.name)))
    }

    /// Returns the first descendant named `key`, searching breadth first so that
    /// the shallowest match wins.
    pub fn get(&self, key: &str) -> Result<&Thingy> {
        self.descendants()
            .find(|node| node.name == key)
            .ok_or_else(|| WolldbError::NodeNotFound(key.to_string()))
    }

    /// Like [`Thingy::get`], but a missing node is a configuration error with the
    /// given message.
    pub fn require(&self, key: &str, message: impl Into<String>) -> Result<&Thingy> {
        self.get(key).map_err(|_| WolldbError::config(message))
    }

    /// Returns the first direct child named `key`. Definition keys such as
    /// `NAME` or `SOURCE` are read this way so that nested sections never
    /// stand in for them.
    pub fn child(&self, key: &str) -> Result<&Thingy> {
        self.children
            .iter()
            .find(|node| node.name == key)
            .ok_or_else(|| WolldbError::NodeNotFound(key.to_string()))
    }

    /// Like [`Thingy::child`], but a missing node is a configuration error.
    pub fn require_child(&self, key: &str, message: impl Into<String>) -> Result<&Thingy> {
        self.child(key).map_err(|_| WolldbError::config(message))
    }

    /// All descendants named `key` in breadth first order.
    pub fn query(&self, key: &str) -> Vec<&Thingy> {
        self.descendants().filter(|node| node.name == key).collect()
    }

    fn descendants(&self) -> Descendants<'_> {
        Descendants {
            queue: self.children.iter().collect(),
        }
    }

    /// Parses the textual configuration syntax into an anonymous root node.
    pub fn parse(text: &str) -> Result<Thingy> {
        let mut pairs = ThingyParser::parse(Rule::file, text)?;
        let mut root = Thingy::new("");
        if let Some(file) = pairs.next() {
            for pair in file.into_inner() {
                if pair.as_rule() != Rule::EOI {
                    root.children.push(build(pair));
                }
            }
        }
        Ok(root)
    }
}

impl FromStr for Thingy {
    type Err = WolldbError;
    fn from_str(s: &str) -> Result<Self> {
        Thingy::parse(s)
    }
}

impl fmt::Display for Thingy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_leaf() {
            return write!(f, "{}", self.name);
        }
        for child in &self.children {
            write!(f, "{}", child)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Thingy {
    type Item = &'a Thingy;
    type IntoIter = std::slice::Iter<'a, Thingy>;
    fn into_iter(self) -> Self::IntoIter {
        self.children.iter()
    }
}

struct Descendants<'a> {
    queue: VecDeque<&'a Thingy>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Thingy;
    fn next(&mut self) -> Option<&'a Thingy> {
        let node = self.queue.pop_front()?;
        self.queue.extend(node.children.iter());
        Some(node)
    }
}

fn build(pair: Pair<Rule>) -> Thingy {
    match pair.as_rule() {
        Rule::keyed => {
            let mut inner = pair.into_inner();
            let mut node = Thingy::new("");
            if let Some(key) = inner.next() {
                node.name = key.as_str().to_string();
            }
            if let Some(value) = inner.next() {
                match value.as_rule() {
                    Rule::list => node.children = value.into_inner().map(build).collect(),
                    _ => node.children.push(build(value)),
                }
            }
            node
        }
        Rule::list => Thingy {
            name: String::new(),
            children: pair.into_inner().map(build).collect(),
        },
        Rule::dq_string => Thingy::new(unquote(pair, "\"\"", "\"")),
        Rule::sq_string => Thingy::new(unquote(pair, "''", "'")),
        _ => Thingy::new(pair.as_str()),
    }
}

fn unquote(pair: Pair<Rule>, doubled: &str, single: &str) -> String {
    pair.into_inner()
        .next()
        .map(|inner| inner.as_str().replace(doubled, single))
        .unwrap_or_default()
}
