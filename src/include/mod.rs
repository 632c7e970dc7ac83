//! Include specification as a tree of relationship paths.
//!
//! Each node lists the relationships to side-load at that depth; the child
//! node for a key describes what to include from the resources reached
//! through it.

mod parser;

use crate::error::Result;
use crate::resource::FieldSet;
use serde_json::Value;

static EMPTY: IncludeTree = IncludeTree {
    children: Vec::new(),
};

/// Tree of relationship keys, ordered by first insertion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncludeTree {
    children: Vec<(String, IncludeTree)>,
}

impl IncludeTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `"posts.author,comments"` style paths.
    pub fn parse(spec: &str) -> Self {
        parser::parse_paths(spec)
    }

    /// Build from a JSON value: a path string, an array of specifications,
    /// or a nested object.
    pub fn from_value(value: &Value) -> Result<Self> {
        parser::parse_value(value)
    }

    /// Add `key` with the given subtree, merging into an existing entry.
    pub fn with(mut self, key: impl Into<String>, child: IncludeTree) -> Self {
        self.insert(key.into(), child);
        self
    }

    /// Relationship keys at this node.
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.children.iter().map(|(key, _)| key.as_str())
    }

    /// Relationship keys at this node as a set.
    pub fn key_set(&self) -> FieldSet {
        self.keys().map(str::to_string).collect()
    }

    /// Subtree for `key`; an empty tree when `key` is not included.
    pub fn child(&self, key: &str) -> &IncludeTree {
        self.children
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, child)| child)
            .unwrap_or(&EMPTY)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.children.iter().any(|(k, _)| k == key)
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Union `other` into this tree.
    pub fn merge(&mut self, other: IncludeTree) {
        for (key, child) in other.children {
            self.insert(key, child);
        }
    }

    fn insert(&mut self, key: String, child: IncludeTree) {
        match self.children.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => existing.merge(child),
            None => self.children.push((key, child)),
        }
    }

    /// Dotted paths of every leaf, e.g. `["posts.author", "comments"]`.
    pub fn paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        for (key, child) in &self.children {
            if child.is_empty() {
                out.push(key.clone());
            } else {
                out.extend(child.paths().into_iter().map(|p| format!("{}.{}", key, p)));
            }
        }
        out
    }
}

impl From<&str> for IncludeTree {
    fn from(spec: &str) -> Self {
        Self::parse(spec)
    }
}
