//! Conversion of caller include input (path strings, arrays, nested objects)
//! into an [`IncludeTree`].

use serde_json::Value;

use super::IncludeTree;
use crate::error::{RenderError, Result};

/// Parse comma-separated dotted paths. Blank segments are ignored.
pub(super) fn parse_paths(spec: &str) -> IncludeTree {
    let mut tree = IncludeTree::new();
    for path in spec.split(',') {
        let segments: Vec<&str> = path
            .split('.')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if let Some(branch) = build_branch(&segments) {
            tree.merge(branch);
        }
    }
    tree
}

fn build_branch(segments: &[&str]) -> Option<IncludeTree> {
    let (last, parents) = segments.split_last()?;
    let mut node = IncludeTree::new().with(*last, IncludeTree::new());
    for segment in parents.iter().rev() {
        node = IncludeTree::new().with(*segment, node);
    }
    Some(node)
}

pub(super) fn parse_value(value: &Value) -> Result<IncludeTree> {
    match value {
        Value::Null => Ok(IncludeTree::new()),
        Value::String(spec) => Ok(parse_paths(spec)),
        Value::Array(items) => {
            let mut tree = IncludeTree::new();
            for item in items {
                tree.merge(parse_value(item)?);
            }
            Ok(tree)
        }
        Value::Object(map) => {
            let mut tree = IncludeTree::new();
            for (key, nested) in map {
                let key = key.trim();
                if key.is_empty() {
                    continue;
                }
                let child = match nested {
                    Value::Bool(true) => IncludeTree::new(),
                    other => parse_value(other)?,
                };
                tree = tree.with(key, child);
            }
            Ok(tree)
        }
        other => Err(RenderError::InvalidInclude(format!(
            "expected a string, array or object, got {}",
            other
        ))),
    }
}
