//! Resource and error-object capability sets consumed by the renderer.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Shared handle to a renderable resource.
pub type ResourceRef = Arc<dyn Resource>;

/// Related resources keyed by relationship name. A `None` slot is a to-one
/// relationship without a target.
pub type Related = HashMap<String, Vec<Option<ResourceRef>>>;

/// Set of attribute or relationship names.
pub type FieldSet = BTreeSet<String>;

/// Sparse fieldsets: resource type -> allowed field names.
pub type Fields = HashMap<String, FieldSet>;

/// Names one logical resource: `(type, id)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identity {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

impl Identity {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Parse a `type:id` reference as used on the command line.
    pub fn parse(reference: &str) -> Option<Self> {
        let (kind, id) = reference.split_once(':')?;
        let (kind, id) = (kind.trim(), id.trim());
        if kind.is_empty() || id.is_empty() {
            return None;
        }
        Some(Self::new(kind, id))
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// A domain object that can be placed in a document.
///
/// Implementations must be side-effect free: the renderer may call any of
/// these methods in any order and expects stable answers within one render.
pub trait Resource: Send + Sync {
    /// Stable `(type, id)` of this resource.
    fn identity(&self) -> Identity;

    /// Resolve the relationships named in `keys`.
    ///
    /// Keys the resource does not recognise are left out of the result.
    fn related_resources(&self, keys: &FieldSet) -> Result<Related>;

    /// Serialize the resource object.
    ///
    /// Attributes are restricted to `fields` when given; relationship linkage
    /// (`data`) is emitted only for relationships named in `include`.
    fn serialize(&self, include: &FieldSet, fields: Option<&FieldSet>) -> Result<Value>;

    /// Key identifying the output of [`Resource::serialize`] for these
    /// parameters. `None` bypasses the fragment cache.
    fn cache_key(&self, include: &FieldSet, fields: Option<&FieldSet>) -> Result<Option<String>> {
        let _ = (include, fields);
        Ok(None)
    }
}

/// An entry of the top-level `errors` member.
pub trait ErrorObject: Send + Sync {
    fn as_jsonapi(&self) -> Result<Value>;
}

impl ErrorObject for Value {
    fn as_jsonapi(&self) -> Result<Value> {
        Ok(self.clone())
    }
}

/// A typed JSON:API error object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl ApiError {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl ErrorObject for ApiError {
    fn as_jsonapi(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Collect names into a [`FieldSet`].
pub fn field_set<I, S>(names: I) -> FieldSet
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    names.into_iter().map(Into::into).collect()
}
