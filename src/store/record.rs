//! Serialized shape of fixture resources.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::resource::Identity;

/// Top-level fixture document: `{ "resources": [...] }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreDocument {
    #[serde(default)]
    pub resources: Vec<ResourceRecord>,
}

/// One resource as written in a fixture file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    /// Content version; records with a version are fragment-cacheable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub relationships: BTreeMap<String, RelationshipRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl ResourceRecord {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
            version: None,
            attributes: Map::new(),
            relationships: BTreeMap::new(),
            links: None,
            meta: None,
        }
    }

    pub fn identity(&self) -> Identity {
        Identity::new(self.kind.clone(), self.id.clone())
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn with_relationship(mut self, name: impl Into<String>, relationship: RelationshipRecord) -> Self {
        self.relationships.insert(name.into(), relationship);
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

/// A relationship member. `data` distinguishes "absent" (`None`) from an
/// explicit `null` to-one linkage (`Some(Linkage::One(None))`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationshipRecord {
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub data: Option<Linkage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl RelationshipRecord {
    pub fn to_one(target: Option<Identity>) -> Self {
        Self {
            data: Some(Linkage::One(target)),
            ..Self::default()
        }
    }

    pub fn to_many(targets: Vec<Identity>) -> Self {
        Self {
            data: Some(Linkage::Many(targets)),
            ..Self::default()
        }
    }
}

/// Resource linkage of a relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Linkage {
    Many(Vec<Identity>),
    One(Option<Identity>),
}

impl Linkage {
    /// Targets in order; a `null` to-one yields a single `None`.
    pub fn targets(&self) -> Vec<Option<&Identity>> {
        match self {
            Linkage::Many(ids) => ids.iter().map(Some).collect(),
            Linkage::One(target) => vec![target.as_ref()],
        }
    }
}

fn deserialize_present<'de, D>(deserializer: D) -> std::result::Result<Option<Linkage>, D::Error>
where
    D: Deserializer<'de>,
{
    Linkage::deserialize(deserializer).map(Some)
}
