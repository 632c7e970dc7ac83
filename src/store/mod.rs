//! In-memory resource store backed by fixture records.
//!
//! Loads resources from JSON or YAML documents and exposes each record as a
//! [`Resource`] whose relationships resolve against the same store. Used by
//! the CLI and as a ready-made resource implementation for callers that hold
//! their data as plain records.

mod record;

pub use record::{Linkage, RelationshipRecord, ResourceRecord, StoreDocument};

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::error::{RenderError, Result};
use crate::render::Data;
use crate::resource::{FieldSet, Identity, Related, Resource, ResourceRef};

type RecordMap = HashMap<Identity, Arc<ResourceRecord>>;

/// Records keyed by identity, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct ResourceStore {
    records: Arc<RecordMap>,
    order: Vec<Identity>,
}

impl ResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store and check that identities are unique and every linkage
    /// target exists.
    pub fn from_records(records: Vec<ResourceRecord>) -> Result<Self> {
        let mut store = Self::new();
        for record in records {
            let identity = record.identity();
            if store.contains(&identity) {
                return Err(RenderError::InvalidData(format!(
                    "duplicate resource {}",
                    identity
                )));
            }
            store.insert(record);
        }
        store.validate()?;
        log::debug!("Resource store loaded: {} records", store.len());
        Ok(store)
    }

    pub fn from_json_str(input: &str) -> Result<Self> {
        let doc: StoreDocument = serde_json::from_str(input)?;
        Self::from_records(doc.resources)
    }

    pub fn from_yaml_str(input: &str) -> Result<Self> {
        let doc: StoreDocument = serde_yaml_ng::from_str(input)?;
        Self::from_records(doc.resources)
    }

    /// Load a fixture file; `.yaml`/`.yml` files are read as YAML, anything
    /// else as JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content),
            _ => Self::from_json_str(&content),
        }
    }

    /// Insert or replace a record without validation.
    ///
    /// Resources handed out earlier keep resolving against the records that
    /// existed when they were created.
    pub fn insert(&mut self, record: ResourceRecord) {
        let identity = record.identity();
        if !self.records.contains_key(&identity) {
            self.order.push(identity.clone());
        }
        Arc::make_mut(&mut self.records).insert(identity, Arc::new(record));
    }

    /// Check that every relationship target is present.
    pub fn validate(&self) -> Result<()> {
        for identity in &self.order {
            let Some(record) = self.records.get(identity) else {
                continue;
            };
            for (name, rel) in &record.relationships {
                let Some(data) = &rel.data else {
                    continue;
                };
                for target in data.targets().into_iter().flatten() {
                    if !self.records.contains_key(target) {
                        return Err(RenderError::InvalidData(format!(
                            "{} relationship '{}' references unknown resource {}",
                            identity, name, target
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, identity: &Identity) -> bool {
        self.records.contains_key(identity)
    }

    pub fn record(&self, identity: &Identity) -> Option<&ResourceRecord> {
        self.records.get(identity).map(|r| r.as_ref())
    }

    /// The record as a renderable resource.
    pub fn resource(&self, identity: &Identity) -> Option<ResourceRef> {
        let record = self.records.get(identity)?;
        Some(Arc::new(StoredResource {
            record: record.clone(),
            records: self.records.clone(),
        }))
    }

    /// Like [`ResourceStore::resource`] but unknown identities are an error.
    pub fn require(&self, identity: &Identity) -> Result<ResourceRef> {
        self.resource(identity)
            .ok_or_else(|| RenderError::InvalidData(format!("unknown resource {}", identity)))
    }

    /// Every resource in insertion order.
    pub fn resources(&self) -> Vec<ResourceRef> {
        self.order.iter().filter_map(|id| self.resource(id)).collect()
    }

    /// Turn a JSON selector into primary data: `null`, one
    /// `{"type", "id"}` identifier, or an array of identifiers.
    pub fn select(&self, selector: &Value) -> Result<Data> {
        match selector {
            Value::Null => Ok(Data::Null),
            Value::Array(items) => {
                let roots = items
                    .iter()
                    .map(|item| self.require(&selector_identity(item)?))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Data::Collection(roots))
            }
            Value::Object(_) => Ok(Data::Single(self.require(&selector_identity(selector)?)?)),
            other => Err(RenderError::InvalidData(format!(
                "primary data must be null, a resource identifier or an array of identifiers, got {}",
                other
            ))),
        }
    }
}

fn selector_identity(value: &Value) -> Result<Identity> {
    serde_json::from_value(value.clone()).map_err(|e| {
        RenderError::InvalidData(format!("invalid resource identifier {}: {}", value, e))
    })
}

/// A store record viewed as a [`Resource`].
pub struct StoredResource {
    record: Arc<ResourceRecord>,
    records: Arc<RecordMap>,
}

impl StoredResource {
    fn lookup(&self, target: &Identity) -> Result<ResourceRef> {
        let record = self.records.get(target).ok_or_else(|| {
            RenderError::Resource(format!(
                "{} references unknown resource {}",
                self.record.identity(),
                target
            ))
        })?;
        Ok(Arc::new(StoredResource {
            record: record.clone(),
            records: self.records.clone(),
        }))
    }

    fn field_allowed(fields: Option<&FieldSet>, name: &str) -> bool {
        fields.map_or(true, |f| f.contains(name))
    }
}

impl Resource for StoredResource {
    fn identity(&self) -> Identity {
        self.record.identity()
    }

    fn related_resources(&self, keys: &FieldSet) -> Result<Related> {
        let mut related = Related::new();
        for key in keys {
            let Some(data) = self.record.relationships.get(key).and_then(|r| r.data.as_ref()) else {
                continue;
            };
            let resolved = data
                .targets()
                .into_iter()
                .map(|target| target.map(|t| self.lookup(t)).transpose())
                .collect::<Result<Vec<_>>>()?;
            related.insert(key.clone(), resolved);
        }
        Ok(related)
    }

    fn serialize(&self, include: &FieldSet, fields: Option<&FieldSet>) -> Result<Value> {
        let record = &self.record;
        let mut out = Map::new();
        out.insert("type".to_string(), Value::String(record.kind.clone()));
        out.insert("id".to_string(), Value::String(record.id.clone()));

        let attributes: Map<String, Value> = record
            .attributes
            .iter()
            .filter(|(name, _)| Self::field_allowed(fields, name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        out.insert("attributes".to_string(), Value::Object(attributes));

        let mut relationships = Map::new();
        for (name, rel) in &record.relationships {
            if !Self::field_allowed(fields, name) {
                continue;
            }
            let mut member = Map::new();
            if include.contains(name) {
                if let Some(data) = &rel.data {
                    member.insert("data".to_string(), serde_json::to_value(data)?);
                }
            }
            if let Some(links) = &rel.links {
                member.insert("links".to_string(), links.clone());
            }
            if let Some(meta) = &rel.meta {
                member.insert("meta".to_string(), meta.clone());
            }
            if !member.is_empty() {
                relationships.insert(name.clone(), Value::Object(member));
            }
        }
        if !relationships.is_empty() {
            out.insert("relationships".to_string(), Value::Object(relationships));
        }

        if let Some(links) = &record.links {
            out.insert("links".to_string(), links.clone());
        }
        if let Some(meta) = &record.meta {
            out.insert("meta".to_string(), meta.clone());
        }
        Ok(Value::Object(out))
    }

    fn cache_key(&self, include: &FieldSet, fields: Option<&FieldSet>) -> Result<Option<String>> {
        let Some(version) = &self.record.version else {
            return Ok(None);
        };
        let mut hasher = Sha256::new();
        hasher.update(b"include:");
        hasher.update(join(include).as_bytes());
        match fields {
            Some(fields) => {
                hasher.update(b";fields:");
                hasher.update(join(fields).as_bytes());
            }
            None => hasher.update(b";fields:*"),
        }
        Ok(Some(format!(
            "{}/{}-{}/{:x}",
            self.record.kind,
            self.record.id,
            version,
            hasher.finalize()
        )))
    }
}

fn join(set: &FieldSet) -> String {
    set.iter().map(String::as_str).collect::<Vec<_>>().join(",")
}
