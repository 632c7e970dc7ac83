//! Resources shared by unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{json, Value};

use crate::error::{RenderError, Result};
use crate::resource::{FieldSet, Identity, Related, Resource, ResourceRef};
use crate::store::{RelationshipRecord, ResourceRecord, ResourceStore};

/// Relationship name with its targets; a lone `None` is an empty to-one.
pub type Edges<'a> = &'a [(&'a str, &'a [Option<(&'a str, &'a str)>])];

/// Small graph builder on top of [`ResourceStore`].
pub struct Graph {
    store: ResourceStore,
}

impl Graph {
    pub fn new() -> Self {
        Self {
            store: ResourceStore::new(),
        }
    }

    pub fn add(&mut self, kind: &str, id: &str, edges: Edges<'_>) {
        let mut record = ResourceRecord::new(kind, id);
        for (name, targets) in edges {
            let rel = if let [None] = targets {
                RelationshipRecord::to_one(None)
            } else {
                RelationshipRecord::to_many(
                    targets
                        .iter()
                        .flatten()
                        .map(|(k, i)| Identity::new(*k, *i))
                        .collect(),
                )
            };
            record = record.with_relationship(*name, rel);
        }
        self.store.insert(record);
    }

    pub fn get(&self, kind: &str, id: &str) -> ResourceRef {
        self.store
            .resource(&Identity::new(kind, id))
            .unwrap_or_else(|| panic!("no resource {}:{}", kind, id))
    }

    pub fn user(&self, n: u32) -> ResourceRef {
        self.get("users", &n.to_string())
    }

    /// Four users and three posts; users 1 and 2 wrote posts 2 and 1, 3.
    pub fn blog() -> Self {
        let mut store = ResourceStore::new();
        let users = [
            (1, "123 Example st.", vec![2]),
            (2, "234 Example st.", vec![1, 3]),
            (3, "345 Example st.", vec![]),
            (4, "456 Example st.", vec![]),
        ];
        for (n, address, posts) in users {
            let mut posts_rel = RelationshipRecord::to_many(
                posts
                    .iter()
                    .map(|p: &u32| Identity::new("posts", p.to_string()))
                    .collect(),
            );
            posts_rel.links = Some(json!({
                "self": format!("http://api.example.com/users/{}/relationships/posts", n),
                "related": {
                    "href": format!("http://api.example.com/users/{}/posts", n),
                    "meta": { "do_not_use": true }
                }
            }));
            posts_rel.meta = Some(json!({ "deleted_posts": 5 }));

            let mut record = ResourceRecord::new("users", n.to_string())
                .with_attribute("name", Value::String(format!("User {}", n)))
                .with_attribute("address", Value::String(address.to_string()))
                .with_relationship("posts", posts_rel);
            record.links = Some(json!({ "self": format!("http://api.example.com/users/{}", n) }));
            record.meta = Some(json!({ "user_meta": "is_meta" }));
            store.insert(record);
        }

        let posts = [(1, "Post 1", "yesterday", 2), (2, "Post 2", "today", 1), (3, "Post 3", "tomorrow", 2)];
        for (n, title, date, author) in posts {
            let mut author_rel =
                RelationshipRecord::to_one(Some(Identity::new("users", author.to_string())));
            author_rel.links = Some(json!({
                "self": format!("http://api.example.com/posts/{}/relationships/author", n),
                "related": format!("http://api.example.com/posts/{}/author", n)
            }));
            author_rel.meta = Some(json!({ "author_active": true }));

            store.insert(
                ResourceRecord::new("posts", n.to_string())
                    .with_attribute("title", json!(title))
                    .with_attribute("date", json!(date))
                    .with_relationship("author", author_rel),
            );
        }

        Self { store }
    }
}

/// Leaf resource that counts how often it is serialized.
pub struct CountingResource {
    identity: Identity,
    cache_key: Option<String>,
    failing: bool,
    serialize_calls: AtomicUsize,
}

impl CountingResource {
    pub fn new(kind: &str, id: &str, cache_key: Option<&str>) -> Self {
        Self {
            identity: Identity::new(kind, id),
            cache_key: cache_key.map(str::to_string),
            failing: false,
            serialize_calls: AtomicUsize::new(0),
        }
    }

    /// Resource whose relationship resolution and serialization fail.
    pub fn failing(kind: &str, id: &str) -> Self {
        Self {
            failing: true,
            ..Self::new(kind, id, None)
        }
    }

    pub fn serialize_calls(&self) -> usize {
        self.serialize_calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if self.failing {
            return Err(RenderError::Resource(format!("{} is broken", self.identity)));
        }
        Ok(())
    }
}

impl Resource for CountingResource {
    fn identity(&self) -> Identity {
        self.identity.clone()
    }

    fn related_resources(&self, _keys: &FieldSet) -> Result<Related> {
        self.check()?;
        Ok(Related::new())
    }

    fn serialize(&self, _include: &FieldSet, _fields: Option<&FieldSet>) -> Result<Value> {
        self.check()?;
        self.serialize_calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!({
            "type": self.identity.kind,
            "id": self.identity.id,
            "attributes": {}
        }))
    }

    fn cache_key(&self, _include: &FieldSet, _fields: Option<&FieldSet>) -> Result<Option<String>> {
        Ok(self.cache_key.clone())
    }
}
