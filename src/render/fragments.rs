//! Serialization of traversed resources into JSON fragments.

use std::collections::HashMap;

use crate::cache::FragmentCache;
use crate::error::{RenderError, Result};
use crate::graph::Traversal;
use crate::resource::{FieldSet, Fields, ResourceRef};

/// Fragments in the order of the traversal lists.
pub(crate) struct Fragments {
    pub primary: Vec<String>,
    pub included: Vec<String>,
}

enum Slot {
    Direct(String),
    Cached(String),
}

/// Render every traversed resource exactly once.
///
/// Primary and included resources go through the cache in a single batch.
/// Resources without a cache key are serialized directly. Resources that
/// share a cache key are serialized once and receive the same fragment.
pub(crate) fn render_fragments(
    traversal: &Traversal,
    fields: &Fields,
    cache: &dyn FragmentCache,
) -> Result<Fragments> {
    let total = traversal.primary.len() + traversal.included.len();
    let mut slots = Vec::with_capacity(total);
    let mut keys = Vec::new();
    let mut pending: HashMap<String, (ResourceRef, FieldSet, Option<&FieldSet>)> = HashMap::new();

    for res in traversal.primary.iter().chain(traversal.included.iter()) {
        let identity = res.identity();
        let include = traversal.keys_for(&identity);
        let type_fields = fields.get(&identity.kind);
        match res.cache_key(&include, type_fields)? {
            Some(key) => {
                if !pending.contains_key(&key) {
                    keys.push(key.clone());
                    pending.insert(key.clone(), (res.clone(), include, type_fields));
                }
                slots.push(Slot::Cached(key));
            }
            None => slots.push(Slot::Direct(serialize_fragment(res, &include, type_fields)?)),
        }
    }

    let fetched = if keys.is_empty() {
        HashMap::new()
    } else {
        let mut compute = |key: &str| -> Result<String> {
            let (res, include, type_fields) = pending
                .get(key)
                .ok_or_else(|| RenderError::Cache(format!("cache requested unknown key {}", key)))?;
            serialize_fragment(res, include, *type_fields)
        };
        cache.fetch_many(&keys, &mut compute)?
    };
    log::debug!(
        "Rendered {} fragments ({} distinct cache keys)",
        total,
        keys.len()
    );

    let mut rendered = Vec::with_capacity(total);
    for slot in slots {
        let fragment = match slot {
            Slot::Direct(fragment) => fragment,
            Slot::Cached(key) => fetched.get(&key).cloned().ok_or_else(|| {
                RenderError::Cache(format!("cache returned no fragment for key {}", key))
            })?,
        };
        rendered.push(fragment);
    }

    let included = rendered.split_off(traversal.primary.len());
    Ok(Fragments {
        primary: rendered,
        included,
    })
}

fn serialize_fragment(res: &ResourceRef, include: &FieldSet, fields: Option<&FieldSet>) -> Result<String> {
    Ok(serde_json::to_string(&res.serialize(include, fields)?)?)
}
