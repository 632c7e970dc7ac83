//! Batched fragment caches.
//!
//! A fragment is the serialized JSON text of one resource for one
//! `(include, fields)` parameterization. Caches are addressed by the
//! resource-provided cache key and are always queried in batches so that a
//! store with a multi-get primitive can serve a whole document in one trip.

pub mod fragment_lru;
pub mod memory;

pub use fragment_lru::LruFragmentCache;
pub use memory::{MemoryFragmentCache, NoopFragmentCache};

use crate::error::Result;
use std::collections::HashMap;

/// Computes the fragment for a cache key that the store does not hold.
pub type ComputeFn<'a> = dyn FnMut(&str) -> Result<String> + 'a;

/// Key-addressable memoizing store for rendered fragments.
pub trait FragmentCache: Send + Sync {
    /// Return a fragment for every key in `keys`.
    ///
    /// Stored fragments are returned as-is; missing ones are produced by
    /// `compute`, stored, and returned. `compute` is called at most once per
    /// distinct key in a batch, and the first error aborts the batch.
    fn fetch_many(
        &self,
        keys: &[String],
        compute: &mut ComputeFn<'_>,
    ) -> Result<HashMap<String, String>>;
}
