use super::{ComputeFn, FragmentCache};
use crate::error::{RenderError, Result};
use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};

/// Thread-safe LRU cache for rendered fragments
///
/// Meant to be shared across documents (`Arc<dyn FragmentCache>`) so that
/// resources whose cache key does not change are serialized once per process.
/// Uses LRU eviction to keep memory bounded; an evicted fragment is simply
/// recomputed on its next request.
pub struct LruFragmentCache {
    cache: Mutex<LruCache<String, String>>,
}

impl LruFragmentCache {
    /// Create a new fragment cache holding at most `capacity` fragments
    ///
    /// A capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);

        Self {
            cache: Mutex::new(LruCache::new(cap)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, LruCache<String, String>>> {
        self.cache
            .lock()
            .map_err(|_| RenderError::Cache("LRU fragment cache lock poisoned".to_string()))
    }

    /// Get a cached fragment, marking it as recently used
    pub fn get(&self, key: &str) -> Option<String> {
        self.lock().ok()?.get(key).cloned()
    }

    /// Get the current number of cached fragments
    pub fn len(&self) -> usize {
        self.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear all fragments, e.g. after the underlying records changed
    pub fn clear(&self) {
        if let Ok(mut cache) = self.lock() {
            cache.clear();
        }
    }
}

impl FragmentCache for LruFragmentCache {
    fn fetch_many(
        &self,
        keys: &[String],
        compute: &mut ComputeFn<'_>,
    ) -> Result<HashMap<String, String>> {
        let mut out = HashMap::with_capacity(keys.len());
        let mut misses = Vec::new();
        {
            let mut cache = self.lock()?;
            for key in keys {
                if out.contains_key(key) || misses.contains(key) {
                    continue;
                }
                match cache.get(key) {
                    Some(hit) => {
                        out.insert(key.clone(), hit.clone());
                    }
                    None => misses.push(key.clone()),
                }
            }
        }

        // Computed unlocked; `compute` may render through this same cache.
        for key in &misses {
            let fresh = compute(key)?;
            self.lock()?.put(key.clone(), fresh.clone());
            out.insert(key.clone(), fresh);
        }
        log::debug!(
            "LRU fragment cache: {} keys, {} hits, {} misses ({} stored)",
            out.len(),
            out.len() - misses.len(),
            misses.len(),
            self.len()
        );
        Ok(out)
    }
}
