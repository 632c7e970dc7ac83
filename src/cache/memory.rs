use super::{ComputeFn, FragmentCache};
use crate::error::{RenderError, Result};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Unbounded in-process fragment table. Every document gets one of these
/// unless a shared cache is supplied.
#[derive(Debug, Default)]
pub struct MemoryFragmentCache {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryFragmentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored fragments
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MemoryFragmentCache {
    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| RenderError::Cache("fragment table lock poisoned".to_string()))
    }
}

impl FragmentCache for MemoryFragmentCache {
    fn fetch_many(
        &self,
        keys: &[String],
        compute: &mut ComputeFn<'_>,
    ) -> Result<HashMap<String, String>> {
        let mut out = HashMap::with_capacity(keys.len());
        let mut misses = Vec::new();
        {
            let entries = self.lock()?;
            for key in keys {
                if out.contains_key(key) || misses.contains(key) {
                    continue;
                }
                match entries.get(key) {
                    Some(hit) => {
                        out.insert(key.clone(), hit.clone());
                    }
                    None => misses.push(key.clone()),
                }
            }
        }

        // The lock is not held while computing: `compute` may render through
        // this same cache.
        for key in &misses {
            let fresh = compute(key)?;
            let stored = self
                .lock()?
                .entry(key.clone())
                .or_insert(fresh)
                .clone();
            out.insert(key.clone(), stored);
        }
        log::debug!(
            "Fragment cache: {} keys, {} hits, {} misses",
            out.len(),
            out.len() - misses.len(),
            misses.len()
        );
        Ok(out)
    }
}

/// Cache that stores nothing; fragments are recomputed on every batch.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopFragmentCache;

impl FragmentCache for NoopFragmentCache {
    fn fetch_many(
        &self,
        keys: &[String],
        compute: &mut ComputeFn<'_>,
    ) -> Result<HashMap<String, String>> {
        let mut out = HashMap::with_capacity(keys.len());
        for key in keys {
            if !out.contains_key(key) {
                out.insert(key.clone(), compute(key)?);
            }
        }
        Ok(out)
    }
}
