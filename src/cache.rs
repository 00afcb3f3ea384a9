use crate::error::Result;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};

/// Per-organization memo of finished pipeline runs.
///
/// Entries live for the lifetime of the cache; there is no expiry and no
/// manual refresh. Two callers missing the same key at once both run the
/// fetch and the last one to finish wins. The lock is never held across the
/// fetch itself.
pub struct ResultCache<V> {
    entries: RwLock<HashMap<String, Arc<V>>>,
}

impl<V> Default for ResultCache<V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<V> ResultCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Arc<V>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    pub fn insert(&self, key: &str, value: V) -> Arc<V> {
        let value = Arc::new(value);
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), Arc::clone(&value));
        value
    }

    /// Returns the stored value for `key`, running `fetch` only on a miss.
    /// A failed fetch stores nothing.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, fetch: F) -> Result<Arc<V>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        if let Some(hit) = self.get(key) {
            tracing::debug!(key, "cache hit");
            return Ok(hit);
        }
        let value = fetch().await?;
        Ok(self.insert(key, value))
    }
}
