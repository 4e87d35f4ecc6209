//! Concurrency-safe keyed registry
//!
//! A `HashMap` behind a single `tokio::sync::RwLock`. Every method takes the
//! lock for exactly one map operation and never awaits anything else while
//! holding it, so callers may treat each call as atomic.

use std::collections::HashMap;
use std::hash::Hash;

use tokio::sync::RwLock;

#[derive(Debug)]
pub struct Registry<K, V> {
    entries: RwLock<HashMap<K, V>>,
}

impl<K, V> Default for Registry<K, V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> Registry<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        self.entries.read().await.get(key).cloned()
    }

    /// Insert or replace, returning the previous value
    pub async fn insert(&self, key: K, value: V) -> Option<V> {
        self.entries.write().await.insert(key, value)
    }

    /// Insert only if the key is free
    ///
    /// On conflict the existing value is returned in `Err` and the registry
    /// is left untouched.
    pub async fn try_insert(&self, key: K, value: V) -> Result<V, V> {
        let mut entries = self.entries.write().await;
        if let Some(existing) = entries.get(&key) {
            return Err(existing.clone());
        }
        entries.insert(key, value.clone());
        Ok(value)
    }

    /// Atomic create-if-absent
    ///
    /// Returns the stored value and whether this call created it. `make` runs
    /// at most once, under the write lock.
    pub async fn get_or_insert_with(&self, key: K, make: impl FnOnce() -> V) -> (V, bool) {
        let mut entries = self.entries.write().await;
        if let Some(existing) = entries.get(&key) {
            return (existing.clone(), false);
        }
        let value = make();
        entries.insert(key, value.clone());
        (value, true)
    }

    pub async fn remove(&self, key: &K) -> Option<V> {
        self.entries.write().await.remove(key)
    }

    pub async fn contains_key(&self, key: &K) -> bool {
        self.entries.read().await.contains_key(key)
    }

    pub async fn keys(&self) -> Vec<K> {
        self.entries.read().await.keys().cloned().collect()
    }

    pub async fn values(&self) -> Vec<V> {
        self.entries.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
