//! In-memory store, mainly for embedding and tests.

use std::collections::HashMap;
use std::hash::Hash;

use parking_lot::Mutex;

use super::PersistentStore;
use crate::error::StoreError;

// == Memory Store ==
/// A `PersistentStore` backed by a plain map behind a mutex.
#[derive(Debug)]
pub struct MemoryStore<K, V> {
    records: Mutex<HashMap<K, V>>,
}

impl<K, V> MemoryStore<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Number of keys the store has ever been given.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Reads a stored value without the default-on-absence fallback.
    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.records.lock().get(key).cloned()
    }
}

impl<K, V> Default for MemoryStore<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> PersistentStore<K, V> for MemoryStore<K, V>
where
    K: Eq + Hash + Clone + Send,
    V: Clone + Default + Send,
{
    fn find(&self, key: &K) -> Result<V, StoreError> {
        Ok(self.records.lock().get(key).cloned().unwrap_or_default())
    }

    fn update(&self, key: &K, value: &V) -> Result<(), StoreError> {
        self.records.lock().insert(key.clone(), value.clone());
        Ok(())
    }
}
