//! Persistent Store Module
//!
//! Durable key/value collaborators the cache loads misses from and syncs into.

mod json_file;
mod memory;
mod value;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use value::StoreValue;

use crate::error::StoreError;

// == Persistent Store ==
/// Backing storage consulted on a cache miss and written by the sync task.
///
/// Both operations are synchronous and are called while the cache holds its
/// own locks, so an implementation must never call back into the cache.
pub trait PersistentStore<K, V>: Send + Sync {
    /// Returns the stored value, or the value type's default when absent.
    fn find(&self, key: &K) -> Result<V, StoreError>;

    /// Inserts or overwrites the value for `key`.
    fn update(&self, key: &K, value: &V) -> Result<(), StoreError>;

    /// Makes previous updates durable. Called once at the end of each sync cycle.
    fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
