//! Cache Entry Module
//!
//! Defines a single live key/value pair and the lock guarding its value.

use std::sync::Arc;

use parking_lot::Mutex;

/// Shared handle to an entry.
///
/// The table and the lifetime tracker both hold one, so an entry keeps a
/// stable address no matter how the table rehashes.
pub type EntryRef<K, V> = Arc<CacheEntry<K, V>>;

// == Cache Entry ==
/// Represents a single cache entry.
///
/// Membership in the table is guarded by the table lock; the value is guarded
/// by `value` alone once a handle has been obtained.
#[derive(Debug)]
pub struct CacheEntry<K, V> {
    /// The key this entry is stored under
    pub key: K,
    /// The cached value
    pub value: Mutex<V>,
}

impl<K, V> CacheEntry<K, V> {
    // == Constructor ==
    /// Creates a new shared entry.
    pub fn new_ref(key: K, value: V) -> EntryRef<K, V> {
        Arc::new(Self {
            key,
            value: Mutex::new(value),
        })
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_entry_creation() {
        let entry = CacheEntry::new_ref("Petrov".to_string(), "Eugen".to_string());

        assert_eq!(entry.key, "Petrov");
        assert_eq!(*entry.value.lock(), "Eugen");
    }

    #[test]
    fn test_entry_lock_times_out_while_held() {
        let entry = CacheEntry::new_ref(1, 10);
        let _guard = entry.value.lock();

        assert!(entry.value.try_lock_for(Duration::from_millis(5)).is_none());
    }

    #[test]
    fn test_handles_share_value() {
        let entry = CacheEntry::new_ref(1, 10);
        let other = Arc::clone(&entry);

        *other.value.lock() = 11;
        assert_eq!(*entry.value.lock(), 11);
    }
}
