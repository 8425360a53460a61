//! Cache Statistics Module
//!
//! Tracks hits, store loads, evictions, lock timeouts and sync cycles.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Point-in-time snapshot of cache counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Lookups served by an existing entry
    pub hits: u64,
    /// Lookups that loaded a new entry from the store
    pub misses: u64,
    /// Entries evicted to make room
    pub evictions: u64,
    /// Foreground operations aborted by a lock timeout
    pub lock_timeouts: u64,
    /// Completed sync cycles
    pub sync_cycles: u64,
    /// Current number of entries in the cache
    pub size: u64,
    /// Capacity bound
    pub max_size: u64,
}

impl CacheStats {
    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// == Stats Counters ==
/// Lock-free counters updated from any thread.
#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    lock_timeouts: AtomicU64,
    sync_cycles: AtomicU64,
}

impl StatsCounters {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_lock_timeout(&self) {
        self.lock_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sync_cycle(&self) {
        self.sync_cycles.fetch_add(1, Ordering::Relaxed);
    }

    /// Builds a snapshot; `size` and `max_size` come from the caller.
    pub fn snapshot(&self, size: u64, max_size: u64) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            lock_timeouts: self.lock_timeouts.load(Ordering::Relaxed),
            sync_cycles: self.sync_cycles.load(Ordering::Relaxed),
            size,
            max_size,
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_new() {
        let stats = StatsCounters::default().snapshot(0, 10);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.max_size, 10);
    }

    #[test]
    fn test_hit_rate_no_requests() {
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let counters = StatsCounters::default();
        counters.record_hit();
        counters.record_hit();
        counters.record_hit();
        counters.record_miss();
        assert_eq!(counters.snapshot(1, 1).hit_rate(), 0.75);
    }

    #[test]
    fn test_record_counters() {
        let counters = StatsCounters::default();
        counters.record_eviction();
        counters.record_eviction();
        counters.record_lock_timeout();
        counters.record_sync_cycle();

        let stats = counters.snapshot(3, 5);
        assert_eq!(stats.evictions, 2);
        assert_eq!(stats.lock_timeouts, 1);
        assert_eq!(stats.sync_cycles, 1);
        assert_eq!(stats.size, 3);
    }
}
