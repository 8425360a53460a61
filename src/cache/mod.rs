//! Cache Module
//!
//! Provides the concurrent cache engine with FIFO eviction and periodic sync.

mod concurrent;
mod entry;
mod lifetime;
mod stats;


// Re-export public types
pub use concurrent::ConcurrentCache;
pub use entry::{CacheEntry, EntryRef};
pub use lifetime::LifetimeTracker;
pub use stats::CacheStats;
