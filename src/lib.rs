//! Concurrent Cache - A size-bounded cache in front of a persistent store
//!
//! Provides concurrent find/update with bounded lock waits, FIFO eviction and
//! a background thread that periodically syncs entries to the store.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod store;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheStats, ConcurrentCache};
pub use config::Config;
pub use error::{CacheError, LockStage, StoreError};
pub use store::{JsonFileStore, MemoryStore, PersistentStore, StoreValue};
