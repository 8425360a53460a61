//! Background Tasks Module
//!
//! Contains background tasks that run for the lifetime of a cache.
//!
//! # Tasks
//! - Sync: Periodically writes every cached entry to the persistent store

mod sync;

pub use sync::{SyncTask, SYNC_THREAD_NAME};
