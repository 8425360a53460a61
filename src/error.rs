//! Error types for the cache engine
//!
//! Provides unified error handling using thiserror.

use std::collections::TryReserveError;
use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Lock Stage ==
/// Which lock a foreground operation was waiting on when it timed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockStage {
    /// Table lock in shared mode
    SharedTable,
    /// Table lock in exclusive mode
    ExclusiveTable,
    /// Per-entry value lock
    Entry,
}

impl fmt::Display for LockStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LockStage::SharedTable => "shared table lock",
            LockStage::ExclusiveTable => "exclusive table lock",
            LockStage::Entry => "entry lock",
        };
        f.write_str(name)
    }
}

// == Store Error Enum ==
/// Failures surfaced by a persistent store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Reading or writing the backing file failed
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file exists but is not a valid dump
    #[error("Store dump is malformed: {0}")]
    Parse(#[from] serde_json::Error),

    /// A stored string could not be converted to the value type
    #[error("Cannot convert '{value}' to {target}")]
    Conversion { value: String, target: &'static str },
}

// == Cache Error Enum ==
/// Unified error type for the cache engine.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Construction-time contract violation
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A foreground lock could not be acquired within the configured timeout
    #[error("Cache timeout waiting for {stage}")]
    LockTimeout { stage: LockStage },

    /// The lifetime tracker had nothing to evict
    #[error("Lifetime tracker queue is empty")]
    QueueEmpty,

    /// The entry table and the lifetime tracker disagree
    #[error("Internal consistency violation: {0}")]
    InternalConsistency(String),

    /// The lifetime tracker could not grow to record a new entry
    #[error("Lifetime tracker allocation failed: {0}")]
    TrackerAllocation(#[from] TryReserveError),

    /// Error propagated from the persistent store
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The background sync thread could not be started
    #[error("Failed to start sync thread: {0}")]
    SyncSpawn(#[source] std::io::Error),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Returns true if the caller may simply retry the operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CacheError::LockTimeout { .. })
    }

    /// Returns true if the error means the cache structures are corrupted.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CacheError::QueueEmpty | CacheError::InternalConsistency(_)
        )
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            CacheError::LockTimeout { .. } => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache engine.
pub type Result<T> = std::result::Result<T, CacheError>;
