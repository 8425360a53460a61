//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.
//!
//! Cache calls may block up to the lock timeout, so they run on tokio's
//! blocking pool instead of the async workers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::cache::ConcurrentCache;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    validate_key, FindResponse, HealthResponse, StatsResponse, SyncResponse, UpdateRequest,
    UpdateResponse,
};
use crate::store::PersistentStore;

/// Cache type served over HTTP.
pub type StringCache = ConcurrentCache<String, String>;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Thread-safe cache; the last clone dropped stops the sync thread
    pub cache: Arc<StringCache>,
}

impl AppState {
    /// Creates a new AppState with the given cache.
    pub fn new(cache: StringCache) -> Self {
        Self {
            cache: Arc::new(cache),
        }
    }

    /// Creates a new AppState from configuration.
    pub fn from_config(
        config: &Config,
        store: Arc<dyn PersistentStore<String, String>>,
    ) -> Result<Self> {
        let cache = ConcurrentCache::from_config(config, store)?;
        Ok(Self::new(cache))
    }
}

/// Runs a blocking cache call off the async runtime.
async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|err| CacheError::Internal(format!("Blocking task failed: {}", err)))?
}

/// Handler for GET /keys/:key
///
/// Returns the cached value, loading it from the store on a miss.
pub async fn find_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<FindResponse>> {
    if let Some(error_msg) = validate_key(&key) {
        return Err(CacheError::InvalidArgument(error_msg));
    }

    let cache = Arc::clone(&state.cache);
    let (key, value) = run_blocking(move || {
        let value = cache.find(&key)?;
        Ok((key, value))
    })
    .await?;

    Ok(Json(FindResponse::new(key, value)))
}

/// Handler for PUT /keys/:key
///
/// Sets the value for a key.
pub async fn update_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<UpdateRequest>,
) -> Result<Json<UpdateResponse>> {
    if let Some(error_msg) = req.validate(&key) {
        return Err(CacheError::InvalidArgument(error_msg));
    }

    let cache = Arc::clone(&state.cache);
    let key = run_blocking(move || {
        cache.update(&key, req.value)?;
        Ok(key)
    })
    .await?;

    Ok(Json(UpdateResponse::new(key)))
}

/// Handler for POST /sync
///
/// Writes every cached entry to the store right away.
pub async fn sync_handler(State(state): State<AppState>) -> Result<Json<SyncResponse>> {
    let cache = Arc::clone(&state.cache);
    let synced = run_blocking(move || cache.sync_now()).await?;

    Ok(Json(SyncResponse { synced }))
}

/// Handler for GET /stats
///
/// Returns current cache statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let cache = Arc::clone(&state.cache);
    let stats = run_blocking(move || cache.stats()).await?;

    Ok(Json(StatsResponse::from(stats)))
}

/// Handler for GET /health
///
/// Returns health status of the server.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::time::Duration;

    fn test_state() -> AppState {
        let cache: StringCache = ConcurrentCache::new(
            100,
            Duration::from_secs(60),
            Duration::from_millis(100),
            Arc::new(MemoryStore::<String, String>::new()),
        )
        .unwrap();
        AppState::new(cache)
    }

    #[tokio::test]
    async fn test_update_and_find_handler() {
        let state = test_state();

        let req = UpdateRequest {
            value: "test_value".to_string(),
        };
        let result = update_handler(
            State(state.clone()),
            Path("test_key".to_string()),
            Json(req),
        )
        .await;
        assert!(result.is_ok());

        let result = find_handler(State(state.clone()), Path("test_key".to_string())).await;
        let response = result.unwrap();
        assert_eq!(response.value, "test_value");
    }

    #[tokio::test]
    async fn test_find_unknown_key_returns_empty() {
        let state = test_state();

        let response = find_handler(State(state.clone()), Path("unknown".to_string()))
            .await
            .unwrap();
        assert_eq!(response.value, "");
        assert_eq!(state.cache.size().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let state = test_state();

        let response = stats_handler(State(state)).await.unwrap();
        assert_eq!(response.stats.hits, 0);
        assert_eq!(response.stats.max_size, 100);
    }

    #[tokio::test]
    async fn test_sync_handler() {
        let state = test_state();
        state
            .cache
            .update(&"k".to_string(), "v".to_string())
            .unwrap();

        let response = sync_handler(State(state)).await.unwrap();
        assert_eq!(response.synced, 1);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }

    #[tokio::test]
    async fn test_find_rejects_oversized_key() {
        let state = test_state();

        let result = find_handler(State(state.clone()), Path("x".repeat(300))).await;
        assert!(matches!(result, Err(CacheError::InvalidArgument(_))));
        assert_eq!(state.cache.size().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_invalid_request() {
        let state = test_state();

        let req = UpdateRequest {
            value: "value".to_string(),
        };
        let result = update_handler(State(state), Path("x".repeat(300)), Json(req)).await;
        assert!(matches!(result, Err(CacheError::InvalidArgument(_))));
    }
}
