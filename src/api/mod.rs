//! API Module
//!
//! HTTP handlers and routing for the cache server REST API.
//!
//! # Endpoints
//! - `GET /keys/:key` - Find a value by key
//! - `PUT /keys/:key` - Update a value by key
//! - `POST /sync` - Force a sync to the backing store
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
