//! Light Cache - response caching for axum services
//!
//! Stores responses keyed by request identity, serves them back until their
//! TTL elapses, and optionally snapshots them to disk across restarts.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod facade;
pub mod gate;
pub mod key;
pub mod middleware;
pub mod models;
pub mod routes;

pub use api::AppState;
pub use config::{CacheConfig, CacheOptions, ServerConfig};
pub use error::{CacheError, Result};
pub use facade::LightCache;
pub use gate::should_data_be_cached;
pub use key::{build_cache_key, CacheKeyRequest};
pub use middleware::{cache_middleware, CacheLayerState};
