//! API Handlers
//!
//! Demo endpoint handlers. Their responses are what the cache stores.

use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::SecondsFormat;
use serde_json::{json, Value};

use crate::config::CacheOptions;
use crate::facade::LightCache;
use crate::middleware::CacheLayerState;
use crate::models::{EchoRequest, EchoResponse, HealthResponse, ResetResponse, StatsResponse};

/// Application state shared across all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub cache: LightCache,
    pub options: Arc<CacheOptions>,
}

impl AppState {
    pub fn new(cache: LightCache, options: CacheOptions) -> Self {
        Self {
            cache,
            options: Arc::new(options),
        }
    }

    /// Creates the state with storage chosen from the options.
    ///
    /// The caller still has to run [`LightCache::setup`] before serving.
    pub fn from_options(options: CacheOptions) -> Self {
        let cache = LightCache::from_options(&options);
        Self::new(cache, options)
    }

    /// State for the cache middleware, sharing the same cache.
    pub fn layer_state(&self) -> CacheLayerState {
        CacheLayerState {
            cache: self.cache.clone(),
            options: self.options.clone(),
        }
    }
}

/// Handler for GET /ping
pub async fn ping_handler() -> &'static str {
    "pong"
}

/// Handler for GET /json
pub async fn json_handler() -> Json<Value> {
    Json(json!({ "hello": "world" }))
}

/// Handler for GET /date
///
/// Returns a nanosecond timestamp so that cached and fresh responses can be told apart.
pub async fn date_handler() -> String {
    chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Handler for POST /echo
pub async fn echo_handler(Json(req): Json<EchoRequest>) -> Json<EchoResponse> {
    Json(EchoResponse::new(req.data))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(state.cache.stats().into())
}

/// Handler for DELETE /cache
pub async fn reset_handler(State(state): State<AppState>) -> Json<ResetResponse> {
    state.cache.reset(crate::cache::ResetTarget::All);
    Json(ResetResponse::cleared())
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
