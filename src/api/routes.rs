//! API Routes
//!
//! Configures the Axum router with the demo endpoints and the cache middleware.

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    date_handler, echo_handler, health_handler, json_handler, ping_handler, reset_handler,
    stats_handler, AppState,
};
use crate::middleware::cache_middleware;

/// Creates the main router with all endpoints configured.
///
/// Only the content endpoints sit behind the cache middleware; health,
/// stats and reset are always served live.
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let cache_layer = middleware::from_fn_with_state(state.layer_state(), cache_middleware);

    Router::new()
        .route("/ping", get(ping_handler))
        .route("/json", get(json_handler))
        .route("/date", get(date_handler))
        .route("/echo", post(echo_handler))
        .route_layer(cache_layer)
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/cache", delete(reset_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
