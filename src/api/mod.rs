//! API Module
//!
//! Demo endpoints served behind the cache middleware.
//!
//! # Endpoints
//! - `GET /ping` - Plain text `pong` (cached)
//! - `GET /json` - Static JSON document (cached)
//! - `GET /date` - Current time, different on every miss (cached)
//! - `POST /echo` - Echoes the request body (cached when POST is configured)
//! - `GET /health` - Health check endpoint
//! - `GET /stats` - Cache statistics
//! - `DELETE /cache` - Clears the cache

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
