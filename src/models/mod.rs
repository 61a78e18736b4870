//! Request and Response models for the demo server
//!
//! DTOs serialized by the demo endpoints wired behind the cache middleware.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::EchoRequest;
pub use responses::{EchoResponse, HealthResponse, ResetResponse, StatsResponse};
