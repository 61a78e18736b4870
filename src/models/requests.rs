//! Request DTOs for the demo server

use serde::Deserialize;

/// Request body for POST /echo
#[derive(Debug, Clone, Deserialize)]
pub struct EchoRequest {
    /// Arbitrary text echoed back
    pub data: String,
}
