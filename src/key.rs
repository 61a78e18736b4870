//! Cache Key Builder
//!
//! Derives a stable identity string for a request from its url, method and
//! payload.

use serde_json::Value;
use sha2::{Digest, Sha256};

// == Cache Key Request ==
/// The parts of a request that determine its cache identity.
#[derive(Debug, Clone, Copy)]
pub struct CacheKeyRequest<'a> {
    pub url: &'a str,
    pub method: &'a str,
    pub body: Option<&'a Value>,
    pub query: Option<&'a Value>,
}

impl<'a> CacheKeyRequest<'a> {
    pub fn new(url: &'a str, method: &'a str) -> Self {
        Self {
            url,
            method,
            body: None,
            query: None,
        }
    }

    pub fn body(mut self, body: &'a Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn query(mut self, query: &'a Value) -> Self {
        self.query = Some(query);
        self
    }
}

// == Build Cache Key ==
/// Returns `"{url}-{method}-{sha256(json(payload))}"`.
///
/// The payload is the body when non-empty, else the query when non-empty,
/// else the empty string. Where the payload came from does not affect the
/// key, only its JSON value does.
pub fn build_cache_key(request: &CacheKeyRequest<'_>) -> String {
    let empty = Value::String(String::new());
    let payload = request
        .body
        .filter(|v| !is_empty_payload(v))
        .or(request.query.filter(|v| !is_empty_payload(v)))
        .unwrap_or(&empty);

    format!("{}-{}-{}", request.url, request.method, hash_value(payload))
}

/// `null`, `""`, `{}` and `[]` count as no payload.
fn is_empty_payload(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Hex encoded SHA-256 of the JSON serialization of `value`.
///
/// Object keys serialize in sorted order, so maps equal as values hash equally
/// regardless of insertion order.
pub fn hash_value(value: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.to_string().as_bytes());
    hex::encode(hasher.finalize())
}
