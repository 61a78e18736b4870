//! Request Hooks
//!
//! axum middleware wiring the cache into a request pipeline: replies from the
//! cache before dispatch and stores eligible responses after it.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    body::{Body, Bytes, HttpBody},
    extract::{MatchedPath, Query, Request, State},
    http::{header::HeaderName, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures::{stream, StreamExt};
use http_body_util::BodyExt;
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::{Entry, HeaderValue, Headers, MAX_BODY_SIZE};
use crate::config::CacheOptions;
use crate::facade::LightCache;
use crate::gate::should_data_be_cached;
use crate::key::{build_cache_key, CacheKeyRequest};

// == Layer State ==
/// State handed to [`cache_middleware`] through `from_fn_with_state`.
#[derive(Debug, Clone)]
pub struct CacheLayerState {
    pub cache: LightCache,
    pub options: Arc<CacheOptions>,
}

impl CacheLayerState {
    pub fn new(cache: LightCache, options: CacheOptions) -> Self {
        Self {
            cache,
            options: Arc::new(options),
        }
    }
}

// == Request Descriptor ==
/// What the hooks need to know about an incoming request.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub url: String,
    pub method: String,
    pub route: String,
    pub body: Option<Value>,
    pub query: Option<Value>,
}

impl RequestDescriptor {
    /// Returns `None` when the body has no lossless JSON form, in which case
    /// the request bypasses the cache.
    fn from_parts(parts: &Parts, body: &Bytes) -> Option<Self> {
        let uri = &parts.uri;
        let url = uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| uri.path().to_string());
        let route = parts
            .extensions
            .get::<MatchedPath>()
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| uri.path().to_string());
        let query = Query::<BTreeMap<String, String>>::try_from_uri(uri)
            .ok()
            .map(|Query(params)| {
                Value::Object(
                    params
                        .into_iter()
                        .map(|(k, v)| (k, Value::String(v)))
                        .collect(),
                )
            });
        let body = match parse_body(body) {
            BodyPayload::Empty => None,
            BodyPayload::Value(value) => Some(value),
            BodyPayload::Binary => return None,
        };

        Some(Self {
            url,
            method: parts.method.as_str().to_string(),
            route,
            body,
            query,
        })
    }

    pub fn cache_key(&self) -> String {
        build_cache_key(&CacheKeyRequest {
            url: &self.url,
            method: &self.method,
            body: self.body.as_ref(),
            query: self.query.as_ref(),
        })
    }
}

#[derive(Debug, PartialEq)]
enum BodyPayload {
    Empty,
    Value(Value),
    Binary,
}

/// JSON bodies are parsed and other UTF-8 text becomes a JSON string.
fn parse_body(body: &Bytes) -> BodyPayload {
    if body.is_empty() {
        return BodyPayload::Empty;
    }
    if let Ok(value) = serde_json::from_slice(body) {
        return BodyPayload::Value(value);
    }
    match std::str::from_utf8(body) {
        Ok(text) => BodyPayload::Value(Value::String(text.to_string())),
        Err(_) => BodyPayload::Binary,
    }
}

// == Body Buffering ==
/// Outcome of reading a body up to [`MAX_BODY_SIZE`].
enum Buffered {
    Complete(Bytes),
    /// The limit was crossed; the body replays everything read so far
    /// followed by the unread remainder.
    Overflow(Body),
}

async fn buffer_body(mut body: Body) -> Result<Buffered, axum::Error> {
    let mut buf: Vec<u8> = Vec::new();

    while let Some(frame) = body.frame().await {
        let Ok(data) = frame?.into_data() else {
            continue;
        };
        buf.extend_from_slice(&data);

        if buf.len() > MAX_BODY_SIZE {
            let prefix = Bytes::from(buf);
            let rest = body.into_data_stream();
            let chained = stream::once(async move { Ok::<_, axum::Error>(prefix) }).chain(rest);
            return Ok(Buffered::Overflow(Body::from_stream(chained)));
        }
    }

    Ok(Buffered::Complete(Bytes::from(buf)))
}

// == Cache Middleware ==
/// Serves cached responses and caches eligible fresh ones.
///
/// Requests whose method is never cached, whose body is binary or over
/// [`MAX_BODY_SIZE`] pass through untouched. Oversized or binary responses are
/// returned as produced and not stored.
pub async fn cache_middleware(
    State(state): State<CacheLayerState>,
    request: Request,
    next: Next,
) -> Response {
    let options = &state.options;
    if options.disable_cache || !options.methods_to_cache.contains(request.method().as_str()) {
        return next.run(request).await;
    }

    let (parts, body) = request.into_parts();
    if exceeds_limit(&body) {
        debug!(uri = %parts.uri, "request body too large for caching, bypassing");
        return next.run(Request::from_parts(parts, body)).await;
    }

    let body = match buffer_body(body).await {
        Ok(Buffered::Complete(bytes)) => bytes,
        Ok(Buffered::Overflow(body)) => {
            debug!(uri = %parts.uri, "request body too large for caching, bypassing");
            return next.run(Request::from_parts(parts, body)).await;
        }
        Err(err) => {
            warn!(error = %err, "failed to read request body");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let Some(descriptor) = RequestDescriptor::from_parts(&parts, &body) else {
        debug!(uri = %parts.uri, "binary request body, bypassing cache");
        return next.run(Request::from_parts(parts, Body::from(body))).await;
    };
    let key = descriptor.cache_key();
    let storage = state.cache.storage();

    // Before dispatch
    if let Some(entry) = storage.get(&key) {
        debug!(key = %key, "cache hit");
        return replay(entry);
    }

    let response = next.run(Request::from_parts(parts, Body::from(body))).await;

    // After dispatch
    let status = response.status().as_u16();
    let eligible = should_data_be_cached(options, &descriptor.method, &descriptor.route, status);
    if !eligible || storage.has(&key) {
        return response;
    }

    let (parts, body) = response.into_parts();
    if exceeds_limit(&body) {
        return Response::from_parts(parts, body);
    }

    let bytes = match buffer_body(body).await {
        Ok(Buffered::Complete(bytes)) => bytes,
        Ok(Buffered::Overflow(body)) => {
            debug!(key = %key, "response body too large for caching");
            return Response::from_parts(parts, body);
        }
        Err(err) => {
            warn!(error = %err, "failed to read response body");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match std::str::from_utf8(&bytes) {
        Ok(text) => {
            let entry = Entry::response(
                Value::String(text.to_string()),
                status,
                collect_headers(&parts.headers),
            );
            storage.set(&key, entry);
            debug!(key = %key, status, "response cached");
        }
        Err(_) => debug!(key = %key, "binary response body, not cached"),
    }

    Response::from_parts(parts, Body::from(bytes))
}

fn exceeds_limit(body: &Body) -> bool {
    body.size_hint()
        .upper()
        .is_some_and(|upper| upper > MAX_BODY_SIZE as u64)
}

// == Header Conversion ==
fn collect_headers(headers: &HeaderMap) -> Headers {
    let mut collected = Headers::new();
    for (name, value) in headers {
        let Ok(value) = value.to_str() else {
            continue;
        };
        match collected.get_mut(name.as_str()) {
            Some(existing) => existing.push(value.to_string()),
            None => {
                collected.insert(
                    name.as_str().to_string(),
                    HeaderValue::Single(value.to_string()),
                );
            }
        }
    }
    collected
}

/// Rebuilds a response from a stored entry: status, headers, then payload.
fn replay(entry: Entry) -> Response {
    let body = match entry.payload {
        Value::String(text) => Body::from(text),
        other => Body::from(other.to_string()),
    };
    let mut response = Response::new(body);

    if let Some(status) = entry
        .status_code
        .and_then(|code| StatusCode::from_u16(code).ok())
    {
        *response.status_mut() = status;
    }

    if let Some(headers) = entry.headers {
        let target = response.headers_mut();
        for (name, value) in &headers {
            let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else {
                continue;
            };
            for v in value.values() {
                if let Ok(v) = axum::http::HeaderValue::from_str(v) {
                    target.append(name.clone(), v);
                }
            }
        }
    }

    response
}
