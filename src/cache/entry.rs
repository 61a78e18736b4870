//! Cache Entry Module
//!
//! Defines stored responses and their write timestamps.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::Instant;

// == Header Value ==
/// A response header with one or several values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderValue {
    Single(String),
    Multi(Vec<String>),
}

impl HeaderValue {
    /// Iterates every value of this header.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        let values: Vec<&str> = match self {
            HeaderValue::Single(v) => vec![v.as_str()],
            HeaderValue::Multi(vs) => vs.iter().map(String::as_str).collect(),
        };
        values.into_iter()
    }

    /// Appends `value`, promoting a single value to a list.
    pub fn push(&mut self, value: String) {
        match self {
            HeaderValue::Single(existing) => {
                *self = HeaderValue::Multi(vec![std::mem::take(existing), value]);
            }
            HeaderValue::Multi(values) => values.push(value),
        }
    }
}

/// Header name to value(s), ordered for stable snapshots.
pub type Headers = BTreeMap<String, HeaderValue>;

// == Entry ==
/// A stored response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Response payload, opaque to the store
    pub payload: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Headers>,
}

impl Entry {
    /// Creates an entry carrying only a payload.
    pub fn new(payload: Value) -> Self {
        Self {
            payload,
            status_code: None,
            headers: None,
        }
    }

    /// Creates an entry for a full response.
    pub fn response(payload: Value, status_code: u16, headers: Headers) -> Self {
        Self {
            payload,
            status_code: Some(status_code),
            headers: Some(headers),
        }
    }
}

// == Entry Meta ==
/// Write timestamp of an entry on the monotonic clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryMeta {
    pub updated_at: Instant,
}

impl EntryMeta {
    /// Meta stamped with the current instant.
    pub fn now() -> Self {
        Self {
            updated_at: Instant::now(),
        }
    }

    /// Instant at which the entry expires.
    pub fn deadline(&self, ttl: Duration) -> Instant {
        self.updated_at + ttl
    }

    /// Remaining lifetime, clamped to zero once the TTL has elapsed.
    pub fn remaining(&self, ttl: Duration, now: Instant) -> Duration {
        self.deadline(ttl).saturating_duration_since(now)
    }

    /// Converts to wall-clock Unix milliseconds for persistence.
    pub fn to_unix_ms(&self) -> i64 {
        let age = Instant::now().saturating_duration_since(self.updated_at);
        current_timestamp_ms() - age.as_millis() as i64
    }

    /// Rebuilds meta from persisted Unix milliseconds, preserving the entry's age.
    ///
    /// Timestamps in the future are treated as written now.
    pub fn from_unix_ms(updated_at_ms: i64) -> Self {
        let age_ms = (current_timestamp_ms() - updated_at_ms).max(0) as u64;
        let now = Instant::now();
        let updated_at = now
            .checked_sub(Duration::from_millis(age_ms))
            .unwrap_or(now);
        Self { updated_at }
    }
}

/// Persisted form of [`EntryMeta`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaRecord {
    /// Unix milliseconds of the last write
    pub updated_at: i64,
}

impl From<&EntryMeta> for MetaRecord {
    fn from(meta: &EntryMeta) -> Self {
        Self {
            updated_at: meta.to_unix_ms(),
        }
    }
}

impl From<MetaRecord> for EntryMeta {
    fn from(record: MetaRecord) -> Self {
        EntryMeta::from_unix_ms(record.updated_at)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> i64 {
    Utc::now().timestamp_millis()
}
