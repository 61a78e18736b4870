//! Configuration Module
//!
//! Raw cache configuration (`CacheConfig`), loadable from serde or environment
//! variables, and the immutable validated form (`CacheOptions`) built from it once.

use std::collections::HashSet;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::cache::ArmingPolicy;
use crate::error::{CacheError, Result};
use crate::routes::{IncludeRoutes, RoutePatterns, MATCH_ALL};

// == Defaults ==
/// Default TTL in minutes
pub const TTL_IN_MINUTES: f64 = 5.0;
/// Default status codes to cache
pub const STATUSES_TO_CACHE: [u16; 1] = [200];
/// Default HTTP methods to cache
pub const METHODS_TO_CACHE: [&str; 1] = ["GET"];

const MS_PER_MINUTE: f64 = 60_000.0;

// == Cache Config ==
/// Raw cache configuration as supplied by the host.
///
/// Field names follow the camelCase option names of the plugin interface.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheConfig {
    /// TTL in minutes; converted to milliseconds once in [`CacheOptions::from_config`]
    pub ttl_in_minutes: f64,
    /// HTTP method tokens whose responses may be cached
    pub methods_to_cache: Vec<String>,
    /// Status codes whose responses may be cached
    pub statuses_to_cache: Vec<u16>,
    /// Wildcard routes that are never cached
    pub exclude_routes: Vec<String>,
    /// `"*"` or wildcard routes that may be cached
    pub include_routes: IncludeRoutes,
    /// Turns the eligibility gate off entirely
    pub disable_cache: bool,
    /// Directory for the durable snapshot; `None` keeps the cache in memory only
    pub persist_dir: Option<PathBuf>,
    /// Timer re-arming policy of the store
    pub arming_policy: ArmingPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_in_minutes: TTL_IN_MINUTES,
            methods_to_cache: METHODS_TO_CACHE.iter().map(|m| m.to_string()).collect(),
            statuses_to_cache: STATUSES_TO_CACHE.to_vec(),
            exclude_routes: Vec::new(),
            include_routes: IncludeRoutes::All,
            disable_cache: false,
            persist_dir: None,
            arming_policy: ArmingPolicy::default(),
        }
    }
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `LCACHE_TTL_MINUTES` - TTL in minutes (default: 5)
    /// - `LCACHE_METHODS` - comma separated methods (default: GET)
    /// - `LCACHE_STATUSES` - comma separated status codes (default: 200)
    /// - `LCACHE_EXCLUDE_ROUTES` - comma separated wildcard routes (default: none)
    /// - `LCACHE_INCLUDE_ROUTES` - `*` or comma separated wildcard routes (default: *)
    /// - `LCACHE_DISABLE` - `true` disables caching (default: false)
    /// - `LCACHE_PERSIST_DIR` - snapshot directory (default: unset, memory only)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            ttl_in_minutes: env::var("LCACHE_TTL_MINUTES")
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.ttl_in_minutes),
            methods_to_cache: env::var("LCACHE_METHODS")
                .ok()
                .map(|v| split_list(&v))
                .unwrap_or(defaults.methods_to_cache),
            statuses_to_cache: env::var("LCACHE_STATUSES")
                .ok()
                .and_then(|v| split_list(&v).iter().map(|s| s.parse().ok()).collect())
                .unwrap_or(defaults.statuses_to_cache),
            exclude_routes: env::var("LCACHE_EXCLUDE_ROUTES")
                .ok()
                .map(|v| split_list(&v))
                .unwrap_or(defaults.exclude_routes),
            include_routes: env::var("LCACHE_INCLUDE_ROUTES")
                .ok()
                .map(|v| {
                    if v.trim() == MATCH_ALL {
                        IncludeRoutes::All
                    } else {
                        IncludeRoutes::Only(split_list(&v))
                    }
                })
                .unwrap_or(defaults.include_routes),
            disable_cache: env::var("LCACHE_DISABLE")
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.disable_cache),
            persist_dir: env::var("LCACHE_PERSIST_DIR")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            arming_policy: defaults.arming_policy,
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// == Cache Options ==
/// Validated, immutable cache options.
#[derive(Debug, Clone)]
pub struct CacheOptions {
    pub ttl: Duration,
    pub statuses_to_cache: HashSet<u16>,
    pub methods_to_cache: HashSet<String>,
    pub exclude_routes: Vec<String>,
    pub include_routes: IncludeRoutes,
    pub disable_cache: bool,
    pub persist_dir: Option<PathBuf>,
    pub arming_policy: ArmingPolicy,
    patterns: RoutePatterns,
}

impl CacheOptions {
    /// Builds options from raw configuration, failing fast on bad input.
    ///
    /// Routes are trimmed, methods upper-cased, lists collapsed to sets and
    /// the minute TTL converted to milliseconds.
    pub fn from_config(config: CacheConfig) -> Result<Self> {
        let ttl = minutes_to_duration(config.ttl_in_minutes)?;
        let exclude_routes: Vec<String> = config
            .exclude_routes
            .iter()
            .map(|r| r.trim().to_string())
            .collect();
        let include_routes = config.include_routes.trimmed();
        let patterns = RoutePatterns::compile(&include_routes, &exclude_routes)?;

        let methods_to_cache = config
            .methods_to_cache
            .iter()
            .map(|m| m.trim().to_ascii_uppercase())
            .collect::<HashSet<_>>();
        if methods_to_cache.iter().any(String::is_empty) {
            return Err(CacheError::InvalidConfig(
                "methodsToCache must not contain empty methods".to_string(),
            ));
        }

        Ok(Self {
            ttl,
            statuses_to_cache: config.statuses_to_cache.into_iter().collect(),
            methods_to_cache,
            exclude_routes,
            include_routes,
            disable_cache: config.disable_cache,
            persist_dir: config.persist_dir,
            arming_policy: config.arming_policy,
            patterns,
        })
    }

    /// Compiled route patterns.
    pub fn patterns(&self) -> &RoutePatterns {
        &self.patterns
    }

    /// TTL in milliseconds.
    pub fn ttl_ms(&self) -> u64 {
        self.ttl.as_millis() as u64
    }
}

fn minutes_to_duration(minutes: f64) -> Result<Duration> {
    if !minutes.is_finite() || minutes <= 0.0 {
        return Err(CacheError::InvalidTtl(format!(
            "ttlInMinutes must be a positive number, got {}",
            minutes
        )));
    }

    let ms = (minutes * MS_PER_MINUTE).round();
    if ms < 1.0 || ms > u64::MAX as f64 {
        return Err(CacheError::InvalidTtl(format!(
            "ttlInMinutes {} is out of range",
            minutes
        )));
    }

    Ok(Duration::from_millis(ms as u64))
}

// == Server Config ==
/// Demo server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP server port
    pub server_port: u16,
}

impl ServerConfig {
    /// Reads `SERVER_PORT` (default: 3000).
    pub fn from_env() -> Self {
        Self {
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { server_port: 3000 }
    }
}
