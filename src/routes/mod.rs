//! Route Matching Module
//!
//! Compiles wildcard route specs and decides which routes are eligible for caching.

mod filter;
mod pattern;

pub use filter::{should_cache_route, IncludeRoutes, RoutePatterns};
pub use pattern::{wildcard_to_regex, RoutePattern};

// == Public Constants ==
/// Sentinel value of `includeRoutes` meaning "every route"
pub const MATCH_ALL: &str = "*";
