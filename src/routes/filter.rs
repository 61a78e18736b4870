//! Route Filter
//!
//! Applies include/exclude patterns. Exclusion always wins over inclusion.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{RoutePattern, MATCH_ALL};
use crate::error::{CacheError, Result};

// == Include Routes ==
/// Which routes are candidates for caching.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum IncludeRoutes {
    /// The `"*"` sentinel
    #[default]
    All,
    /// Only routes matching one of these wildcard specs
    Only(Vec<String>),
}

impl IncludeRoutes {
    /// Trims every route spec of surrounding whitespace.
    pub fn trimmed(self) -> Self {
        match self {
            IncludeRoutes::All => IncludeRoutes::All,
            IncludeRoutes::Only(routes) => {
                IncludeRoutes::Only(routes.iter().map(|r| r.trim().to_string()).collect())
            }
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawIncludeRoutes {
    Sentinel(String),
    List(Vec<String>),
}

impl<'de> Deserialize<'de> for IncludeRoutes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match RawIncludeRoutes::deserialize(deserializer)? {
            RawIncludeRoutes::Sentinel(s) if s.trim() == MATCH_ALL => Ok(IncludeRoutes::All),
            RawIncludeRoutes::Sentinel(s) => Err(serde::de::Error::custom(format!(
                "includeRoutes must be \"*\" or a list of routes, got \"{}\"",
                s
            ))),
            RawIncludeRoutes::List(routes) => Ok(IncludeRoutes::Only(routes)),
        }
    }
}

impl Serialize for IncludeRoutes {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            IncludeRoutes::All => serializer.serialize_str(MATCH_ALL),
            IncludeRoutes::Only(routes) => routes.serialize(serializer),
        }
    }
}

// == Route Patterns ==
/// Compiled include and exclude sets, immutable after construction.
#[derive(Debug, Clone)]
pub struct RoutePatterns {
    include: Vec<RoutePattern>,
    exclude: Vec<RoutePattern>,
}

impl RoutePatterns {
    /// Compiles both route sets. Routes are expected to be trimmed already.
    pub fn compile(include_routes: &IncludeRoutes, exclude_routes: &[String]) -> Result<Self> {
        let include = match include_routes {
            IncludeRoutes::All => vec![RoutePattern::match_all()],
            IncludeRoutes::Only(routes) => compile_all(routes)?,
        };
        let exclude = compile_all(exclude_routes)?;

        Ok(Self { include, exclude })
    }

    pub fn include(&self) -> &[RoutePattern] {
        &self.include
    }

    pub fn exclude(&self) -> &[RoutePattern] {
        &self.exclude
    }

    /// Shorthand for [`should_cache_route`] against these patterns.
    pub fn allows(&self, route: &str) -> bool {
        should_cache_route(&self.include, &self.exclude, route)
    }
}

fn compile_all(routes: &[String]) -> Result<Vec<RoutePattern>> {
    routes
        .iter()
        .map(|route| {
            if route.is_empty() {
                return Err(CacheError::InvalidConfig(
                    "route patterns must not be empty".to_string(),
                ));
            }
            RoutePattern::new(route)
        })
        .collect()
}

// == Should Cache Route ==
/// Returns false if any exclude pattern matches, otherwise true iff an
/// include pattern matches.
pub fn should_cache_route(
    include_patterns: &[RoutePattern],
    exclude_patterns: &[RoutePattern],
    route: &str,
) -> bool {
    if exclude_patterns.iter().any(|p| p.is_match(route)) {
        return false;
    }

    include_patterns.iter().any(|p| p.is_match(route))
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn routes(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_include_with_exclude_precedence() {
        let patterns = RoutePatterns::compile(
            &IncludeRoutes::Only(routes(&["/admin/*"])),
            &routes(&["/admin/secret"]),
        )
        .unwrap();

        assert!(patterns.allows("/admin/public"));
        assert!(!patterns.allows("/admin/secret"));
        assert!(!patterns.allows("/users"));
    }

    #[test]
    fn test_exclude_beats_match_all() {
        let patterns = RoutePatterns::compile(&IncludeRoutes::All, &routes(&["/health"])).unwrap();

        assert!(!patterns.allows("/health"));
        assert!(patterns.allows("/ping"));
        assert!(patterns.allows("/health/deep"));
        assert!(patterns.allows(""));
    }

    #[test]
    fn test_empty_include_list_caches_nothing() {
        let patterns = RoutePatterns::compile(&IncludeRoutes::Only(vec![]), &[]).unwrap();
        assert!(!patterns.allows("/ping"));
    }

    #[test]
    fn test_wildcard_exclude() {
        let patterns =
            RoutePatterns::compile(&IncludeRoutes::All, &routes(&["/internal/*"])).unwrap();
        assert!(!patterns.allows("/internal/metrics"));
        assert!(patterns.allows("/internal"));
    }

    #[test]
    fn test_empty_route_spec_rejected() {
        let result = RoutePatterns::compile(&IncludeRoutes::All, &routes(&[""]));
        assert!(matches!(result, Err(CacheError::InvalidConfig(_))));
    }

    #[test]
    fn test_include_routes_deserialize() {
        let all: IncludeRoutes = serde_json::from_str(r#""*""#).unwrap();
        assert_eq!(all, IncludeRoutes::All);

        let only: IncludeRoutes = serde_json::from_str(r#"["/a", "/b/*"]"#).unwrap();
        assert_eq!(only, IncludeRoutes::Only(routes(&["/a", "/b/*"])));

        assert!(serde_json::from_str::<IncludeRoutes>(r#""/a""#).is_err());
    }

    #[test]
    fn test_include_routes_trimmed() {
        let trimmed = IncludeRoutes::Only(routes(&["  /a ", "/b\t"])).trimmed();
        assert_eq!(trimmed, IncludeRoutes::Only(routes(&["/a", "/b"])));
    }
}
