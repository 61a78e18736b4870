//! Eligibility Gate
//!
//! Side-effect free predicate deciding whether a response may be cached.

use crate::config::CacheOptions;

/// True iff caching is enabled, the method and status are configured for
/// caching, and the route passes the include/exclude patterns.
pub fn should_data_be_cached(options: &CacheOptions, method: &str, route: &str, status_code: u16) -> bool {
    if options.disable_cache {
        return false;
    }

    options.methods_to_cache.contains(method)
        && options.statuses_to_cache.contains(&status_code)
        && options.patterns().allows(route)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::routes::IncludeRoutes;

    fn options(config: CacheConfig) -> CacheOptions {
        CacheOptions::from_config(config).unwrap()
    }

    #[test]
    fn test_defaults_cache_get_200() {
        let opts = options(CacheConfig::default());
        assert!(should_data_be_cached(&opts, "GET", "/ping", 200));
        assert!(!should_data_be_cached(&opts, "POST", "/ping", 200));
        assert!(!should_data_be_cached(&opts, "GET", "/ping", 404));
    }

    #[test]
    fn test_custom_methods_and_statuses() {
        let opts = options(CacheConfig {
            methods_to_cache: vec!["GET".into(), "POST".into()],
            statuses_to_cache: vec![200, 201],
            ..CacheConfig::default()
        });
        assert!(should_data_be_cached(&opts, "POST", "/post", 201));
        assert!(!should_data_be_cached(&opts, "PUT", "/put", 201));
    }

    #[test]
    fn test_route_filters_apply() {
        let opts = options(CacheConfig {
            include_routes: IncludeRoutes::Only(vec!["/admin/*".into()]),
            exclude_routes: vec!["/admin/secret".into()],
            ..CacheConfig::default()
        });
        assert!(should_data_be_cached(&opts, "GET", "/admin/public", 200));
        assert!(!should_data_be_cached(&opts, "GET", "/admin/secret", 200));
        assert!(!should_data_be_cached(&opts, "GET", "/public", 200));
    }

    #[test]
    fn test_disable_cache_short_circuits() {
        let opts = options(CacheConfig {
            disable_cache: true,
            ..CacheConfig::default()
        });
        assert!(!should_data_be_cached(&opts, "GET", "/ping", 200));
    }
}
