//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check store invariants, cache key identity and route
//! precedence over generated inputs.

use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use crate::cache::{Entry, ResetTarget, TtlStore, WatcherState};
use crate::key::{build_cache_key, CacheKeyRequest};
use crate::routes::{IncludeRoutes, RoutePattern, RoutePatterns};

// == Test Configuration ==
const TEST_TTL: Duration = Duration::from_secs(300);

/// Runs `f` inside a runtime context so the store can spawn its watcher.
fn with_runtime<F: FnOnce()>(f: F) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();
    let _guard = rt.enter();
    f();
}

// == Strategies ==
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-e]{1,2}".prop_map(|s| s)
}

fn payload_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,16}".prop_map(Value::from),
        prop::collection::btree_map("[a-z]{1,4}", any::<i32>(), 0..4)
            .prop_map(|m| json!(m)),
    ]
}

fn object_strategy() -> impl Strategy<Value = Value> {
    prop::collection::btree_map("[a-z]{1,6}", "[a-z0-9]{0,6}", 1..5).prop_map(|m: BTreeMap<String, String>| json!(m))
}

fn route_strategy() -> impl Strategy<Value = String> {
    "(/[a-z]{1,5}){1,3}".prop_map(|s| s)
}

#[derive(Debug, Clone)]
enum StoreOp {
    Set { key: String, payload: Value },
    Reset { keys: Vec<String> },
    ResetAll,
}

fn store_op_strategy() -> impl Strategy<Value = StoreOp> {
    prop_oneof![
        4 => (key_strategy(), payload_strategy())
            .prop_map(|(key, payload)| StoreOp::Set { key, payload }),
        2 => prop::collection::vec(key_strategy(), 1..3)
            .prop_map(|keys| StoreOp::Reset { keys }),
        1 => Just(StoreOp::ResetAll),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Any sequence of writes and resets leaves the store agreeing with a plain
    // map model, with the watcher armed exactly while entries exist.
    #[test]
    fn prop_store_matches_model(ops in prop::collection::vec(store_op_strategy(), 1..40)) {
        with_runtime(|| {
            let store = TtlStore::new(TEST_TTL);
            let mut model: HashMap<String, Value> = HashMap::new();

            for op in ops {
                match op {
                    StoreOp::Set { key, payload } => {
                        store.set(key.clone(), Entry::new(payload.clone()));
                        model.insert(key, payload);
                    }
                    StoreOp::Reset { keys } => {
                        for key in &keys {
                            model.remove(key);
                        }
                        store.reset(keys);
                    }
                    StoreOp::ResetAll => {
                        store.reset(ResetTarget::All);
                        model.clear();
                    }
                }

                assert_eq!(store.len(), model.len());
                for (key, payload) in &model {
                    assert_eq!(store.get(key).map(|e| e.payload), Some(payload.clone()));
                    assert!(store.meta(key).is_some());
                }
                match store.watcher_state() {
                    WatcherState::Idle => assert!(model.is_empty()),
                    WatcherState::Armed { key, .. } => assert!(model.contains_key(&key)),
                }
            }
        });
    }

    // The last write to a key wins.
    #[test]
    fn prop_overwrite_semantics(
        key in key_strategy(),
        first in payload_strategy(),
        second in payload_strategy()
    ) {
        with_runtime(|| {
            let store = TtlStore::new(TEST_TTL);
            store.set(key.clone(), Entry::new(first));
            store.set(key.clone(), Entry::new(second.clone()));

            assert_eq!(store.get(&key).map(|e| e.payload), Some(second));
            assert_eq!(store.len(), 1);
        });
    }

    // Resetting everything twice is the same as resetting once.
    #[test]
    fn prop_reset_all_idempotent(keys in prop::collection::vec(key_strategy(), 0..10)) {
        with_runtime(|| {
            let store = TtlStore::new(TEST_TTL);
            for key in &keys {
                store.set(key.as_str(), Entry::new(json!(1)));
            }

            store.reset(ResetTarget::All);
            store.reset(ResetTarget::All);
            assert!(store.is_empty());
            assert_eq!(store.watcher_state(), WatcherState::Idle);
            for key in &keys {
                assert!(!store.has(key));
            }
        });
    }

    // The key depends on the payload value, never on whether it came in the
    // body or the query.
    #[test]
    fn prop_body_and_query_equivalent(url in route_strategy(), value in object_strategy()) {
        let from_body = build_cache_key(&CacheKeyRequest::new(&url, "GET").body(&value));
        let from_query = build_cache_key(&CacheKeyRequest::new(&url, "GET").query(&value));
        prop_assert_eq!(from_body, from_query);
    }

    #[test]
    fn prop_distinct_bodies_distinct_keys(
        url in route_strategy(),
        first in object_strategy(),
        second in object_strategy()
    ) {
        prop_assume!(first != second);
        let a = build_cache_key(&CacheKeyRequest::new(&url, "POST").body(&first));
        let b = build_cache_key(&CacheKeyRequest::new(&url, "POST").body(&second));
        prop_assert_ne!(a, b);
    }

    // A pattern without wildcards matches exactly its own text.
    #[test]
    fn prop_literal_pattern_matches_only_itself(route in "[ -)+-~]{0,24}", suffix in "[a-z]{1,3}") {
        let pattern = RoutePattern::new(&route).unwrap();
        prop_assert!(pattern.is_match(&route));
        let longer = format!("{}{}", route, suffix);
        prop_assert!(!pattern.is_match(&longer));
    }

    // An excluded route is never cacheable, whatever the include set.
    #[test]
    fn prop_exclude_always_wins(route in route_strategy(), include_all in any::<bool>()) {
        let include = if include_all {
            IncludeRoutes::All
        } else {
            IncludeRoutes::Only(vec![route.clone(), "/*".to_string()])
        };
        let patterns = RoutePatterns::compile(&include, &[route.clone()]).unwrap();
        prop_assert!(!patterns.allows(&route));
    }

    // With the match-all sentinel every non-excluded route is cacheable.
    #[test]
    fn prop_match_all_allows_unexcluded(route in route_strategy()) {
        let patterns = RoutePatterns::compile(&IncludeRoutes::All, &["/health".to_string()]).unwrap();
        prop_assert_eq!(patterns.allows(&route), route != "/health");
    }
}
