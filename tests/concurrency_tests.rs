#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Many threads dispatching through one shared router.

mod common;

use common::fixtures::{vars, ITEMS_SPEC};
use common::handlers::items_registry;
use serde_json::json;
use specrouter::router::RouterOptions;
use specrouter::{Request, RouterHandle, SpecSource};
use std::collections::HashSet;
use std::sync::Arc;

const THREADS: usize = 8;
const REQUESTS_PER_THREAD: usize = 50;

fn handle() -> Arc<RouterHandle> {
    let source = SpecSource::inline(ITEMS_SPEC, vars("/v1"));
    Arc::new(RouterHandle::new(source, items_registry(), RouterOptions::default()).unwrap())
}

#[test]
fn test_concurrent_requests_get_their_own_parameters() {
    let handle = handle();
    std::thread::scope(|s| {
        for t in 0..THREADS {
            let handle = Arc::clone(&handle);
            s.spawn(move || {
                for i in 0..REQUESTS_PER_THREAD {
                    let id = format!("{t}-{i}");
                    let resp = handle.handle(&Request::get(&format!("/v1/items/{id}?verbose={t}")));
                    assert_eq!(resp.status, 200);
                    let body = resp.body.unwrap();
                    assert_eq!(body["params"]["id"], json!(id));
                    assert_eq!(body["params"]["verbose"], json!(t.to_string()));
                }
            });
        }
    });
}

#[test]
fn test_concurrent_requests_across_routes() {
    let handle = handle();
    let targets: Vec<(http::Method, String, &str)> = vec![
        (http::Method::GET, "/v1/items".to_string(), "tests.items:list_items"),
        (http::Method::GET, "/items/1".to_string(), "tests.items:get_item"),
        (http::Method::DELETE, "/v1/items/2".to_string(), "tests.items:delete_item"),
        (http::Method::GET, "/v1/items/special".to_string(), "tests.items:special_item"),
    ];

    let seen: Vec<String> = std::thread::scope(|s| {
        let workers: Vec<_> = targets
            .iter()
            .map(|(method, path, expected)| {
                let handle = Arc::clone(&handle);
                s.spawn(move || {
                    let mut ids = Vec::new();
                    for _ in 0..REQUESTS_PER_THREAD {
                        let resp = handle.handle(&Request::new(method.clone(), path));
                        assert_eq!(resp.body.as_ref().unwrap()["operation_id"], *expected);
                        ids.push(resp.get_header("x-request-id").unwrap().to_string());
                    }
                    ids
                })
            })
            .collect();
        workers.into_iter().flat_map(|w| w.join().unwrap()).collect()
    });

    let unique: HashSet<&String> = seen.iter().collect();
    assert_eq!(unique.len(), targets.len() * REQUESTS_PER_THREAD);
}
