#![allow(clippy::unwrap_used, clippy::expect_used)]
//! End-to-end dispatch: route matching, binding, handler invocation and
//! error translation through a [`Dispatcher`].

mod common;

use common::fixtures::{vars, ITEMS_SPEC};
use common::handlers::{echo, items_registry};
use serde_json::{json, Value};
use specrouter::error::{DispatchError, HttpError, RouteBuildError, SpecLoadError};
use specrouter::registry::OperationRegistry;
use specrouter::router::RouterOptions;
use specrouter::spec::load_spec_str;
use specrouter::{BoundCall, Dispatcher, HandlerResult, Request, RequestId, Response};

fn dispatcher_with(registry: &OperationRegistry, options: RouterOptions) -> Dispatcher {
    let doc = load_spec_str(ITEMS_SPEC, &vars("/v1")).unwrap();
    Dispatcher::from_spec(&doc, registry, options).unwrap()
}

fn dispatcher() -> Dispatcher {
    dispatcher_with(&items_registry(), RouterOptions::default())
}

fn body(resp: &Response) -> &Value {
    resp.body.as_ref().unwrap()
}

#[test]
fn test_get_item_binds_path_and_query() {
    let resp = dispatcher().handle(&Request::get("/v1/items/42?verbose=true&unused=1"));
    assert_eq!(resp.status, 200);
    assert_eq!(
        body(&resp),
        &json!({
            "operation_id": "tests.items:get_item",
            "params": {"id": "42", "verbose": "true", "remote_user": null},
        })
    );
}

#[test]
fn test_query_string_does_not_affect_path_binding() {
    let d = dispatcher();
    for target in ["/v1/items/42", "/v1/items/42?", "/v1/items/42?id=7", "/items/42?x=y"] {
        let resp = d.handle(&Request::get(target));
        assert_eq!(resp.status, 200, "{target}");
        assert_eq!(body(&resp)["params"]["id"], "42", "{target}");
    }
}

#[test]
fn test_base_path_and_bare_mount_are_equivalent() {
    let d = dispatcher();
    let requests = [
        Request::get("/items"),
        Request::get("/items/7"),
        Request::get("/items/special"),
        Request::new(http::Method::DELETE, "/items/7"),
        Request::post("/items")
            .with_header("X-Tenant", "acme")
            .with_json(&json!({"name": "widget"})),
        Request::post("/items").with_json(&json!({"name": ""})),
        Request::get("/nothing/here"),
    ];
    for bare in requests {
        let mut prefixed = bare.clone();
        prefixed.path = format!("/v1{}", bare.path);
        let a = d.handle(&bare);
        let b = d.handle(&prefixed);
        assert_eq!(a.status, b.status, "{}", bare.path);
        assert_eq!(a.body, b.body, "{}", bare.path);
    }
}

#[test]
fn test_static_segment_wins_over_variable() {
    let resp = dispatcher().handle(&Request::get("/v1/items/special"));
    assert_eq!(body(&resp)["operation_id"], "tests.items:special_item");
}

#[test]
fn test_environment_parameter() {
    let resp = dispatcher().handle(&Request::get("/v1/items/1").with_env("REMOTE_USER", "alice"));
    assert_eq!(body(&resp)["params"]["remote_user"], "alice");
}

#[test]
fn test_post_with_valid_body() {
    let resp = dispatcher().handle(
        &Request::post("/v1/items")
            .with_header("x-tenant", "acme")
            .with_json(&json!({"name": "widget", "quantity": 2})),
    );
    assert_eq!(resp.status, 200);
    assert_eq!(body(&resp)["params"]["item"], json!({"name": "widget", "quantity": 2}));
    assert_eq!(body(&resp)["params"]["x-tenant"], "acme");
}

#[test]
fn test_missing_required_header_is_400() {
    let resp = dispatcher().handle(&Request::post("/v1/items").with_json(&json!({"name": "w"})));
    assert_eq!(resp.status, 400);
    assert_eq!(body(&resp)["faultstring"], "Required parameter \"x-tenant\" is missing");
    assert_eq!(body(&resp)["debug_info"], Value::Null);
}

#[test]
fn test_missing_required_body_is_400() {
    let resp = dispatcher().handle(&Request::post("/v1/items").with_header("x-tenant", "acme"));
    assert_eq!(resp.status, 400);
}

#[test]
fn test_schema_violation_is_400_with_diagnostic_in_debug() {
    let d = dispatcher_with(
        &items_registry(),
        RouterOptions {
            debug: true,
            ..RouterOptions::default()
        },
    );
    let resp = d.handle(
        &Request::post("/v1/items")
            .with_header("x-tenant", "acme")
            .with_json(&json!({"name": "w", "quantity": -3, "colour": "red"})),
    );
    assert_eq!(resp.status, 400);
    let debug_info = body(&resp)["debug_info"].as_str().unwrap();
    assert!(debug_info.lines().count() >= 2, "{debug_info}");
    assert!(debug_info.lines().all(|l| l.starts_with("- ")));
}

#[test]
fn test_malformed_json_body_is_400() {
    let resp = dispatcher().handle(
        &Request::post("/v1/items")
            .with_header("x-tenant", "acme")
            .with_header("Content-Type", "application/json")
            .with_body("{not json"),
    );
    assert_eq!(resp.status, 400);
    assert!(body(&resp)["faultstring"]
        .as_str()
        .unwrap()
        .starts_with("Failed to parse request body as JSON"));
}

#[test]
fn test_unknown_path_and_method_are_404() {
    let d = dispatcher();
    for req in [
        Request::get("/v1/unknown"),
        Request::get("/v2/items"),
        Request::new(http::Method::PUT, "/v1/items/1"),
        Request::new(http::Method::PATCH, "/items"),
    ] {
        let resp = d.handle(&req);
        assert_eq!(resp.status, 404, "{} {}", req.method, req.path);
        assert_eq!(body(&resp)["faultstring"], "The resource could not be found.");
    }
}

#[test]
fn test_method_not_allowed_when_enabled() {
    let d = dispatcher_with(
        &items_registry(),
        RouterOptions {
            distinguish_method_not_allowed: true,
            ..RouterOptions::default()
        },
    );
    let resp = d.handle(&Request::new(http::Method::PUT, "/v1/items/1"));
    assert_eq!(resp.status, 405);
    assert_eq!(resp.get_header("allow"), Some("GET, DELETE"));
    assert_eq!(d.handle(&Request::get("/v1/nope")).status, 404);
}

#[test]
fn test_none_response_is_204() {
    let mut registry = items_registry();
    registry.register("tests.items:delete_item", |_call: BoundCall| -> HandlerResult { Ok(None) });
    let resp = dispatcher_with(&registry, RouterOptions::default())
        .handle(&Request::new(http::Method::DELETE, "/v1/items/9"));
    assert_eq!(resp.status, 204);
    assert!(resp.body.is_none());
}

#[test]
fn test_handler_http_error_keeps_status_and_headers() {
    let mut registry = items_registry();
    registry.register("tests.items:get_item", |call: BoundCall| -> HandlerResult {
        Err(HttpError::new(409, format!("item {} is locked", call.get_str("id").unwrap_or("?")))
            .with_header("Retry-After", "5")
            .into())
    });
    let resp = dispatcher_with(&registry, RouterOptions::default()).handle(&Request::get("/v1/items/3"));
    assert_eq!(resp.status, 409);
    assert_eq!(body(&resp)["faultstring"], "item 3 is locked");
    assert_eq!(resp.get_header("retry-after"), Some("5"));
}

#[test]
fn test_internal_errors_are_masked_without_debug() {
    let mut registry = items_registry();
    registry.register("tests.items:list_items", |_call: BoundCall| -> HandlerResult {
        Err(anyhow::anyhow!("database password rejected").into())
    });
    let resp = dispatcher_with(&registry, RouterOptions::default()).handle(&Request::get("/v1/items"));
    assert_eq!(resp.status, 500);
    assert_eq!(body(&resp)["faultstring"], "Internal Server Error");
    assert_eq!(body(&resp)["debug_info"], Value::Null);
}

#[test]
fn test_handler_panic_is_contained() {
    let mut registry = items_registry();
    registry.register("tests.items:list_items", |_call: BoundCall| -> HandlerResult {
        panic!("boom")
    });
    let d = dispatcher_with(
        &registry,
        RouterOptions {
            debug: true,
            ..RouterOptions::default()
        },
    );
    let resp = d.handle(&Request::get("/v1/items"));
    assert_eq!(resp.status, 500);
    assert_eq!(body(&resp)["debug_info"], "boom");

    // The dispatcher keeps serving other routes
    assert_eq!(d.handle(&Request::get("/v1/items/1")).status, 200);
}

#[test]
fn test_strict_handlers_reject_unregistered_operations() {
    let doc = load_spec_str(ITEMS_SPEC, &vars("/v1")).unwrap();
    let mut registry = OperationRegistry::new();
    registry.register("tests.items:list_items", echo);
    let err = Dispatcher::from_spec(&doc, &registry, RouterOptions::default()).unwrap_err();
    assert!(matches!(err, RouteBuildError::UnresolvedHandler { .. }));

    let lenient = Dispatcher::from_spec(
        &doc,
        &registry,
        RouterOptions {
            strict_handlers: false,
            ..RouterOptions::default()
        },
    )
    .unwrap();
    assert_eq!(lenient.handle(&Request::get("/v1/items")).status, 200);
    let err = lenient
        .dispatch_with_request_id(&Request::get("/v1/items/1"), RequestId::new())
        .unwrap_err();
    assert!(matches!(err, DispatchError::Resolution(_)));
    assert_eq!(err.status(), 500);
}

#[test]
fn test_request_id_is_echoed() {
    let d = dispatcher();
    let id = RequestId::new().to_string();
    let resp = d.handle(&Request::get("/v1/items").with_header("X-Request-Id", id.clone()));
    assert_eq!(resp.get_header("x-request-id"), Some(id.as_str()));

    let generated = d.handle(&Request::get("/v1/nowhere"));
    assert!(generated.get_header("x-request-id").is_some());
}

#[test]
fn test_parameter_declared_in_two_locations_never_reaches_dispatch() {
    let shadowed = r#"
swagger: "2.0"
info: { title: Shadow, version: "1" }
basePath: "{{ base_path }}"
paths:
  /items/{id}:
    get:
      operationId: tests.items:get_item
      parameters:
        - { name: id, in: path, required: true, type: string }
        - { name: id, in: query, type: string }
      responses: { "200": { description: ok } }
"#;
    let err = load_spec_str(shadowed, &vars("/v1")).unwrap_err();
    assert!(
        matches!(
            &err,
            SpecLoadError::Invalid(issues) if issues.iter().any(|i| i.kind == "DuplicateParameter")
        ),
        "{err}"
    );

    // the well-formed description keeps the path value even when the query
    // string carries the same name
    let resp = dispatcher().handle(&Request::get("/v1/items/42?id=7"));
    assert_eq!(body(&resp)["params"]["id"], "42");
}

#[test]
fn test_empty_path_segments_are_not_found() {
    let d = dispatcher();
    for target in ["//items//42", "/items/42/", "/v1/items//42"] {
        let resp = d.handle(&Request::get(target));
        assert_eq!(resp.status, 404, "{target}");
    }
    assert_eq!(d.handle(&Request::get("/v1/items/42")).status, 200);
}
