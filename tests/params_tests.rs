#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Parameter binding against operations built from a real document.

use serde_json::{json, Value};
use specrouter::error::ParameterError;
use specrouter::params::bind;
use specrouter::router::{RouteTable, RouterOptions};
use specrouter::spec::{load_spec_str, TemplateVars};
use specrouter::{BoundCall, Request, RequestId};

const FORMS_SPEC: &str = r#"
swagger: '2.0'
info: {title: forms, version: '1'}
paths:
  /users/{user_id}/notes:
    post:
      operationId: tests.notes:create
      consumes: [application/x-www-form-urlencoded]
      parameters:
        - {name: user_id, in: path, required: true, type: string}
        - {name: title, in: formData, required: true, type: string}
        - {name: tags, in: formData, type: string}
        - {name: draft, in: query, type: boolean}
        - {name: X-Trace, in: header, type: string}
      x-parameters:
        - {name: home, in: environ, type: string}
      responses:
        '201': {description: created}
  /users/{user_id}/settings:
    put:
      operationId: tests.settings:replace
      parameters:
        - {name: user_id, in: path, required: true, type: string}
        - name: settings
          in: body
          schema:
            type: object
            properties:
              theme: {type: string, enum: [light, dark]}
      responses:
        '200': {description: ok}
"#;

fn bind_request(request: &Request) -> Result<BoundCall, ParameterError> {
    let doc = load_spec_str(FORMS_SPEC, &TemplateVars::new()).unwrap();
    let table = RouteTable::build(&doc, &RouterOptions::default()).unwrap();
    let matched = table.route(&request.method, &request.path).unwrap();
    bind(matched.operation(), &matched.path_params, request, RequestId::new())
}

#[test]
fn test_form_query_header_and_environment() {
    let request = Request::post("/users/u%201/notes?draft=1")
        .with_form(&[("title", "hello world"), ("tags", "a,b"), ("title", "second")])
        .with_header("x-trace", "abc")
        .with_env("HOME", "/home/u1");
    let call = bind_request(&request).unwrap();

    assert_eq!(call.operation_id(), "tests.notes:create");
    assert_eq!(call.get_str("user_id"), Some("u 1"));
    // last occurrence of a repeated form field wins
    assert_eq!(call.get_str("title"), Some("second"));
    assert_eq!(call.get_str("tags"), Some("a,b"));
    assert_eq!(call.get_str("draft"), Some("1"));
    assert_eq!(call.get_str("X-Trace"), Some("abc"));
    assert_eq!(call.get_str("home"), Some("/home/u1"));
}

#[test]
fn test_every_declared_parameter_is_bound() {
    let call = bind_request(&Request::post("/users/7/notes").with_form(&[("title", "t")])).unwrap();
    let names: Vec<&str> = call.iter().map(|(k, _)| k).collect();
    assert_eq!(names, vec!["user_id", "title", "tags", "draft", "X-Trace", "home"]);
    assert_eq!(call.get("tags"), Some(&Value::Null));
}

#[test]
fn test_empty_required_form_field_is_missing() {
    let err = bind_request(&Request::post("/users/7/notes").with_form(&[("title", "")])).unwrap_err();
    assert_eq!(err, ParameterError::Missing { name: "title".into() });
    assert_eq!(err.to_string(), "Required parameter \"title\" is missing");
}

#[test]
fn test_form_fields_need_form_content_type() {
    let request = Request::post("/users/7/notes")
        .with_header("Content-Type", "text/plain")
        .with_body("title=ignored");
    assert_eq!(bind_request(&request).unwrap_err().parameter(), "title");
}

#[test]
fn test_optional_body() {
    let put = |req: Request| {
        let mut req = req;
        req.method = http::Method::PUT;
        bind_request(&req)
    };

    let absent = put(Request::post("/users/7/settings")).unwrap();
    assert_eq!(absent.get("settings"), Some(&Value::Null));

    let ok = put(Request::post("/users/7/settings").with_json(&json!({"theme": "dark"}))).unwrap();
    assert_eq!(ok.get("settings"), Some(&json!({"theme": "dark"})));

    let err = put(Request::post("/users/7/settings").with_json(&json!({"theme": "neon"}))).unwrap_err();
    match err {
        ParameterError::InvalidBody { name, detail, .. } => {
            assert_eq!(name, "settings");
            assert!(detail.starts_with("- "));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_bound_call_can_be_consumed() {
    let mut call = bind_request(&Request::post("/users/9/notes").with_form(&[("title", "t")])).unwrap();
    assert_eq!(call.take("title"), Some(json!("t")));
    assert!(call.contains("title"));
    let map = call.into_map();
    assert_eq!(map["user_id"], "9");
}
