#![allow(dead_code)]

pub mod temp_files {
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Write `content` to a fresh temporary file ending in `.{ext}`.
    ///
    /// The file is removed when the returned handle is dropped.
    pub fn create_temp_spec(content: &str, ext: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .prefix("specrouter_test_")
            .suffix(&format!(".{ext}"))
            .tempfile()
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    pub fn create_temp_yaml(content: &str) -> NamedTempFile {
        create_temp_spec(content, "yaml")
    }

    pub fn create_temp_json(content: &str) -> NamedTempFile {
        create_temp_spec(content, "json")
    }

    /// Replace the contents of an existing temp file in place.
    pub fn rewrite(file: &NamedTempFile, content: &str) {
        std::fs::write(file.path(), content).unwrap();
    }
}

pub mod fixtures {
    use specrouter::spec::TemplateVars;

    /// Item API used across the integration tests.
    ///
    /// Rendered with `base_path`; `GET /items/{id}` and `POST /items` carry
    /// a query, a header, an environment and a schema-checked body parameter
    /// between them.
    pub const ITEMS_SPEC: &str = r#"
swagger: '2.0'
info:
  title: Items
  version: '1.0'
basePath: {{ base_path }}
paths:
  /items:
    get:
      operationId: tests.items:list_items
      parameters:
        - name: limit
          in: query
          type: integer
      responses:
        '200': {description: ok}
    post:
      operationId: tests.items:create_item
      parameters:
        - name: item
          in: body
          required: true
          schema:
            $ref: '#/definitions/Item'
        - name: x-tenant
          in: header
          type: string
          required: true
      responses:
        '201': {description: created}
  /items/{id}:
    parameters:
      - name: id
        in: path
        required: true
        type: string
    get:
      operationId: tests.items:get_item
      parameters:
        - name: verbose
          in: query
          type: boolean
      x-parameters:
        - name: remote_user
          in: environ
          type: string
      responses:
        '200': {description: ok}
    delete:
      operationId: tests.items:delete_item
      responses:
        '204': {description: deleted}
  /items/special:
    get:
      operationId: tests.items:special_item
      responses:
        '200': {description: ok}
definitions:
  Item:
    type: object
    required: [name]
    properties:
      name:
        type: string
        minLength: 1
      quantity:
        type: integer
        minimum: 0
    additionalProperties: false
"#;

    pub fn vars(base_path: &str) -> TemplateVars {
        let mut vars = TemplateVars::new();
        vars.insert(
            "base_path".to_string(),
            serde_json::Value::String(base_path.to_string()),
        );
        vars
    }
}

pub mod handlers {
    use serde_json::{json, Value};
    use specrouter::registry::OperationRegistry;
    use specrouter::{BoundCall, Response};

    /// Echo the operation and every bound parameter back as JSON.
    pub fn echo(call: BoundCall) -> specrouter::HandlerResult {
        let operation_id = call.operation_id().to_string();
        let params = Value::Object(call.into_map());
        Ok(Some(Response::ok(json!({
            "operation_id": operation_id,
            "params": params,
        }))))
    }

    /// A registry answering every items operation with [`echo`].
    pub fn items_registry() -> OperationRegistry {
        let mut registry = OperationRegistry::new();
        for op in [
            "tests.items:list_items",
            "tests.items:create_item",
            "tests.items:get_item",
            "tests.items:delete_item",
            "tests.items:special_item",
        ] {
            registry.register(op, echo);
        }
        registry
    }
}
