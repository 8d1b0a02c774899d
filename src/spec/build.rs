use super::resolver::SchemaResolver;
use super::types::{
    parse_path_pattern, BodySchema, OperationSpec, ParameterLocation, ParameterSpec, SpecDocument,
    HTTP_METHODS,
};
use crate::error::RouteBuildError;
use http::Method;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Flatten the document into one [`OperationSpec`] per path + method, in
/// document order.
///
/// Body schemas are dereferenced and compiled here, so a schema problem
/// surfaces at startup rather than on the first request.
pub fn build_operations(doc: &SpecDocument) -> Result<Vec<OperationSpec>, RouteBuildError> {
    let resolver = doc.resolver();
    let mut operations = Vec::new();

    for (path, item) in doc.paths() {
        parse_path_pattern(path).map_err(|reason| RouteBuildError::InvalidPattern {
            pattern: path.to_string(),
            reason,
        })?;
        let shared = item
            .get("parameters")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        for (key, op) in item {
            let lowered = key.to_ascii_lowercase();
            if !HTTP_METHODS.contains(&lowered.as_str()) {
                continue;
            }
            let method = Method::from_bytes(lowered.to_ascii_uppercase().as_bytes()).map_err(|_| {
                RouteBuildError::InvalidPattern {
                    pattern: path.to_string(),
                    reason: format!("unsupported method '{key}'"),
                }
            })?;
            let operation_id: Arc<str> = match op.get("operationId").and_then(Value::as_str) {
                Some(id) if !id.trim().is_empty() => Arc::from(id.trim()),
                _ => {
                    return Err(RouteBuildError::MissingOperationId {
                        method,
                        pattern: path.to_string(),
                    })
                }
            };

            let own = op
                .get("parameters")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            let ext = op
                .get("x-parameters")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();

            // (parameter, declared on the path item)
            let mut merged: Vec<(ParameterSpec, bool)> = Vec::new();
            let declarations = shared
                .iter()
                .map(|raw| (raw, true, false))
                .chain(own.iter().map(|raw| (raw, false, false)))
                .chain(ext.iter().map(|raw| (raw, false, true)));
            for (raw, path_level, extension) in declarations {
                let param = build_parameter(resolver, &operation_id, raw, extension)?;
                match merged.iter_mut().find(|(p, _)| p.name == param.name) {
                    None => merged.push((param, path_level)),
                    // an operation-level declaration replaces the path-level one
                    Some(slot) if slot.1 && !path_level && !extension && slot.0.location == param.location => {
                        *slot = (param, false);
                    }
                    Some((existing, _)) => {
                        return Err(RouteBuildError::InvalidParameter {
                            operation_id: operation_id.to_string(),
                            name: param.name.to_string(),
                            reason: format!(
                                "declared in {} and again in {}",
                                existing.location, param.location
                            ),
                        });
                    }
                }
            }
            let parameters: Vec<ParameterSpec> = merged.into_iter().map(|(p, _)| p).collect();

            debug!(
                method = %method,
                path = %path,
                operation_id = %operation_id,
                parameters = parameters.len(),
                "Built operation"
            );

            operations.push(OperationSpec {
                operation_id,
                method,
                path_pattern: Arc::from(path),
                summary: op.get("summary").and_then(Value::as_str).map(str::to_string),
                parameters,
            });
        }
    }

    Ok(operations)
}

fn build_parameter(
    resolver: &SchemaResolver,
    operation_id: &str,
    raw: &Value,
    extension: bool,
) -> Result<ParameterSpec, RouteBuildError> {
    let invalid = |name: &str, reason: String| RouteBuildError::InvalidParameter {
        operation_id: operation_id.to_string(),
        name: name.to_string(),
        reason,
    };

    let param = resolver.follow(raw).map_err(|e| invalid("?", e.to_string()))?;
    let name = param
        .get("name")
        .and_then(Value::as_str)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| invalid("?", "parameter has no name".to_string()))?;
    let loc = param.get("in").and_then(Value::as_str).unwrap_or_default();
    let location = ParameterLocation::parse(loc)
        .ok_or_else(|| invalid(name, format!("unknown location '{loc}'")))?;
    let required = param
        .get("required")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let schema = if location == ParameterLocation::Body {
        let raw_schema = param
            .get("schema")
            .ok_or_else(|| invalid(name, "body parameter has no schema".to_string()))?;
        let schema_error = |message: String| RouteBuildError::Schema {
            operation_id: operation_id.to_string(),
            parameter: name.to_string(),
            message,
        };
        let resolved = resolver
            .deref_schema(raw_schema)
            .map_err(|e| schema_error(e.to_string()))?;
        Some(BodySchema::compile(resolved).map_err(schema_error)?)
    } else {
        None
    };

    Ok(ParameterSpec {
        name: Arc::from(name),
        location,
        required,
        schema,
        extension,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{load_spec_from_value, SpecVersion};
    use serde_json::json;

    #[test]
    fn test_parameters_merge_and_order() {
        let doc = load_spec_from_value(json!({
            "swagger": "2.0",
            "info": { "title": "t", "version": "1" },
            "definitions": { "Payload": { "type": "object", "required": ["name"] } },
            "paths": {
                "/items/{id}": {
                    "parameters": [
                        { "name": "id", "in": "path", "required": true, "type": "string" },
                        { "name": "verbose", "in": "query", "type": "boolean" }
                    ],
                    "put": {
                        "operationId": "items:put",
                        "parameters": [
                            { "name": "verbose", "in": "query", "required": true, "type": "boolean" },
                            { "name": "payload", "in": "body", "required": true,
                              "schema": { "$ref": "#/definitions/Payload" } }
                        ],
                        "x-parameters": [{ "name": "remote_user", "in": "environ" }],
                        "responses": { "200": { "description": "ok" } }
                    }
                }
            }
        }))
        .unwrap();

        let ops = build_operations(&doc).unwrap();
        assert_eq!(ops.len(), 1);
        let op = &ops[0];
        assert_eq!(op.method, Method::PUT);
        let names: Vec<&str> = op.parameters.iter().map(|p| p.name.as_ref()).collect();
        assert_eq!(names, vec!["id", "verbose", "payload", "remote_user"]);
        assert!(op.parameter("verbose").unwrap().required);
        let body = op.body_parameter().unwrap();
        assert_eq!(body.schema.as_ref().unwrap().schema()["required"], json!(["name"]));
        assert!(op.parameter("remote_user").unwrap().extension);
    }

    #[test]
    fn test_parameter_names_are_unique_per_operation() {
        // bypasses the validator, which would refuse this document
        let raw = json!({
            "swagger": "2.0",
            "info": { "title": "t", "version": "1" },
            "paths": {
                "/items/{id}": {
                    "get": {
                        "operationId": "items:get",
                        "parameters": [
                            { "name": "id", "in": "path", "required": true, "type": "string" },
                            { "name": "id", "in": "query", "type": "string" }
                        ],
                        "responses": { "200": { "description": "ok" } }
                    }
                }
            }
        });
        let unchecked = SpecDocument::new(raw, SpecVersion::from_content(b"unchecked"));
        let err = build_operations(&unchecked).unwrap_err();
        assert!(matches!(
            err,
            RouteBuildError::InvalidParameter { ref name, .. } if name == "id"
        ));
    }

    #[test]
    fn test_operations_keep_document_order() {
        let doc = load_spec_from_value(json!({
            "swagger": "2.0",
            "info": { "title": "t", "version": "1" },
            "paths": {
                "/b": { "post": { "operationId": "b:post", "responses": { "200": { "description": "ok" } } },
                        "get": { "operationId": "b:get", "responses": { "200": { "description": "ok" } } } },
                "/a": { "get": { "operationId": "a:get", "responses": { "200": { "description": "ok" } } } }
            }
        }))
        .unwrap();
        let ids: Vec<String> = build_operations(&doc)
            .unwrap()
            .iter()
            .map(|o| o.operation_id.to_string())
            .collect();
        assert_eq!(ids, vec!["b:post", "b:get", "a:get"]);
    }
}
