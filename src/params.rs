//! Parameter binding.
//!
//! Turns a matched request into the [`BoundCall`] a handler receives, reading
//! each declared parameter from its location, validating the body against its
//! precompiled schema and enforcing `required`.

use crate::error::ParameterError;
use crate::ids::RequestId;
use crate::router::ParamVec;
use crate::server::{FieldVec, Request};
use crate::spec::{OperationSpec, ParameterLocation, ParameterSpec};
use serde_json::{Map, Value};
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::{debug, info};

/// Arguments for one handler invocation, keyed by parameter name in
/// declaration order. Built fresh per request and moved into the handler.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundCall {
    operation_id: Arc<str>,
    request_id: RequestId,
    values: SmallVec<[(Arc<str>, Value); 8]>,
}

impl BoundCall {
    #[must_use]
    pub fn new(operation_id: impl Into<Arc<str>>, request_id: RequestId) -> Self {
        Self {
            operation_id: operation_id.into(),
            request_id,
            values: SmallVec::new(),
        }
    }

    /// Add or replace a value; handy for calling handlers directly in tests.
    #[must_use]
    pub fn with(mut self, name: &str, value: Value) -> Self {
        self.insert(Arc::from(name), value);
        self
    }

    pub(crate) fn insert(&mut self, name: Arc<str>, value: Value) {
        if let Some(slot) = self.values.iter_mut().find(|(k, _)| *k == name) {
            slot.1 = value;
        } else {
            self.values.push((name, value));
        }
    }

    #[must_use]
    pub fn operation_id(&self) -> &str {
        &self.operation_id
    }

    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Bound value; `Value::Null` for an optional parameter that was absent.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v)
    }

    /// Bound value as a string, if it is one.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Move a value out, leaving `Value::Null` behind.
    pub fn take(&mut self, name: &str) -> Option<Value> {
        self.values
            .iter_mut()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.take())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_ref(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.values
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }
}

/// Truthiness: absent and "falsy" values count as missing.
#[must_use]
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Bind every parameter of `operation`, in declaration order.
///
/// The first failing parameter aborts binding. A body is schema-checked
/// before the required check, so a malformed body is reported as such rather
/// than as missing.
pub fn bind(
    operation: &OperationSpec,
    path_params: &ParamVec,
    request: &Request,
    request_id: RequestId,
) -> Result<BoundCall, ParameterError> {
    let mut call = BoundCall::new(Arc::clone(&operation.operation_id), request_id);
    let mut form: Option<FieldVec> = None;

    for param in &operation.parameters {
        let value = match param.location {
            ParameterLocation::Query => string_or_null(request.query_param(&param.name)),
            ParameterLocation::Path => string_or_null(
                path_params
                    .iter()
                    .rev()
                    .find(|(k, _)| *k == param.name)
                    .map(|(_, v)| v.as_str()),
            ),
            ParameterLocation::Header => string_or_null(request.header(&param.name)),
            ParameterLocation::FormData => {
                let fields = form.get_or_insert_with(|| request.form_fields());
                string_or_null(
                    fields
                        .iter()
                        .rev()
                        .find(|(k, _)| k.as_str() == param.name.as_ref())
                        .map(|(_, v)| v.as_str()),
                )
            }
            ParameterLocation::Environment => {
                string_or_null(request.env_var(&param.name.to_uppercase()))
            }
            ParameterLocation::Body => bind_body(operation, param, request)?,
        };

        if param.required && is_empty_value(&value) {
            info!(
                operation_id = %operation.operation_id,
                parameter = %param.name,
                location = %param.location,
                "Required parameter is missing"
            );
            return Err(ParameterError::Missing {
                name: param.name.to_string(),
            });
        }
        call.insert(Arc::clone(&param.name), value);
    }

    debug!(
        operation_id = %operation.operation_id,
        bound = call.len(),
        "Parameters bound"
    );
    Ok(call)
}

fn string_or_null(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |s| Value::String(s.to_string()))
}

fn bind_body(
    operation: &OperationSpec,
    param: &ParameterSpec,
    request: &Request,
) -> Result<Value, ParameterError> {
    let value = match request.json_body() {
        Some(Ok(value)) => value,
        Some(Err(e)) => {
            info!(
                operation_id = %operation.operation_id,
                parameter = %param.name,
                error = %e,
                "Request body is not valid JSON"
            );
            return Err(ParameterError::InvalidBody {
                name: param.name.to_string(),
                message: format!("Failed to parse request body as JSON: {e}"),
                detail: e.to_string(),
            });
        }
        // Nothing to validate for an optional body that was not sent
        None if !param.required => return Ok(Value::Null),
        None => Value::Null,
    };

    if let Some(schema) = &param.schema {
        if let Err(errors) = schema.validate(&value) {
            info!(
                operation_id = %operation.operation_id,
                parameter = %param.name,
                violations = errors.len(),
                "Request body failed schema validation"
            );
            let message = errors
                .first()
                .cloned()
                .unwrap_or_else(|| "Request body is invalid".to_string());
            let detail = errors
                .iter()
                .map(|e| format!("- {e}"))
                .collect::<Vec<_>>()
                .join("\n");
            return Err(ParameterError::InvalidBody {
                name: param.name.to_string(),
                message,
                detail,
            });
        }
    }
    Ok(value)
}
