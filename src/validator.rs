//! Structural and semantic validation of API descriptions.
//!
//! A document is checked against a Swagger 2.0 meta-schema first, then for
//! the things the router itself depends on: every operation has an
//! `operationId`, every path variable is declared, parameter names are unique
//! per operation, and every internal `$ref` resolves.

use crate::error::SpecLoadError;
use crate::spec::{parse_path_pattern, resolve_pointer, ParameterLocation, Segment, HTTP_METHODS};
use jsonschema::Validator;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub location: String,
    pub kind: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(
        location: impl Into<String>,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ValidationIssue {
            location: location.into(),
            kind: kind.into(),
            message: message.into(),
        }
    }
}

static META_SCHEMA: Lazy<Result<Validator, String>> = Lazy::new(|| {
    let raw: Value = serde_json::from_str(include_str!("../schema/swagger-2.0.json"))
        .map_err(|e| format!("meta-schema is not valid JSON: {e}"))?;
    jsonschema::options()
        .with_draft(jsonschema::Draft::Draft4)
        .build(&raw)
        .map_err(|e| format!("meta-schema does not compile: {e}"))
});

/// Collect every issue in `doc`. An empty result means the document is usable.
#[must_use]
pub fn validate_document(doc: &Value) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    match &*META_SCHEMA {
        Ok(meta) => {
            for err in meta.iter_errors(doc) {
                issues.push(ValidationIssue::new("document", "MetaSchema", err.to_string()));
            }
        }
        Err(msg) => issues.push(ValidationIssue::new("meta-schema", "Internal", msg.clone())),
    }

    for (at, reference) in crate::spec::collect_refs(doc) {
        if let Err(e) = resolve_pointer(doc, &reference) {
            issues.push(ValidationIssue::new(
                if at.is_empty() { "/".to_string() } else { at },
                "UnresolvedRef",
                e.to_string(),
            ));
        }
    }

    if let Some(paths) = doc.get("paths").and_then(Value::as_object) {
        for (path, item) in paths {
            if path.starts_with("x-") {
                continue;
            }
            if let Some(item) = item.as_object() {
                check_path_item(doc, path, item, &mut issues);
            }
        }
    }

    issues
}

fn check_path_item(
    doc: &Value,
    path: &str,
    item: &serde_json::Map<String, Value>,
    issues: &mut Vec<ValidationIssue>,
) {
    let segments = match parse_path_pattern(path) {
        Ok(segments) => segments,
        Err(reason) => {
            issues.push(ValidationIssue::new(path, "InvalidPath", reason));
            return;
        }
    };
    let shared = item.get("parameters").and_then(Value::as_array);

    for method in HTTP_METHODS {
        let Some(op) = item.get(method) else {
            continue;
        };
        let location = format!("{} {}", method.to_uppercase(), path);

        match op.get("operationId").and_then(Value::as_str) {
            Some(id) if !id.trim().is_empty() => {}
            _ => issues.push(ValidationIssue::new(
                &location,
                "MissingOperationId",
                "operation has no operationId to dispatch to",
            )),
        }

        // name -> (group, location) of the declaration currently in effect
        let mut seen: HashMap<String, (u8, String)> = HashMap::new();
        let mut path_params: HashSet<String> = HashSet::new();
        let mut bodies = 0usize;

        let own = op.get("parameters").and_then(Value::as_array);
        let ext = op.get("x-parameters").and_then(Value::as_array);

        // Names are unique across the whole operation. The only exception is an
        // operation parameter replacing a path-item one with the same name and
        // location.
        let mut check = |raw: &Value, group: u8| {
            let extension = group == 2;
            let param = match raw.get("$ref").and_then(Value::as_str) {
                Some(r) => match resolve_pointer(doc, r) {
                    Ok(p) => p,
                    // already reported by the reference walk
                    Err(_) => return,
                },
                None => raw,
            };
            let name = param.get("name").and_then(Value::as_str).unwrap_or_default();
            let loc = param.get("in").and_then(Value::as_str).unwrap_or_default();
            if name.is_empty() {
                issues.push(ValidationIssue::new(&location, "InvalidParameter", "parameter without a name"));
                return;
            }
            let Some(parsed) = ParameterLocation::parse(loc) else {
                issues.push(ValidationIssue::new(
                    &location,
                    "InvalidParameter",
                    format!("parameter '{name}' has unknown location '{loc}'"),
                ));
                return;
            };
            if parsed == ParameterLocation::Environment && !extension {
                issues.push(ValidationIssue::new(
                    &location,
                    "InvalidParameter",
                    format!("parameter '{name}': environ parameters belong under x-parameters"),
                ));
            }
            match seen.get(name) {
                None => {
                    seen.insert(name.to_string(), (group, loc.to_string()));
                }
                Some((0, prev)) if group == 1 && prev == loc => {
                    seen.insert(name.to_string(), (group, loc.to_string()));
                }
                Some((_, prev)) => {
                    issues.push(ValidationIssue::new(
                        &location,
                        "DuplicateParameter",
                        format!("parameter '{name}' in {loc} is already declared in {prev}"),
                    ));
                    return;
                }
            }
            match parsed {
                ParameterLocation::Path => {
                    path_params.insert(name.to_string());
                }
                ParameterLocation::Body => {
                    bodies += 1;
                    if param.get("schema").is_none() {
                        issues.push(ValidationIssue::new(
                            &location,
                            "MissingSchema",
                            format!("body parameter '{name}' has no schema"),
                        ));
                    }
                }
                _ => {}
            }
        };

        for raw in shared.into_iter().flatten() {
            check(raw, 0);
        }
        for raw in own.into_iter().flatten() {
            check(raw, 1);
        }
        for raw in ext.into_iter().flatten() {
            check(raw, 2);
        }

        if bodies > 1 {
            issues.push(ValidationIssue::new(
                &location,
                "MultipleBodies",
                "at most one body parameter is allowed",
            ));
        }
        for segment in &segments {
            if let Segment::Variable(var) = segment {
                if !path_params.contains(var) {
                    issues.push(ValidationIssue::new(
                        &location,
                        "MissingPathParameter",
                        format!("path variable '{var}' has no matching 'in: path' parameter"),
                    ));
                }
            }
        }
    }
}

/// Log every issue at error level.
pub fn print_issues(issues: &[ValidationIssue]) {
    error!(count = issues.len(), "Specification validation failed");
    for issue in issues {
        error!(kind = %issue.kind, location = %issue.location, "{}", issue.message);
    }
}

/// Turn a non-empty issue list into a load error.
pub fn fail_if_issues(issues: Vec<ValidationIssue>) -> Result<(), SpecLoadError> {
    if issues.is_empty() {
        Ok(())
    } else {
        print_issues(&issues);
        Err(SpecLoadError::Invalid(issues))
    }
}
