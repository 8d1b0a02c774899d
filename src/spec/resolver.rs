//! Internal `$ref` resolution.
//!
//! Only references into the same document (`#/...`) are supported. Body
//! schemas are dereferenced by inlining their targets so the compiled
//! validator never needs to look anything up. Recursive schemas cannot be
//! fully inlined; the recursive `$ref`s are kept and the document's
//! `definitions` are attached to the schema root so they still resolve.

use serde_json::{Map, Value};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefError {
    /// Reference to another document
    External(String),
    /// Pointer does not lead anywhere in this document
    Unresolved(String),
}

impl fmt::Display for RefError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefError::External(r) => write!(f, "external reference '{r}' is not supported"),
            RefError::Unresolved(r) => write!(f, "reference '{r}' does not resolve"),
        }
    }
}

impl std::error::Error for RefError {}

/// Look up `reference` (e.g. `#/definitions/Token`) inside `document`.
pub fn resolve_pointer<'a>(document: &'a Value, reference: &str) -> Result<&'a Value, RefError> {
    let Some(fragment) = reference.strip_prefix('#') else {
        return Err(RefError::External(reference.to_string()));
    };
    let pointer: Cow<'_, str> =
        urlencoding::decode(fragment).unwrap_or(Cow::Borrowed(fragment));
    if !pointer.is_empty() && !pointer.starts_with('/') {
        return Err(RefError::Unresolved(reference.to_string()));
    }
    // serde_json handles the ~0 / ~1 escapes
    document
        .pointer(&pointer)
        .ok_or_else(|| RefError::Unresolved(reference.to_string()))
}

#[derive(Debug, Clone)]
pub struct SchemaResolver {
    document: Arc<Value>,
}

impl SchemaResolver {
    #[must_use]
    pub fn new(document: Arc<Value>) -> Self {
        Self { document }
    }

    pub fn resolve(&self, reference: &str) -> Result<&Value, RefError> {
        resolve_pointer(&self.document, reference)
    }

    /// Follow `value` if it is a JSON reference object, possibly through a
    /// chain of references. Non-reference values are returned as is.
    pub fn follow<'a>(&'a self, value: &'a Value) -> Result<&'a Value, RefError> {
        let mut current = value;
        let mut seen: Vec<&str> = Vec::new();
        while let Some(reference) = current.get("$ref").and_then(Value::as_str) {
            if seen.contains(&reference) {
                return Err(RefError::Unresolved(reference.to_string()));
            }
            seen.push(reference);
            current = self.resolve(reference)?;
        }
        Ok(current)
    }

    /// Produce a self-contained copy of `schema` with references inlined.
    pub fn deref_schema(&self, schema: &Value) -> Result<Value, RefError> {
        let mut stack = Vec::new();
        let mut cyclic = false;
        let mut out = self.inline(schema, &mut stack, &mut cyclic)?;
        if cyclic {
            if let (Value::Object(root), Some(defs)) = (&mut out, self.document.get("definitions")) {
                root.insert("definitions".to_string(), defs.clone());
            }
        }
        Ok(out)
    }

    fn inline(
        &self,
        value: &Value,
        stack: &mut Vec<String>,
        cyclic: &mut bool,
    ) -> Result<Value, RefError> {
        match value {
            Value::Object(map) => {
                if let Some(Value::String(reference)) = map.get("$ref") {
                    if stack.iter().any(|r| r == reference) {
                        *cyclic = true;
                        return Ok(value.clone());
                    }
                    let target = self.resolve(reference)?;
                    stack.push(reference.clone());
                    let out = self.inline(target, stack, cyclic);
                    stack.pop();
                    return out;
                }
                let mut out = Map::with_capacity(map.len());
                for (key, child) in map {
                    out.insert(key.clone(), self.inline(child, stack, cyclic)?);
                }
                Ok(Value::Object(out))
            }
            Value::Array(items) => items
                .iter()
                .map(|item| self.inline(item, stack, cyclic))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            other => Ok(other.clone()),
        }
    }
}

/// Every `$ref` string in `value`, with the JSON pointer where it appears.
pub fn collect_refs(value: &Value) -> Vec<(String, String)> {
    fn walk(value: &Value, at: &mut String, out: &mut Vec<(String, String)>) {
        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    if key == "$ref" {
                        if let Value::String(r) = child {
                            out.push((at.clone(), r.clone()));
                        }
                        continue;
                    }
                    let len = at.len();
                    at.push('/');
                    at.push_str(&key.replace('~', "~0").replace('/', "~1"));
                    walk(child, at, out);
                    at.truncate(len);
                }
            }
            Value::Array(items) => {
                for (i, child) in items.iter().enumerate() {
                    let len = at.len();
                    at.push('/');
                    at.push_str(&i.to_string());
                    walk(child, at, out);
                    at.truncate(len);
                }
            }
            _ => {}
        }
    }
    let mut out = Vec::new();
    walk(value, &mut String::new(), &mut out);
    out
}
