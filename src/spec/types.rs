use super::resolver::SchemaResolver;
use http::Method;
use jsonschema::Validator;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;

/// HTTP verbs an API description may declare under a path item.
pub const HTTP_METHODS: [&str; 7] = ["get", "put", "post", "delete", "options", "head", "patch"];

/// Where a parameter's value is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterLocation {
    Query,
    Path,
    Header,
    Body,
    FormData,
    /// Process/host environment; the variable name is the upper-cased parameter name
    Environment,
}

impl ParameterLocation {
    /// Parse the `in` field of a parameter object.
    ///
    /// The environment location is spelled `environ` in documents; `environment`
    /// is accepted too.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "query" => Some(ParameterLocation::Query),
            "path" => Some(ParameterLocation::Path),
            "header" => Some(ParameterLocation::Header),
            "body" => Some(ParameterLocation::Body),
            "formData" => Some(ParameterLocation::FormData),
            "environ" | "environment" => Some(ParameterLocation::Environment),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterLocation::Query => "query",
            ParameterLocation::Path => "path",
            ParameterLocation::Header => "header",
            ParameterLocation::Body => "body",
            ParameterLocation::FormData => "formData",
            ParameterLocation::Environment => "environ",
        }
    }
}

impl fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A body schema with every `$ref` already dereferenced, compiled once.
#[derive(Clone)]
pub struct BodySchema {
    schema: Arc<Value>,
    validator: Arc<Validator>,
}

impl BodySchema {
    /// Compile a self-contained (dereferenced) schema. Swagger 2.0 schemas are
    /// a draft-4 dialect.
    pub fn compile(schema: Value) -> Result<Self, String> {
        let validator = jsonschema::options()
            .with_draft(jsonschema::Draft::Draft4)
            .build(&schema)
            .map_err(|e| e.to_string())?;
        Ok(Self {
            schema: Arc::new(schema),
            validator: Arc::new(validator),
        })
    }

    #[must_use]
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Validate `instance`, returning every violation message on failure.
    pub fn validate(&self, instance: &Value) -> Result<(), Vec<String>> {
        let errors: Vec<String> = self
            .validator
            .iter_errors(instance)
            .map(|e| e.to_string())
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl fmt::Debug for BodySchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BodySchema")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct ParameterSpec {
    pub name: Arc<str>,
    pub location: ParameterLocation,
    pub required: bool,
    /// Present only for body parameters
    pub schema: Option<BodySchema>,
    /// Declared under `x-parameters` rather than `parameters`
    pub extension: bool,
}

/// One operation (path + method) of the document, ready for dispatch.
#[derive(Debug, Clone)]
pub struct OperationSpec {
    pub operation_id: Arc<str>,
    pub method: Method,
    pub path_pattern: Arc<str>,
    pub summary: Option<String>,
    /// Declared parameters first, then extension parameters, in document order
    pub parameters: Vec<ParameterSpec>,
}

impl OperationSpec {
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.name.as_ref() == name)
    }

    #[must_use]
    pub fn body_parameter(&self) -> Option<&ParameterSpec> {
        self.parameters
            .iter()
            .find(|p| p.location == ParameterLocation::Body)
    }
}

/// Fingerprint of a rendered specification, used to tell reloads apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpecVersion {
    /// First 16 hex chars of the SHA-256 of the rendered text
    pub hash: String,
}

impl SpecVersion {
    #[must_use]
    pub fn from_content(content: &[u8]) -> Self {
        let digest = Sha256::digest(content);
        let hash: String = digest.iter().take(8).map(|b| format!("{b:02x}")).collect();
        Self { hash }
    }
}

impl fmt::Display for SpecVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hash)
    }
}

/// A rendered, parsed and validated API description.
///
/// Immutable once built; reloading produces a new document.
#[derive(Debug, Clone)]
pub struct SpecDocument {
    document: Arc<Value>,
    base_path: String,
    title: String,
    version: SpecVersion,
    resolver: SchemaResolver,
}

impl SpecDocument {
    pub(crate) fn new(document: Value, version: SpecVersion) -> Self {
        let document = Arc::new(document);
        let base_path = normalize_base_path(
            document
                .get("basePath")
                .and_then(Value::as_str)
                .unwrap_or_default(),
        );
        let title = document
            .pointer("/info/title")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let resolver = SchemaResolver::new(Arc::clone(&document));
        Self {
            document,
            base_path,
            title,
            version,
            resolver,
        }
    }

    #[must_use]
    pub fn raw(&self) -> &Value {
        &self.document
    }

    /// `basePath` without a trailing slash; empty when absent or `/`.
    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn version(&self) -> &SpecVersion {
        &self.version
    }

    #[must_use]
    pub fn resolver(&self) -> &SchemaResolver {
        &self.resolver
    }

    /// Path items in document order, skipping `x-` extensions.
    pub fn paths(&self) -> impl Iterator<Item = (&str, &Map<String, Value>)> {
        self.document
            .get("paths")
            .and_then(Value::as_object)
            .into_iter()
            .flat_map(|paths| paths.iter())
            .filter(|(path, _)| !path.starts_with("x-"))
            .filter_map(|(path, item)| item.as_object().map(|obj| (path.as_str(), obj)))
    }
}

fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// One segment of a path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Static(String),
    Variable(String),
}

/// Split a path pattern such as `/users/{id}/posts` into segments.
///
/// Empty segments are dropped, so `/a//b/` and `/a/b` are the same pattern.
/// A segment must be either fully literal or exactly one `{name}` variable.
pub fn parse_path_pattern(pattern: &str) -> Result<Vec<Segment>, String> {
    if !pattern.starts_with('/') {
        return Err("pattern must start with '/'".to_string());
    }
    let mut segments = Vec::new();
    for raw in pattern.split('/').filter(|s| !s.is_empty()) {
        if let Some(inner) = raw.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            if inner.is_empty() || inner.contains(['{', '}']) {
                return Err(format!("malformed variable segment '{raw}'"));
            }
            segments.push(Segment::Variable(inner.to_string()));
        } else if raw.contains(['{', '}']) {
            return Err(format!(
                "segment '{raw}' mixes literal text and variables, which is not supported"
            ));
        } else {
            segments.push(Segment::Static(raw.to_string()));
        }
    }
    Ok(segments)
}
