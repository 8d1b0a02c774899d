use super::types::{SpecDocument, SpecVersion};
use crate::error::SpecLoadError;
use crate::validator;
use minijinja::{Environment, UndefinedBehavior};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Variables substituted into a specification template before parsing.
pub type TemplateVars = BTreeMap<String, Value>;

/// Render a specification template.
///
/// Referencing a variable that is not in `vars` is an error rather than an
/// empty string, so a misconfigured deployment fails at startup.
pub fn render_template(template: &str, vars: &TemplateVars) -> Result<String, SpecLoadError> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_keep_trailing_newline(true);
    env.render_str(template, vars)
        .map_err(|e| SpecLoadError::Template(format!("{e:#}")))
}

/// Parse rendered text as YAML (a superset of JSON) into a JSON value.
pub fn parse_document(text: &str) -> Result<Value, SpecLoadError> {
    let mut yaml: serde_yaml::Value =
        serde_yaml::from_str(text).map_err(|e| SpecLoadError::Parse(e.to_string()))?;
    yaml.apply_merge()
        .map_err(|e| SpecLoadError::Parse(e.to_string()))?;
    yaml_to_json(yaml).map_err(SpecLoadError::Parse)
}

// Swagger documents key responses by status code, which YAML reads as
// integers; JSON object keys must be strings.
fn yaml_to_json(value: serde_yaml::Value) -> Result<Value, String> {
    use serde_yaml::Value as Y;
    Ok(match value {
        Y::Null => Value::Null,
        Y::Bool(b) => Value::Bool(b),
        Y::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Number(i.into())
            } else if let Some(u) = n.as_u64() {
                Value::Number(u.into())
            } else {
                let f = n.as_f64().unwrap_or(f64::NAN);
                Value::Number(
                    Number::from_f64(f).ok_or_else(|| format!("unsupported number {n}"))?,
                )
            }
        }
        Y::String(s) => Value::String(s),
        Y::Sequence(items) => Value::Array(
            items
                .into_iter()
                .map(yaml_to_json)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Y::Mapping(mapping) => {
            let mut out = Map::with_capacity(mapping.len());
            for (k, v) in mapping {
                let key = match k {
                    Y::String(s) => s,
                    Y::Number(n) => n.to_string(),
                    Y::Bool(b) => b.to_string(),
                    Y::Null => "null".to_string(),
                    other => return Err(format!("unsupported mapping key {other:?}")),
                };
                out.insert(key, yaml_to_json(v)?);
            }
            Value::Object(out)
        }
        Y::Tagged(tagged) => yaml_to_json(tagged.value)?,
    })
}

/// Render, parse and validate the template at `path`.
pub fn load_spec<P: AsRef<Path>>(path: P, vars: &TemplateVars) -> Result<SpecDocument, SpecLoadError> {
    let path = path.as_ref();
    let template = std::fs::read_to_string(path).map_err(|source| SpecLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "Loaded specification template");
    load_spec_str(&template, vars)
}

/// Render, parse and validate an in-memory template.
pub fn load_spec_str(template: &str, vars: &TemplateVars) -> Result<SpecDocument, SpecLoadError> {
    let rendered = render_template(template, vars)?;
    let value = parse_document(&rendered)?;
    let version = SpecVersion::from_content(rendered.as_bytes());
    finish(value, version)
}

/// Validate an already parsed document; no templating is applied.
pub fn load_spec_from_value(value: Value) -> Result<SpecDocument, SpecLoadError> {
    let canonical = serde_json::to_vec(&value).map_err(|e| SpecLoadError::Parse(e.to_string()))?;
    let version = SpecVersion::from_content(&canonical);
    finish(value, version)
}

fn finish(value: Value, version: SpecVersion) -> Result<SpecDocument, SpecLoadError> {
    validator::fail_if_issues(validator::validate_document(&value))?;
    let doc = SpecDocument::new(value, version);
    info!(
        title = %doc.title(),
        base_path = %doc.base_path(),
        version = %doc.version(),
        "Specification loaded"
    );
    Ok(doc)
}
