//! Loading API descriptions.
//!
//! A specification starts as a template: it is rendered with
//! [`TemplateVars`], parsed as YAML, validated, and finally flattened into
//! [`OperationSpec`]s that the router registers.

mod build;
mod load;
mod resolver;
mod types;

pub use build::build_operations;
pub use load::{
    load_spec, load_spec_from_value, load_spec_str, parse_document, render_template, TemplateVars,
};
pub use resolver::{collect_refs, resolve_pointer, RefError, SchemaResolver};
pub use types::{
    parse_path_pattern, BodySchema, OperationSpec, ParameterLocation, ParameterSpec, Segment,
    SpecDocument, SpecVersion, HTTP_METHODS,
};
