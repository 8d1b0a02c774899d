//! Request/response types and the reloadable serving handle.
//!
//! The router is host-agnostic: anything that can produce a [`Request`] and
//! consume a [`Response`] can serve it. Adapters to and from the `http`
//! crate's types are provided.

mod request;
mod response;
mod service;

pub use request::{parse_query_params, FieldVec, Request};
pub use response::{status_reason, HeaderVec, Response};
pub use service::{RouterHandle, SpecSource, TemplateSource};
