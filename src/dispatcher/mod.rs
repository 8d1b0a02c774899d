//! # Dispatcher Module
//!
//! Glues the pipeline together for one request: match the route, bind the
//! parameters, look up the handler resolved at startup, invoke it with panic
//! recovery, and translate any failure into a JSON error response.
//!
//! ```rust,ignore
//! use specrouter::dispatcher::Dispatcher;
//! use specrouter::params::BoundCall;
//! use specrouter::registry::{HandlerResult, OperationRegistry};
//! use specrouter::server::{Request, Response};
//!
//! let mut registry = OperationRegistry::new();
//! registry.register("app.items:items_controller.get_one", |call: BoundCall| -> HandlerResult {
//!     Ok(Some(Response::ok(serde_json::json!({ "id": call.get("id") }))))
//! });
//!
//! let dispatcher = Dispatcher::from_spec(&doc, &registry, Default::default())?;
//! let response = dispatcher.handle(&Request::get("/items/42"));
//! ```

mod core;

pub use core::{Dispatcher, REQUEST_ID_HEADER};
