//! # specrouter
//!
//! **specrouter** routes HTTP requests to handlers according to a
//! [Swagger 2.0](https://swagger.io/specification/v2/) API description.
//!
//! ## Overview
//!
//! The description is the single source of truth for what the service
//! accepts. At startup it is rendered as a template, validated, and turned
//! into an immutable route table; at request time every declared parameter
//! is extracted, checked and handed to the handler named by the operation's
//! `operationId`.
//!
//! ## Architecture
//!
//! - **[`spec`]** - template rendering, YAML/JSON parsing, `$ref` resolution
//!   and the operation model
//! - **[`validator`]** - meta-schema and semantic checks of a document
//! - **[`router`]** - radix-tree route table with `basePath` and bare mounts
//! - **[`params`]** - parameter binding and JSON-schema body validation
//! - **[`registry`]** - explicit `operationId` to handler registry
//! - **[`dispatcher`]** - match, bind, invoke, and translate errors
//! - **[`server`]** - request/response types and the reloadable
//!   [`RouterHandle`](server::RouterHandle)
//! - **[`hot_reload`]** - rebuild the router when the template changes
//! - **[`auth`]** - the token controller and its bundled spec
//! - **[`runtime_config`]**, **[`logging`]**, **[`cli`]** - configuration,
//!   `tracing` setup and the `specrouter` binary
//!
//! ### Request Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Host
//!     participant Handle as RouterHandle
//!     participant Dispatcher
//!     participant Table as RouteTable
//!     participant Binder as params::bind
//!     participant Handler
//!
//!     Host->>Handle: handle(&Request)
//!     Handle->>Dispatcher: current dispatcher
//!     Dispatcher->>Table: route(method, path)
//!     Table-->>Dispatcher: RouteMatch (entry, path params)
//!     Dispatcher->>Binder: bind(operation, params, request)
//!     Binder-->>Dispatcher: BoundCall or ParameterError
//!     Dispatcher->>Handler: call(BoundCall)
//!     Handler-->>Dispatcher: Response / HttpError
//!     Dispatcher-->>Host: Response (errors translated)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use specrouter::registry::{HandlerResult, OperationRegistry};
//! use specrouter::params::BoundCall;
//! use specrouter::router::RouterOptions;
//! use specrouter::server::{Request, Response, RouterHandle, SpecSource};
//!
//! let mut registry = OperationRegistry::new();
//! registry.register("app.items:get_item", |call: BoundCall| -> HandlerResult {
//!     let id = call.get_str("id").unwrap_or_default().to_string();
//!     Ok(Some(Response::ok(serde_json::json!({ "id": id }))))
//! });
//!
//! let source = SpecSource::file("api.yaml", Default::default());
//! let handle = RouterHandle::new(source, registry, RouterOptions::default())?;
//! let response = handle.handle(&Request::get("/v1/items/42"));
//! ```
//!
//! ## Error Bodies
//!
//! Every error leaves the dispatcher as JSON:
//!
//! ```json
//! { "status": 400, "faultstring": "Required parameter \"id\" is missing", "debug_info": null }
//! ```
//!
//! `debug_info` is only populated when [`RouterOptions::debug`](router::RouterOptions)
//! is set.

pub mod auth;
pub mod cli;
pub mod dispatcher;
pub mod error;
pub mod hot_reload;
pub mod ids;
pub mod logging;
pub mod params;
pub mod registry;
pub mod router;
pub mod runtime_config;
pub mod server;
pub mod spec;
pub mod validator;

pub use dispatcher::Dispatcher;
pub use error::{DispatchError, HandlerError, HttpError, RouteBuildError, SpecLoadError, StartupError};
pub use ids::RequestId;
pub use params::BoundCall;
pub use registry::{Handler, HandlerResult, OperationRegistry};
pub use router::{RouteTable, RouterOptions};
pub use server::{Request, Response, RouterHandle, SpecSource};
pub use spec::{load_spec, load_spec_str, SpecDocument, TemplateVars};
