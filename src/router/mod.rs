//! # Router Module
//!
//! Maps `(method, path)` to the operation declared for it and extracts the
//! path variables.
//!
//! Every route is reachable under the document's `basePath` and, unless
//! disabled with [`RouterOptions::mount_bare`], under its bare path too, so
//! with `basePath: /api/v1` both `/api/v1/items/7` and `/items/7` reach the
//! same operation.
//!
//! ```rust,ignore
//! use specrouter::router::{RouteTable, RouterOptions};
//! use specrouter::spec::{load_spec, TemplateVars};
//!
//! let doc = load_spec("specs/auth.yaml", &vars)?;
//! let table = RouteTable::build(&doc, &RouterOptions::default())?;
//! if let Some(m) = table.route(&http::Method::GET, "/items/7") {
//!     println!("{} id={:?}", m.entry.operation_id(), m.get_path_param("id"));
//! }
//! ```

mod core;
mod radix;

pub use core::{ParamVec, RouteEntry, RouteMatch, RouteTable, RouterOptions, MAX_INLINE_PARAMS};
