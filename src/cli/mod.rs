//! # CLI Module
//!
//! Command-line front end of the `specrouter` binary.
//!
//! ## Commands
//!
//! ### `check`
//!
//! Render, parse and validate a spec template, printing every issue:
//!
//! ```bash
//! specrouter check --spec api.yaml --var base_path=/v1
//! ```
//!
//! ### `routes`
//!
//! Print the route table, one `METHOD /path -> operationId` line per mount:
//!
//! ```bash
//! specrouter routes --spec api.yaml --var base_path=/v1 --no-bare
//! ```
//!
//! ### `dispatch`
//!
//! Run one request through a router with the token controller registered
//! and print the translated response as JSON. Without `--spec` the bundled
//! auth spec is served:
//!
//! ```bash
//! specrouter dispatch --user user:pass \
//!     --path /auth/v1/tokens -H 'Authorization: Basic dXNlcjpwYXNz'
//! ```
//!
//! Every command accepts `--config <FILE>` (see [`crate::runtime_config`]).

mod commands;

#[cfg(test)]
mod tests;

pub use commands::{run, run_cli, Cli, Commands, SpecArgs};
