//! # Auth Module
//!
//! Token issuing served through the router itself: a bundled spec template
//! declares `POST /tokens` and [`TokenController`] is registered as its
//! handler.
//!
//! Two modes are supported:
//!
//! - **standalone** - credentials arrive as HTTP Basic in the `authorization`
//!   header and are checked against an [`AuthBackend`]
//! - **proxy** - a fronting proxy has already authenticated the user and put
//!   the name in `REMOTE_USER`
//!
//! ```rust,ignore
//! let mut registry = OperationRegistry::new();
//! register_token_controller(&mut registry, &AuthConfig::default())?;
//! let source = SpecSource::inline(AUTH_SPEC_TEMPLATE, default_template_vars());
//! let handle = RouterHandle::new(source, registry, RouterOptions::default())?;
//! ```

mod backend;
mod controller;
mod token;

pub use backend::{AuthBackend, StaticBackend};
pub use controller::{TokenController, TOKEN_OPERATION_ID};
pub use token::{parse_ttl, InMemoryTokenService, Token, TokenError, TokenService};

use crate::registry::OperationRegistry;
use crate::spec::TemplateVars;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// The bundled `POST /tokens` spec template.
pub const AUTH_SPEC_TEMPLATE: &str = include_str!("../../specs/auth.yaml");

/// Base path the bundled template is rendered with by default.
pub const DEFAULT_AUTH_BASE_PATH: &str = "/auth/v1";

/// API location advertised in `X-API-URL` unless configured otherwise.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:9101/v1";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    #[default]
    Standalone,
    Proxy,
}

/// The `auth` section of the router configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub mode: AuthMode,
    /// Sent back in `X-API-URL` with every issued token
    pub api_url: String,
    /// Inline users, name to plain password
    pub users: BTreeMap<String, String>,
    /// htpasswd-style `user:password` file, merged over `users`
    pub users_file: Option<PathBuf>,
    pub default_ttl_secs: u64,
    pub max_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            mode: AuthMode::Standalone,
            api_url: DEFAULT_API_URL.to_string(),
            users: BTreeMap::new(),
            users_file: None,
            default_ttl_secs: 86_400,
            max_ttl_secs: 86_400,
        }
    }
}

impl AuthConfig {
    /// Build the backend described by `users` and `users_file`.
    pub fn backend(&self) -> anyhow::Result<StaticBackend> {
        let mut backend = match &self.users_file {
            Some(path) => StaticBackend::from_htpasswd_file(path)?,
            None => StaticBackend::new(),
        };
        for (user, password) in &self.users {
            backend.insert(user, password);
        }
        Ok(backend)
    }

    pub fn controller(&self) -> anyhow::Result<TokenController> {
        let tokens = Arc::new(InMemoryTokenService::new(
            self.default_ttl_secs,
            self.max_ttl_secs,
        ));
        let controller = match self.mode {
            AuthMode::Standalone => {
                let backend = self.backend()?;
                if backend.is_empty() {
                    tracing::warn!("Standalone auth configured without any users");
                }
                TokenController::standalone(Arc::new(backend), tokens)
            }
            AuthMode::Proxy => TokenController::proxy(tokens),
        };
        Ok(controller.with_api_url(self.api_url.clone()))
    }
}

/// Variables the bundled template needs.
#[must_use]
pub fn default_template_vars() -> TemplateVars {
    let mut vars = TemplateVars::new();
    vars.insert(
        "base_path".to_string(),
        Value::String(DEFAULT_AUTH_BASE_PATH.to_string()),
    );
    vars
}

/// Register the token controller under [`TOKEN_OPERATION_ID`].
pub fn register_token_controller(
    registry: &mut OperationRegistry,
    config: &AuthConfig,
) -> anyhow::Result<()> {
    let controller = config.controller()?;
    tracing::info!(mode = ?config.mode, "Registering token controller");
    registry.register(TOKEN_OPERATION_ID, controller);
    Ok(())
}
