//! # Runtime Configuration Module
//!
//! [`RouterConfig`] gathers everything needed to stand up a router: where
//! the API description template lives, the variables it is rendered with, the router
//! options and the `auth` section.
//!
//! ## Sources
//!
//! A config file is read by extension (`.yaml`/`.yml`, `.toml` or `.json`)
//! and environment variables are applied on top:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `SPECROUTER_SPEC` | `spec_path` |
//! | `SPECROUTER_DEBUG` | `debug` |
//! | `SPECROUTER_MOUNT_BARE` | `mount_bare` |
//!
//! Booleans accept `1`/`0`, `true`/`false`, `yes`/`no` and `on`/`off`.
//!
//! ## Example
//!
//! ```yaml
//! spec_path: specs/auth.yaml
//! template_vars:
//!   base_path: /auth/v1
//! debug: false
//! auth:
//!   mode: standalone
//!   api_url: https://api.example.com/api/v1
//!   users:
//!     admin: changeme
//! ```

use crate::auth::AuthConfig;
use crate::router::RouterOptions;
use crate::spec::TemplateVars;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Spec template; `None` means the bundled auth template
    pub spec_path: Option<PathBuf>,
    pub template_vars: TemplateVars,
    /// Expose internal error details in responses
    pub debug: bool,
    /// Also serve routes without the base path prefix
    pub mount_bare: bool,
    pub distinguish_method_not_allowed: bool,
    /// Fail startup when an operationId has no registered handler
    pub strict_handlers: bool,
    pub auth: AuthConfig,
}

impl Default for RouterConfig {
    fn default() -> Self {
        let options = RouterOptions::default();
        Self {
            spec_path: None,
            template_vars: TemplateVars::new(),
            debug: options.debug,
            mount_bare: options.mount_bare,
            distinguish_method_not_allowed: options.distinguish_method_not_allowed,
            strict_handlers: options.strict_handlers,
            auth: AuthConfig::default(),
        }
    }
}

impl RouterConfig {
    /// Read a config file, choosing the format from its extension.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config '{}'", path.display()))?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let config = match ext.as_str() {
            "yaml" | "yml" => serde_yaml::from_str(&text).map_err(anyhow::Error::from),
            "toml" => toml::from_str(&text).map_err(anyhow::Error::from),
            "json" => serde_json::from_str(&text).map_err(anyhow::Error::from),
            other => bail!(
                "unsupported config format '{other}' for '{}'",
                path.display()
            ),
        };
        config.with_context(|| format!("invalid config '{}'", path.display()))
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Override fields from `SPECROUTER_*` variables.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_vars(|name| env::var(name).ok())
    }

    fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(spec) = lookup("SPECROUTER_SPEC").filter(|s| !s.is_empty()) {
            self.spec_path = Some(PathBuf::from(spec));
        }
        if let Some(raw) = lookup("SPECROUTER_DEBUG") {
            self.debug = parse_bool("SPECROUTER_DEBUG", &raw)?;
        }
        if let Some(raw) = lookup("SPECROUTER_MOUNT_BARE") {
            self.mount_bare = parse_bool("SPECROUTER_MOUNT_BARE", &raw)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn router_options(&self) -> RouterOptions {
        RouterOptions {
            debug: self.debug,
            mount_bare: self.mount_bare,
            distinguish_method_not_allowed: self.distinguish_method_not_allowed,
            strict_handlers: self.strict_handlers,
        }
    }
}

pub(crate) fn parse_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => bail!("{name}: expected a boolean, got '{other}'"),
    }
}
