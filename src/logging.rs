//! Structured logging setup.
//!
//! The router itself only emits `tracing` events; this module is for binaries
//! and tests that want a subscriber installed. Configuration comes from the
//! environment:
//!
//! | Variable | Values | Default |
//! |---|---|---|
//! | `SPECROUTER_LOG_LEVEL` | trace/debug/info/warn/error | `info` |
//! | `SPECROUTER_LOG_FORMAT` | json/pretty | `json` |
//! | `SPECROUTER_LOG_REDACT_LEVEL` | none/credentials | `credentials` |
//! | `SPECROUTER_LOG_TARGET_FILTER` | comma-separated directives | unset |
//! | `SPECROUTER_LOG_INCLUDE_LOCATION` | boolean | `false` |
//!
//! `RUST_LOG`, when set, replaces the level and the target directives.
//! Unknown values are reported instead of silently falling back.

use crate::runtime_config::parse_bool;
use anyhow::{anyhow, Context, Result};
use std::env;
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event
    #[default]
    Json,
    /// Multi-line human readable output
    Pretty,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            other => Err(anyhow!("unknown log format '{other}'")),
        }
    }
}

/// Whether credential-bearing values may appear in log fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RedactionLevel {
    None,
    #[default]
    Credentials,
}

impl FromStr for RedactionLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(RedactionLevel::None),
            "credentials" => Ok(RedactionLevel::Credentials),
            other => Err(anyhow!("unknown redaction level '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub level: Level,
    pub format: LogFormat,
    pub redact_level: RedactionLevel,
    /// Extra `EnvFilter` directives such as `specrouter::router=debug`
    pub directives: Vec<String>,
    pub include_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Json,
            redact_level: RedactionLevel::Credentials,
            directives: Vec::new(),
            include_location: false,
        }
    }
}

impl LogConfig {
    /// Defaults with the `SPECROUTER_LOG_*` variables applied.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(raw) = lookup("SPECROUTER_LOG_LEVEL") {
            config.level = raw
                .trim()
                .parse::<Level>()
                .map_err(|_| anyhow!("SPECROUTER_LOG_LEVEL: unknown level '{raw}'"))?;
        }
        if let Some(raw) = lookup("SPECROUTER_LOG_FORMAT") {
            config.format = raw.parse::<LogFormat>().context("SPECROUTER_LOG_FORMAT")?;
        }
        if let Some(raw) = lookup("SPECROUTER_LOG_REDACT_LEVEL") {
            config.redact_level = raw
                .parse::<RedactionLevel>()
                .context("SPECROUTER_LOG_REDACT_LEVEL")?;
        }
        if let Some(raw) = lookup("SPECROUTER_LOG_TARGET_FILTER") {
            config.directives = raw
                .split(',')
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(raw) = lookup("SPECROUTER_LOG_INCLUDE_LOCATION") {
            config.include_location = parse_bool("SPECROUTER_LOG_INCLUDE_LOCATION", &raw)?;
        }
        Ok(config)
    }

    /// The event filter: `RUST_LOG` if set, otherwise the level plus
    /// `directives`.
    pub fn filter(&self) -> Result<EnvFilter> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
        self.directives
            .iter()
            .try_fold(EnvFilter::new(self.level.as_str()), |filter, raw| -> Result<EnvFilter> {
                let directive = raw
                    .parse::<Directive>()
                    .with_context(|| format!("invalid log directive '{raw}'"))?;
                Ok(filter.add_directive(directive))
            })
    }
}

const CREDENTIAL_PATTERNS: [&str; 8] = [
    "password",
    "passwd",
    "secret",
    "token",
    "authorization",
    "api_key",
    "apikey",
    "credentials",
];

/// Mask `value` when `field_name` looks credential-bearing.
///
/// Long tokens keep their first four characters so log lines can still be
/// correlated; everything else is masked completely.
#[must_use]
pub fn redact(level: RedactionLevel, field_name: &str, value: &str) -> String {
    if level == RedactionLevel::None {
        return value.to_string();
    }
    let lower = field_name.to_lowercase();
    if !CREDENTIAL_PATTERNS.iter().any(|p| lower.contains(p)) {
        return value.to_string();
    }
    if lower.contains("token") && value.chars().count() > 8 {
        let head: String = value.chars().take(4).collect();
        format!("{head}***")
    } else {
        "<REDACTED>".to_string()
    }
}

/// Install a global subscriber writing to stderr, so binaries keep stdout
/// for their own output. Fails if a global subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let base = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(config.include_location)
        .with_line_number(config.include_location);
    let fmt_layer = match config.format {
        LogFormat::Json => base.json().with_current_span(true).boxed(),
        LogFormat::Pretty => base.pretty().boxed(),
    };

    tracing_subscriber::registry()
        .with(config.filter()?)
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize logging")
}
