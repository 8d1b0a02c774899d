//! # Error Module
//!
//! Every failure the router can produce, from spec loading at startup to a
//! handler failing mid-request, plus the [`ErrorTranslator`] that turns the
//! per-request ones into JSON error responses.
//!
//! ## Startup errors
//!
//! [`SpecLoadError`] and [`RouteBuildError`] are fatal: a router is only ever
//! constructed from a fully loaded, fully validated document, so no partial
//! route table is ever served.
//!
//! ## Per-request errors
//!
//! [`DispatchError`] covers everything between receiving a request and
//! returning the handler's response. Each variant maps to exactly one HTTP
//! status (see [`DispatchError::status`]) and the translator renders it as:
//!
//! ```json
//! { "status": 400, "faultstring": "Required parameter \"authorization\" is missing", "debug_info": null }
//! ```
//!
//! `debug_info` is only populated when the router runs in debug mode.

use crate::server::Response;
use crate::validator::ValidationIssue;
use http::Method;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use tracing::error;

/// Failure while turning a specification template into a [`crate::spec::SpecDocument`].
#[derive(Debug)]
pub enum SpecLoadError {
    /// The template file could not be read
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Template rendering failed (syntax error or an undefined variable)
    Template(String),
    /// The rendered text is not valid YAML/JSON
    Parse(String),
    /// The document parsed but is not a valid API description
    Invalid(Vec<ValidationIssue>),
}

impl fmt::Display for SpecLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecLoadError::Io { path, source } => {
                write!(f, "failed to read specification '{}': {}", path.display(), source)
            }
            SpecLoadError::Template(msg) => write!(f, "failed to render specification template: {msg}"),
            SpecLoadError::Parse(msg) => write!(f, "failed to parse specification: {msg}"),
            SpecLoadError::Invalid(issues) => {
                write!(f, "specification failed validation with {} issue(s)", issues.len())?;
                for issue in issues {
                    write!(f, "\n  [{}] {}: {}", issue.kind, issue.location, issue.message)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for SpecLoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SpecLoadError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Failure while building the route table from a loaded document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteBuildError {
    /// Two operations of the same method have structurally identical patterns
    Duplicate {
        method: Method,
        pattern: String,
        existing: String,
    },
    /// A path pattern cannot be compiled into route segments
    InvalidPattern { pattern: String, reason: String },
    /// A parameter definition is unusable (unknown location, unresolvable `$ref`)
    InvalidParameter {
        operation_id: String,
        name: String,
        reason: String,
    },
    /// A body schema could not be dereferenced or compiled
    Schema {
        operation_id: String,
        parameter: String,
        message: String,
    },
    /// An operation declares no `operationId`
    MissingOperationId { method: Method, pattern: String },
    /// An operationId has no handler in the supplied registry
    UnresolvedHandler { operation_id: String },
}

impl fmt::Display for RouteBuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteBuildError::Duplicate {
                method,
                pattern,
                existing,
            } => write!(
                f,
                "route {method} {pattern} collides with already registered {method} {existing}"
            ),
            RouteBuildError::InvalidPattern { pattern, reason } => {
                write!(f, "invalid path pattern '{pattern}': {reason}")
            }
            RouteBuildError::InvalidParameter {
                operation_id,
                name,
                reason,
            } => write!(f, "operation '{operation_id}' parameter '{name}': {reason}"),
            RouteBuildError::Schema {
                operation_id,
                parameter,
                message,
            } => write!(
                f,
                "operation '{operation_id}' body parameter '{parameter}' has an unusable schema: {message}"
            ),
            RouteBuildError::MissingOperationId { method, pattern } => {
                write!(f, "operation {method} {pattern} has no operationId")
            }
            RouteBuildError::UnresolvedHandler { operation_id } => {
                write!(f, "no handler registered for operationId '{operation_id}'")
            }
        }
    }
}

impl std::error::Error for RouteBuildError {}

/// Failure while (re)building a serving router from its source.
#[derive(Debug)]
pub enum StartupError {
    Load(SpecLoadError),
    Build(RouteBuildError),
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupError::Load(e) => write!(f, "{e}"),
            StartupError::Build(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for StartupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StartupError::Load(e) => Some(e),
            StartupError::Build(e) => Some(e),
        }
    }
}

impl From<SpecLoadError> for StartupError {
    fn from(e: SpecLoadError) -> Self {
        StartupError::Load(e)
    }
}

impl From<RouteBuildError> for StartupError {
    fn from(e: RouteBuildError) -> Self {
        StartupError::Build(e)
    }
}

/// Parameter binding failure; always a client error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterError {
    /// A required parameter was absent or empty
    Missing { name: String },
    /// The request body did not parse or did not conform to its schema
    InvalidBody {
        name: String,
        message: String,
        detail: String,
    },
}

impl ParameterError {
    /// Name of the offending parameter.
    #[must_use]
    pub fn parameter(&self) -> &str {
        match self {
            ParameterError::Missing { name } | ParameterError::InvalidBody { name, .. } => name,
        }
    }
}

impl fmt::Display for ParameterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterError::Missing { name } => write!(f, "Required parameter \"{name}\" is missing"),
            ParameterError::InvalidBody { message, .. } => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for ParameterError {}

/// An operationId that no registered handler answers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerResolutionError {
    pub operation_id: String,
}

impl fmt::Display for HandlerResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unable to resolve handler for operation \"{}\"", self.operation_id)
    }
}

impl std::error::Error for HandlerResolutionError {}

/// Error raised by a handler that knows which HTTP status it wants.
///
/// The translator honours `status` and `message` verbatim, and adds `headers`
/// to the error response (e.g. `WWW-Authenticate`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    pub status: u16,
    pub message: String,
    pub detail: Option<String>,
    pub headers: Vec<(String, String)>,
}

impl HttpError {
    #[must_use]
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            detail: None,
            headers: Vec::new(),
        }
    }

    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, message)
    }

    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(401, message)
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status, self.message)
    }
}

impl std::error::Error for HttpError {}

/// Anything a handler can fail with.
#[derive(Debug)]
pub enum HandlerError {
    /// Failure carrying its own HTTP status
    Http(HttpError),
    /// Opaque failure, reported as 500
    Internal(anyhow::Error),
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerError::Http(e) => write!(f, "{e}"),
            HandlerError::Internal(e) => write!(f, "{e:#}"),
        }
    }
}

impl std::error::Error for HandlerError {}

impl From<HttpError> for HandlerError {
    fn from(e: HttpError) -> Self {
        HandlerError::Http(e)
    }
}

impl From<anyhow::Error> for HandlerError {
    fn from(e: anyhow::Error) -> Self {
        HandlerError::Internal(e)
    }
}

/// Per-request failure, produced anywhere between route matching and the
/// handler returning.
#[derive(Debug)]
pub enum DispatchError {
    /// No route for this method and path
    NotFound { method: Method, path: String },
    /// The path exists under other methods; only produced when the router is
    /// configured to distinguish 405 from 404
    MethodNotAllowed {
        method: Method,
        path: String,
        allowed: Vec<Method>,
    },
    Parameter(ParameterError),
    Resolution(HandlerResolutionError),
    Handler(HandlerError),
    /// The handler panicked; the panic was contained
    HandlerPanic { operation_id: String, message: String },
}

impl DispatchError {
    /// HTTP status this error is reported with.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            DispatchError::NotFound { .. } => 404,
            DispatchError::MethodNotAllowed { .. } => 405,
            DispatchError::Parameter(_) => 400,
            DispatchError::Resolution(_) => 500,
            DispatchError::Handler(HandlerError::Http(e)) => e.status,
            DispatchError::Handler(HandlerError::Internal(_)) => 500,
            DispatchError::HandlerPanic { .. } => 500,
        }
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::NotFound { .. } => write!(f, "The resource could not be found."),
            DispatchError::MethodNotAllowed { method, .. } => {
                write!(f, "The method {method} is not allowed for this resource.")
            }
            DispatchError::Parameter(e) => write!(f, "{e}"),
            DispatchError::Resolution(e) => write!(f, "{e}"),
            DispatchError::Handler(HandlerError::Http(e)) => write!(f, "{}", e.message),
            DispatchError::Handler(HandlerError::Internal(e)) => write!(f, "{e}"),
            DispatchError::HandlerPanic { operation_id, .. } => {
                write!(f, "Handler for \"{operation_id}\" panicked")
            }
        }
    }
}

impl std::error::Error for DispatchError {}

impl From<ParameterError> for DispatchError {
    fn from(e: ParameterError) -> Self {
        DispatchError::Parameter(e)
    }
}

impl From<HandlerResolutionError> for DispatchError {
    fn from(e: HandlerResolutionError) -> Self {
        DispatchError::Resolution(e)
    }
}

impl From<HandlerError> for DispatchError {
    fn from(e: HandlerError) -> Self {
        DispatchError::Handler(e)
    }
}

/// JSON error body understood by the hosting error-formatting layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fault {
    /// Mirrors the HTTP status of the response
    pub status: u16,
    pub faultstring: String,
    pub debug_info: Option<String>,
}

/// Renders [`DispatchError`]s as JSON error responses.
///
/// In debug mode `debug_info` carries the validation diagnostic, handler
/// detail, or error chain. Outside debug mode it is always `null`, and the
/// message of an opaque 500 is replaced by a generic one so internal details
/// never reach the client.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorTranslator {
    debug: bool,
}

impl ErrorTranslator {
    #[must_use]
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }

    #[must_use]
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Build the fault body for `err` without producing a full response.
    #[must_use]
    pub fn fault(&self, err: &DispatchError) -> Fault {
        let detail = match err {
            DispatchError::Parameter(ParameterError::InvalidBody { detail, .. }) => {
                Some(detail.clone())
            }
            DispatchError::Handler(HandlerError::Http(e)) => e.detail.clone(),
            DispatchError::Handler(HandlerError::Internal(e)) => Some(format!("{e:?}")),
            DispatchError::HandlerPanic { message, .. } => Some(message.clone()),
            DispatchError::MethodNotAllowed { allowed, .. } => Some(format!(
                "allowed methods: {}",
                join_methods(allowed)
            )),
            _ => None,
        };

        let opaque = matches!(
            err,
            DispatchError::Handler(HandlerError::Internal(_)) | DispatchError::HandlerPanic { .. }
        );
        let faultstring = if opaque && !self.debug {
            "Internal Server Error".to_string()
        } else {
            err.to_string()
        };

        Fault {
            status: err.status(),
            faultstring,
            debug_info: if self.debug { detail } else { None },
        }
    }

    /// Translate `err` into the response returned to the client.
    #[must_use]
    pub fn translate(&self, err: &DispatchError) -> Response {
        let status = err.status();
        if status >= 500 {
            error!(status = status, error = %err, "Request failed with server error");
        }

        let fault = self.fault(err);
        let body = serde_json::to_value(&fault).unwrap_or_else(|_| {
            serde_json::json!({ "status": status, "faultstring": fault.faultstring, "debug_info": null })
        });
        let mut resp = Response::json(status, body);

        match err {
            DispatchError::Handler(HandlerError::Http(e)) => {
                for (name, value) in &e.headers {
                    resp.set_header(name, value.clone());
                }
            }
            DispatchError::MethodNotAllowed { allowed, .. } => {
                resp.set_header("allow", join_methods(allowed));
            }
            _ => {}
        }
        resp
    }
}

fn join_methods(methods: &[Method]) -> String {
    methods
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
