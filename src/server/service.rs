use super::{Request, Response};
use crate::dispatcher::Dispatcher;
use crate::error::StartupError;
use crate::registry::OperationRegistry;
use crate::router::RouterOptions;
use crate::spec::{load_spec, load_spec_str, SpecDocument, SpecVersion, TemplateVars};
use arc_swap::ArcSwap;
use http::StatusCode;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

/// Where a specification template comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateSource {
    File(PathBuf),
    Inline(String),
}

/// A template plus the variables it is rendered with.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecSource {
    pub template: TemplateSource,
    pub vars: TemplateVars,
}

impl SpecSource {
    #[must_use]
    pub fn file(path: impl Into<PathBuf>, vars: TemplateVars) -> Self {
        Self {
            template: TemplateSource::File(path.into()),
            vars,
        }
    }

    #[must_use]
    pub fn inline(template: impl Into<String>, vars: TemplateVars) -> Self {
        Self {
            template: TemplateSource::Inline(template.into()),
            vars,
        }
    }

    /// File backing this source, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match &self.template {
            TemplateSource::File(path) => Some(path),
            TemplateSource::Inline(_) => None,
        }
    }

    pub fn load(&self) -> Result<SpecDocument, crate::error::SpecLoadError> {
        match &self.template {
            TemplateSource::File(path) => load_spec(path, &self.vars),
            TemplateSource::Inline(text) => load_spec_str(text, &self.vars),
        }
    }
}

/// Serving entry point that can swap in a rebuilt router.
///
/// Requests load the current [`Dispatcher`] without locking; a reload builds
/// a complete new one and publishes it atomically, so in-flight requests
/// finish on the table they started with.
pub struct RouterHandle {
    current: ArcSwap<Dispatcher>,
    source: SpecSource,
    registry: OperationRegistry,
    options: RouterOptions,
}

impl RouterHandle {
    /// Load `source` and build the first dispatcher.
    pub fn new(
        source: SpecSource,
        registry: OperationRegistry,
        options: RouterOptions,
    ) -> Result<Self, StartupError> {
        let dispatcher = Self::build(&source, &registry, options)?;
        Ok(Self {
            current: ArcSwap::from_pointee(dispatcher),
            source,
            registry,
            options,
        })
    }

    fn build(
        source: &SpecSource,
        registry: &OperationRegistry,
        options: RouterOptions,
    ) -> Result<Dispatcher, StartupError> {
        let doc = source.load()?;
        Ok(Dispatcher::from_spec(&doc, registry, options)?)
    }

    /// The dispatcher serving right now.
    #[must_use]
    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        self.current.load_full()
    }

    #[must_use]
    pub fn version(&self) -> Option<SpecVersion> {
        self.current.load().table().version().cloned()
    }

    #[must_use]
    pub fn source(&self) -> &SpecSource {
        &self.source
    }

    pub fn handle(&self, request: &Request) -> Response {
        self.current.load().handle(request)
    }

    /// Adapter for hosts speaking `http` types.
    pub fn handle_http(&self, request: http::Request<Vec<u8>>) -> http::Response<Vec<u8>> {
        let response = self.handle(&Request::from_http(request));
        match response.into_http() {
            Ok(resp) => resp,
            Err(e) => {
                error!(error = %e, "Response could not be converted");
                let mut resp = http::Response::new(Vec::new());
                *resp.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                resp
            }
        }
    }

    /// Rebuild from the same source and swap the result in.
    ///
    /// On failure the current dispatcher keeps serving and the error is
    /// returned.
    pub fn reload(&self) -> Result<Option<SpecVersion>, StartupError> {
        let previous = self.version();
        match Self::build(&self.source, &self.registry, self.options) {
            Ok(dispatcher) => {
                let version = dispatcher.table().version().cloned();
                let routes = dispatcher.table().len();
                self.current.store(Arc::new(dispatcher));
                info!(
                    previous = ?previous.map(|v| v.hash),
                    current = ?version.as_ref().map(|v| v.hash.as_str()),
                    routes,
                    "Router reloaded"
                );
                Ok(version)
            }
            Err(e) => {
                error!(error = %e, "Reload failed; keeping the current router");
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for RouterHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterHandle")
            .field("source", &self.source)
            .field("dispatcher", &self.current.load_full())
            .finish()
    }
}
