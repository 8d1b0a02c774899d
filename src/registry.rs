//! Operation registry.
//!
//! Maps operationId strings (conventionally `module.path:attribute.path`) to
//! handlers. Populated at startup and frozen into a
//! [`Dispatcher`](crate::dispatcher::Dispatcher), which resolves every
//! operation of its route table up front.

use crate::error::{HandlerError, HandlerResolutionError};
use crate::params::BoundCall;
use crate::server::Response;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// What a handler returns.
///
/// `Ok(Some(response))` is sent as is. `Ok(None)` means the handler has
/// nothing to return and is answered with `204 No Content`.
pub type HandlerResult = Result<Option<Response>, HandlerError>;

/// An operation implementation.
///
/// Handlers run on the caller's thread and may be invoked concurrently.
/// A panic inside `call` is contained by the dispatcher and reported as 500.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, call: BoundCall) -> HandlerResult;
}

impl<F> Handler for F
where
    F: Fn(BoundCall) -> HandlerResult + Send + Sync + 'static,
{
    fn call(&self, call: BoundCall) -> HandlerResult {
        self(call)
    }
}

#[derive(Clone, Default)]
pub struct OperationRegistry {
    handlers: HashMap<String, Arc<dyn Handler>>,
}

impl OperationRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `operation_id`, replacing any previous one.
    pub fn register<H: Handler>(&mut self, operation_id: impl Into<String>, handler: H) -> &mut Self {
        self.register_arc(operation_id, Arc::new(handler))
    }

    pub fn register_arc(
        &mut self,
        operation_id: impl Into<String>,
        handler: Arc<dyn Handler>,
    ) -> &mut Self {
        let operation_id = operation_id.into();
        if self.handlers.insert(operation_id.clone(), handler).is_some() {
            warn!(operation_id = %operation_id, "Handler replaced");
        } else {
            debug!(operation_id = %operation_id, "Handler registered");
        }
        self
    }

    pub fn resolve(&self, operation_id: &str) -> Result<Arc<dyn Handler>, HandlerResolutionError> {
        self.handlers
            .get(operation_id)
            .cloned()
            .ok_or_else(|| HandlerResolutionError {
                operation_id: operation_id.to_string(),
            })
    }

    #[must_use]
    pub fn contains(&self, operation_id: &str) -> bool {
        self.handlers.contains_key(operation_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered operationIds, sorted.
    #[must_use]
    pub fn operation_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

impl fmt::Debug for OperationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationRegistry")
            .field("operation_ids", &self.operation_ids())
            .finish()
    }
}

/// Split an operationId into its module reference and attribute path.
///
/// `"pkg.controllers.v1.auth:token_controller.post"` gives
/// `Some(("pkg.controllers.v1.auth", "token_controller.post"))`. Only used
/// for log fields; the registry itself accepts any string.
#[must_use]
pub fn split_operation_id(operation_id: &str) -> Option<(&str, &str)> {
    operation_id
        .split_once(':')
        .filter(|(module, attr)| !module.is_empty() && !attr.is_empty())
}
