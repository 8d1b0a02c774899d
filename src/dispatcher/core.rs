use crate::error::{DispatchError, ErrorTranslator, RouteBuildError};
use crate::ids::RequestId;
use crate::params::bind;
use crate::registry::{split_operation_id, Handler, OperationRegistry};
use crate::router::{RouteTable, RouterOptions};
use crate::server::{Request, Response};
use crate::spec::SpecDocument;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Header carrying the per-request correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Runs requests against one route table with one frozen set of handlers.
///
/// Immutable after construction and `Send + Sync`; share it behind an `Arc`.
pub struct Dispatcher {
    table: Arc<RouteTable>,
    handlers: HashMap<Arc<str>, Arc<dyn Handler>>,
    translator: ErrorTranslator,
    options: RouterOptions,
}

impl Dispatcher {
    /// Resolve a handler for every operation of `table`.
    ///
    /// With `options.strict_handlers` an operation without a handler is a
    /// build error; otherwise it is logged and its requests answer 500.
    pub fn new(
        table: RouteTable,
        registry: &OperationRegistry,
        options: RouterOptions,
    ) -> Result<Self, RouteBuildError> {
        let mut handlers: HashMap<Arc<str>, Arc<dyn Handler>> = HashMap::new();
        for entry in table.entries() {
            let operation_id = &entry.operation.operation_id;
            if handlers.contains_key(operation_id) {
                continue;
            }
            match registry.resolve(operation_id) {
                Ok(handler) => {
                    handlers.insert(Arc::clone(operation_id), handler);
                }
                Err(_) if options.strict_handlers => {
                    return Err(RouteBuildError::UnresolvedHandler {
                        operation_id: operation_id.to_string(),
                    });
                }
                Err(e) => warn!(operation_id = %operation_id, error = %e, "Operation has no handler"),
            }
        }
        info!(
            routes = table.len(),
            handlers = handlers.len(),
            debug = options.debug,
            "Dispatcher ready"
        );
        Ok(Self {
            table: Arc::new(table),
            handlers,
            translator: ErrorTranslator::new(options.debug),
            options,
        })
    }

    /// Build the route table for `doc` and resolve its handlers.
    pub fn from_spec(
        doc: &SpecDocument,
        registry: &OperationRegistry,
        options: RouterOptions,
    ) -> Result<Self, RouteBuildError> {
        let table = RouteTable::build(doc, &options)?;
        Self::new(table, registry, options)
    }

    #[must_use]
    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    #[must_use]
    pub fn options(&self) -> &RouterOptions {
        &self.options
    }

    #[must_use]
    pub fn translator(&self) -> &ErrorTranslator {
        &self.translator
    }

    /// Route, bind, resolve and invoke, without translating failures.
    pub fn dispatch(&self, request: &Request) -> Result<Option<Response>, DispatchError> {
        let request_id = RequestId::from_header_or_new(request.header(REQUEST_ID_HEADER));
        self.dispatch_with_request_id(request, request_id)
    }

    pub fn dispatch_with_request_id(
        &self,
        request: &Request,
        request_id: RequestId,
    ) -> Result<Option<Response>, DispatchError> {
        let Some(matched) = self.table.route(&request.method, &request.path) else {
            if self.options.distinguish_method_not_allowed {
                let allowed = self.table.allowed_methods(&request.path);
                if !allowed.is_empty() {
                    warn!(
                        request_id = %request_id,
                        method = %request.method,
                        path = %request.path,
                        allowed = ?allowed,
                        "Method not allowed"
                    );
                    return Err(DispatchError::MethodNotAllowed {
                        method: request.method.clone(),
                        path: request.path.clone(),
                        allowed,
                    });
                }
            }
            warn!(
                request_id = %request_id,
                method = %request.method,
                path = %request.path,
                "No route matched"
            );
            return Err(DispatchError::NotFound {
                method: request.method.clone(),
                path: request.path.clone(),
            });
        };

        let operation = matched.operation();
        let call = bind(operation, &matched.path_params, request, request_id)?;

        let handler = self
            .handlers
            .get(&operation.operation_id)
            .ok_or_else(|| crate::error::HandlerResolutionError {
                operation_id: operation.operation_id.to_string(),
            })?;

        debug!(
            request_id = %request_id,
            operation_id = %operation.operation_id,
            module = split_operation_id(&operation.operation_id).map_or("", |(m, _)| m),
            "Invoking handler"
        );

        match catch_unwind(AssertUnwindSafe(|| handler.call(call))) {
            Ok(result) => result.map_err(DispatchError::from),
            Err(panic) => {
                let message = panic_message(&*panic);
                error!(
                    request_id = %request_id,
                    operation_id = %operation.operation_id,
                    panic_message = %message,
                    "Handler panicked"
                );
                Err(DispatchError::HandlerPanic {
                    operation_id: operation.operation_id.to_string(),
                    message,
                })
            }
        }
    }

    /// Full request pipeline; every outcome becomes a response.
    ///
    /// The response always carries the request id in `X-Request-Id`.
    pub fn handle(&self, request: &Request) -> Response {
        let started = Instant::now();
        let request_id = RequestId::from_header_or_new(request.header(REQUEST_ID_HEADER));
        debug!(
            request_id = %request_id,
            method = %request.method,
            path = %request.path,
            "Request received"
        );

        let mut response = match self.dispatch_with_request_id(request, request_id) {
            Ok(Some(response)) => response,
            Ok(None) => Response::no_content(),
            Err(err) => self.translator.translate(&err),
        };
        response.set_header(REQUEST_ID_HEADER, request_id.to_string());

        info!(
            request_id = %request_id,
            method = %request.method,
            path = %request.path,
            status = response.status,
            duration_us = started.elapsed().as_micros() as u64,
            "Request completed"
        );
        response
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<&str> = self.handlers.keys().map(|k| &**k).collect();
        ids.sort_unstable();
        f.debug_struct("Dispatcher")
            .field("routes", &self.table.len())
            .field("handlers", &ids)
            .field("options", &self.options)
            .finish()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}
