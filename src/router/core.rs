use super::radix::{Captures, RadixNode};
use crate::error::RouteBuildError;
use crate::spec::{build_operations, parse_path_pattern, OperationSpec, Segment, SpecDocument, SpecVersion};
use http::Method;
use smallvec::SmallVec;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, info};

/// Maximum number of path parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Path parameter storage. Names are shared with the route table; values are
/// per-request and already percent-decoded.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Knobs that change how a document is turned into a serving router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterOptions {
    /// Include diagnostics (`debug_info`, error chains) in error bodies
    pub debug: bool,
    /// Also serve every route without the document's `basePath`
    pub mount_bare: bool,
    /// Answer 405 with an `Allow` header instead of 404 when only the method
    /// is wrong
    pub distinguish_method_not_allowed: bool,
    /// Fail construction when an operationId has no registered handler;
    /// otherwise such routes answer 500
    pub strict_handlers: bool,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            debug: false,
            mount_bare: true,
            distinguish_method_not_allowed: false,
            strict_handlers: true,
        }
    }
}

/// One registered operation.
#[derive(Debug)]
pub struct RouteEntry {
    pub method: Method,
    /// Pattern as written in the document, without `basePath`
    pub pattern: Arc<str>,
    pub operation: Arc<OperationSpec>,
    /// Mount prefixes this route answers under (`""` is the bare mount)
    pub prefixes: SmallVec<[Arc<str>; 2]>,
    var_names: SmallVec<[Arc<str>; 4]>,
}

impl RouteEntry {
    #[must_use]
    pub fn operation_id(&self) -> &str {
        &self.operation.operation_id
    }

    /// Names of the pattern's variables, left to right.
    #[must_use]
    pub fn var_names(&self) -> &[Arc<str>] {
        &self.var_names
    }

    /// Full paths this route is reachable at, one per mount.
    #[must_use]
    pub fn mounted_paths(&self) -> Vec<String> {
        self.prefixes
            .iter()
            .map(|prefix| format!("{prefix}{}", self.pattern))
            .collect()
    }
}

/// Result of matching a request to a route.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub entry: Arc<RouteEntry>,
    pub path_params: ParamVec,
    /// The mount prefix the request came in under
    pub mount: Arc<str>,
}

impl RouteMatch {
    /// Get a path parameter by name; the last occurrence wins when a pattern
    /// repeats a variable name.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rev()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn operation(&self) -> &OperationSpec {
        &self.entry.operation
    }
}

/// Immutable route table built from one document.
///
/// Safe to share across threads; lookups never lock.
#[derive(Debug)]
pub struct RouteTable {
    root: RadixNode,
    entries: Vec<Arc<RouteEntry>>,
    mounts: SmallVec<[Arc<str>; 2]>,
    base_path: String,
    version: Option<SpecVersion>,
}

impl RouteTable {
    /// Build the table for every operation in `doc`.
    pub fn build(doc: &SpecDocument, options: &RouterOptions) -> Result<Self, RouteBuildError> {
        let operations = build_operations(doc)?;
        let mut table = Self::from_operations(operations, doc.base_path(), options.mount_bare)?;
        table.version = Some(doc.version().clone());
        Ok(table)
    }

    /// Build a table from already flattened operations.
    ///
    /// Operations are registered in order; a second operation with the same
    /// method and a structurally identical pattern is rejected.
    pub fn from_operations(
        operations: Vec<OperationSpec>,
        base_path: &str,
        mount_bare: bool,
    ) -> Result<Self, RouteBuildError> {
        let base_path = base_path.trim_end_matches('/').to_string();
        let mut mounts: SmallVec<[Arc<str>; 2]> = SmallVec::new();
        if base_path.is_empty() {
            mounts.push(Arc::from(""));
        } else {
            mounts.push(Arc::from(base_path.as_str()));
            if mount_bare {
                mounts.push(Arc::from(""));
            }
        }

        let mut root = RadixNode::default();
        let mut entries = Vec::with_capacity(operations.len());

        for operation in operations {
            let segments = parse_path_pattern(&operation.path_pattern).map_err(|reason| {
                RouteBuildError::InvalidPattern {
                    pattern: operation.path_pattern.to_string(),
                    reason,
                }
            })?;
            let var_names = segments
                .iter()
                .filter_map(|s| match s {
                    Segment::Variable(name) => Some(Arc::from(name.as_str())),
                    Segment::Static(_) => None,
                })
                .collect();
            let entry = Arc::new(RouteEntry {
                method: operation.method.clone(),
                pattern: Arc::clone(&operation.path_pattern),
                operation: Arc::new(operation),
                prefixes: mounts.clone(),
                var_names,
            });

            root.insert(&segments, Arc::clone(&entry))
                .map_err(|existing| RouteBuildError::Duplicate {
                    method: entry.method.clone(),
                    pattern: entry.pattern.to_string(),
                    existing: existing.pattern.to_string(),
                })?;

            debug!(
                method = %entry.method,
                pattern = %entry.pattern,
                operation_id = %entry.operation_id(),
                "Route registered"
            );
            entries.push(entry);
        }

        let routes_summary: Vec<String> = entries
            .iter()
            .take(10)
            .map(|e| format!("{} {}", e.method, e.pattern))
            .collect();
        info!(
            routes_count = entries.len(),
            base_path = %base_path,
            mount_bare = mounts.len() > 1,
            routes_summary = ?routes_summary,
            "Routing table loaded"
        );

        Ok(Self {
            root,
            entries,
            mounts,
            base_path,
            version: None,
        })
    }

    /// Find the route for `method` and `path`.
    ///
    /// The `basePath` mount is tried first, then the bare mount. `path` may
    /// carry a query string, which is ignored.
    #[must_use]
    pub fn route(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        let path = strip_query(path);
        for mount in &self.mounts {
            let Some(rest) = strip_mount(path, mount) else {
                continue;
            };
            let Some(segments) = request_segments(rest) else {
                continue;
            };
            let mut captures = Captures::new();
            if let Some(entry) = self.root.search(&segments, method, &mut captures) {
                let path_params: ParamVec = entry
                    .var_names
                    .iter()
                    .zip(captures)
                    .map(|(name, raw)| (Arc::clone(name), decode_segment(raw)))
                    .collect();
                debug!(
                    method = %method,
                    path = %path,
                    pattern = %entry.pattern,
                    operation_id = %entry.operation_id(),
                    path_params = ?path_params,
                    "Route matched"
                );
                return Some(RouteMatch {
                    entry: Arc::clone(entry),
                    path_params,
                    mount: Arc::clone(mount),
                });
            }
        }
        debug!(method = %method, path = %path, "No route matched");
        None
    }

    /// Methods that do have a route for `path`, in registration order.
    #[must_use]
    pub fn allowed_methods(&self, path: &str) -> Vec<Method> {
        let path = strip_query(path);
        let mut out = Vec::new();
        for mount in &self.mounts {
            if let Some(segments) = strip_mount(path, mount).and_then(request_segments) {
                self.root.collect_methods(&segments, &mut out);
            }
        }
        out
    }

    #[must_use]
    pub fn entries(&self) -> &[Arc<RouteEntry>] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    #[must_use]
    pub fn version(&self) -> Option<&SpecVersion> {
        self.version.as_ref()
    }

    /// One `METHOD path -> operationId` line per mounted route.
    #[must_use]
    pub fn describe(&self) -> Vec<String> {
        self.entries
            .iter()
            .flat_map(|e| {
                e.mounted_paths()
                    .into_iter()
                    .map(move |p| format!("{} {} -> {}", e.method, p, e.operation_id()))
            })
            .collect()
    }
}

fn strip_query(path: &str) -> &str {
    path.split_once(['?', '#']).map_or(path, |(p, _)| p)
}

fn strip_mount<'p>(path: &'p str, mount: &str) -> Option<&'p str> {
    if mount.is_empty() {
        return Some(path);
    }
    let rest = path.strip_prefix(mount)?;
    (rest.is_empty() || rest.starts_with('/')).then_some(rest)
}

/// Split the part of a request path below the mount into segments.
///
/// Matching is exact: an empty segment (`//` or a trailing `/`) matches
/// nothing. The mount root itself may be written with or without its slash.
fn request_segments(rest: &str) -> Option<SmallVec<[&str; 16]>> {
    let rest = rest.strip_prefix('/').unwrap_or(rest);
    if rest.is_empty() {
        return Some(SmallVec::new());
    }
    let segments: SmallVec<[&str; 16]> = rest.split('/').collect();
    (!segments.iter().any(|s| s.is_empty())).then_some(segments)
}

fn decode_segment(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| raw.to_string())
}
