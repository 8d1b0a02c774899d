//! # Hot Reload Module
//!
//! Watches a specification template on disk and reloads the
//! [`RouterHandle`] when it changes.
//!
//! ```rust,ignore
//! let handle = Arc::new(RouterHandle::new(source, registry, options)?);
//! let _watcher = watch_spec(Arc::clone(&handle))?;
//! // keep `_watcher` alive for as long as reloads should happen
//! ```
//!
//! If the new template fails to render, parse, validate or build, the error
//! is logged and the previous router keeps serving. Editors often write a
//! file in several steps; each step may trigger a reload attempt, and only
//! successful ones are published.

use crate::server::RouterHandle;
use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Start watching the template file behind `handle`.
///
/// Fails when the handle was built from an inline template.
pub fn watch_spec(handle: Arc<RouterHandle>) -> notify::Result<RecommendedWatcher> {
    let Some(path) = handle.source().path().map(|p| p.to_path_buf()) else {
        return Err(notify::Error::generic(
            "hot reload requires a specification loaded from a file",
        ));
    };

    let reload_handle = Arc::clone(&handle);
    let mut watcher = RecommendedWatcher::new(
        move |res: Result<notify::Event, notify::Error>| match res {
            Ok(event) => {
                if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                    debug!(paths = ?event.paths, "Specification changed on disk");
                    if let Ok(version) = reload_handle.reload() {
                        info!(version = ?version.map(|v| v.hash), "hot-reload: applied");
                    }
                }
            }
            Err(e) => warn!(error = %e, "hot-reload: watch error"),
        },
        Config::default(),
    )?;

    watcher.watch(&path, RecursiveMode::NonRecursive)?;
    info!(path = %path.display(), "hot-reload: watching specification");
    Ok(watcher)
}
