//! Build passes into the preview workspace.

use super::Builder;
use crate::config::{Config, ConfigError, ConfigResolver};
use crate::core::LiveReloadMode;
use crate::error::ServeError;
use crate::logger::StatusLine;
use crate::{debug, log};
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Runs build passes, one at a time.
///
/// All passes write into the same workspace, so they are serialized by an
/// internal lock. Once [`close`](Self::close) returns, no pass runs again.
pub struct BuildOrchestrator {
    resolver: ConfigResolver,
    builder: Arc<dyn Builder>,
    mode: LiveReloadMode,
    /// Build lock; `true` once closed
    closed: Mutex<bool>,
}

impl BuildOrchestrator {
    pub fn new(resolver: ConfigResolver, builder: Arc<dyn Builder>, mode: LiveReloadMode) -> Self {
        Self {
            resolver,
            builder,
            mode,
            closed: Mutex::new(false),
        }
    }

    /// Resolve a fresh config snapshot.
    pub fn resolve(&self) -> Result<Config, ConfigError> {
        self.resolver.resolve()
    }

    /// Run one build pass.
    ///
    /// Uses `config` when given, otherwise resolves a fresh one. The config's
    /// `site_url` is rewritten in place to the local server before building,
    /// so callers keep seeing the URL the site was built with. Returns
    /// `Ok(())` without building once the orchestrator is closed.
    pub fn run_build(&self, config: Option<&mut Config>) -> Result<(), ServeError> {
        let closed = self.closed.lock();
        if *closed {
            debug!("build"; "skipped, preview is shutting down");
            return Ok(());
        }

        let mut fresh;
        let config = match config {
            Some(config) => config,
            None => {
                fresh = self.resolver.resolve()?;
                &mut fresh
            }
        };
        config.use_local_site_url()?;

        debug!(
            "build";
            "building {} into {}",
            config.docs_dir.display(),
            config.site_dir.display()
        );
        let start = Instant::now();
        self.builder
            .build(config, self.mode.is_live(), self.mode.is_dirty())?;
        debug!("build"; "done in {:?}", start.elapsed());

        drop(closed);
        Ok(())
    }

    /// Refuse further builds, waiting for an in-flight one to finish.
    pub fn close(&self) {
        *self.closed.lock() = true;
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.lock()
    }
}

// ============================================================================
// Rebuilder
// ============================================================================

/// Rebuild callback handed to the preview server.
///
/// Rebuilds from a cached config snapshot. The snapshot is re-resolved only
/// when the config file itself is among the changed paths.
#[derive(Clone)]
pub struct Rebuilder {
    orchestrator: Arc<BuildOrchestrator>,
    cache: Arc<ArcSwap<Config>>,
    status: StatusLine,
}

impl Rebuilder {
    pub fn new(orchestrator: Arc<BuildOrchestrator>, config: Config, status: StatusLine) -> Self {
        Self {
            orchestrator,
            cache: Arc::new(ArcSwap::from_pointee(config)),
            status,
        }
    }

    /// Rebuild after `changed` paths were modified.
    pub fn rebuild(&self, changed: &[PathBuf]) -> Result<(), ServeError> {
        let cached = self.cache.load_full();
        let mut config = if changed.iter().any(|path| path == &cached.config_file_path) {
            log!("watch"; "config file changed, reloading");
            self.status.detach();
            let mut fresh = self.orchestrator.resolve()?;
            fresh.use_local_site_url()?;
            self.cache.store(Arc::new(fresh.clone()));
            fresh
        } else {
            Config::clone(&cached)
        };
        self.orchestrator.run_build(Some(&mut config))
    }

    pub fn orchestrator(&self) -> &BuildOrchestrator {
        &self.orchestrator
    }

    /// Where rebuild results are reported.
    pub fn status(&self) -> &StatusLine {
        &self.status
    }
}

impl std::fmt::Debug for Rebuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rebuilder")
            .field("mode", &self.orchestrator.mode)
            .field("closed", &self.orchestrator.is_closed())
            .finish_non_exhaustive()
    }
}
