//! Preview session lifecycle.
//!
//! ```text
//! Idle → Building → Watching → Serving → ShuttingDown
//!                 ╰──────────→ Serving            (live reload disabled)
//! ```
//!
//! Teardown is carried by guards declared in acquisition order, so Rust's
//! reverse drop order runs it on every exit path: the server shuts down,
//! the orchestrator stops accepting builds, plugins see `shutdown`, and the
//! workspace is removed last.

use super::server::{ErrorHandler, PreviewServer, ServeExit, ServerFactory, ServerOptions};
use crate::build::{BuildOrchestrator, Builder, Rebuilder};
use crate::config::{ConfigLoader, ConfigOverrides, ConfigResolver};
use crate::core::{Command, Context, LiveReloadMode};
use crate::error::ServeError;
use crate::plugin::{EventDispatcher, PluginRegistry};
use crate::workspace::TempWorkspace;
use crate::{debug, log};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Error pages looked up in the workspace.
const ERROR_PAGES: [u16; 2] = [404, 500];

/// Inputs of one preview session.
#[derive(Debug, Clone, Default)]
pub struct ServeOptions {
    pub config_file: Option<PathBuf>,
    pub overrides: ConfigOverrides,
    pub livereload: LiveReloadMode,
    /// Also watch theme directories
    pub watch_theme: bool,
    /// Extra paths to watch, after the config file's `watch` entries
    pub watch: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Building,
    Watching,
    Serving,
    ShuttingDown,
}

impl LifecycleState {
    pub fn can_advance_to(self, next: Self) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Idle, Building)
                | (Building, Watching | Serving)
                | (Watching, Serving)
                | (Idle | Building | Watching | Serving, ShuttingDown)
        )
    }
}

/// Runs a preview session: build, watch, serve, tear down.
pub struct ServerLifecycleManager {
    ctx: Context,
    loader: Arc<dyn ConfigLoader>,
    builder: Arc<dyn Builder>,
    factory: Arc<dyn ServerFactory>,
    plugins: Arc<dyn PluginRegistry>,
    workspace_parent: PathBuf,
    state: LifecycleState,
}

impl ServerLifecycleManager {
    pub fn new(
        ctx: Context,
        loader: Arc<dyn ConfigLoader>,
        builder: Arc<dyn Builder>,
        factory: Arc<dyn ServerFactory>,
        plugins: Arc<dyn PluginRegistry>,
    ) -> Self {
        Self {
            ctx,
            loader,
            builder,
            factory,
            plugins,
            workspace_parent: std::env::temp_dir(),
            state: LifecycleState::Idle,
        }
    }

    /// Create workspaces under `parent` instead of the system temp dir.
    #[cfg(test)]
    pub fn with_workspace_parent(mut self, parent: impl Into<PathBuf>) -> Self {
        self.workspace_parent = parent.into();
        self
    }

    #[cfg(test)]
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Run a session to completion.
    ///
    /// An interrupt is a normal exit. Transport and filesystem failures come
    /// back as [`ServeError::Abort`]; template errors come back unchanged.
    pub fn run(&mut self, options: ServeOptions) -> Result<(), ServeError> {
        let result = self.run_session(&options);
        self.advance(LifecycleState::ShuttingDown);
        result.map_err(ServeError::into_abort)
    }

    fn run_session(&mut self, options: &ServeOptions) -> Result<(), ServeError> {
        // Declared first, dropped last
        let workspace = TempWorkspace::create_in(&self.workspace_parent)?;

        let dispatcher = EventDispatcher::new(Arc::clone(&self.plugins));
        let _shutdown_event = dispatcher.shutdown_guard();

        let resolver = ConfigResolver::new(
            Arc::clone(&self.loader),
            options.config_file.clone(),
            options.overrides.clone(),
            workspace.path(),
            options.watch.iter().cloned().collect(),
            Arc::clone(&self.plugins),
        );
        let mut config = resolver.resolve()?;
        let mode = options.livereload;

        let orchestrator = Arc::new(BuildOrchestrator::new(resolver, Arc::clone(&self.builder), mode));
        let _close_builds = CloseOnDrop(Arc::clone(&orchestrator));

        dispatcher.startup(Command::Serve, mode.is_dirty());

        self.advance(LifecycleState::Building);
        log!("build"; "building documentation...");
        orchestrator.run_build(Some(&mut config))?;

        let rebuilder = Rebuilder::new(Arc::clone(&orchestrator), config.clone(), self.ctx.status.clone());
        let mount_path = config.mount_path()?;
        let server = self.factory.construct(
            rebuilder.clone(),
            ServerOptions {
                host: config.host(),
                port: config.port(),
                root: workspace.path().to_path_buf(),
                mount_path,
                live_reload: mode.is_live(),
            },
            &self.ctx.shutdown,
        )?;
        let mut server = ServerGuard::new(server);
        server.get().set_error_handler(error_page_handler(workspace.path()));

        if mode.is_live() {
            self.advance(LifecycleState::Watching);
            server.get().watch(&config.docs_dir);
            server.get().watch(&config.config_file_path);
            if options.watch_theme {
                for dir in &config.theme.dirs {
                    server.get().watch(dir);
                }
            }

            // Later calls go to whatever server the plugins hand back
            server.replace_with(|current| dispatcher.serve(current, &config, &rebuilder))?;

            for path in &config.watch {
                server.get().watch(path);
            }
            debug!("watch"; "{} paths registered", server.get().watched().len());
        }

        self.advance(LifecycleState::Serving);
        debug!("serve"; "serving with {}", server.get().describe());
        match server.get().serve()? {
            ServeExit::Interrupted => log!("serve"; "shutting down..."),
            ServeExit::Finished => debug!("serve"; "server loop finished"),
        }
        Ok(())
    }

    fn advance(&mut self, next: LifecycleState) {
        if self.state.can_advance_to(next) {
            debug!("serve"; "{:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }
}

/// `{code}.html` from `root`, read at request time.
pub fn error_page_handler(root: &Path) -> ErrorHandler {
    let root = root.to_path_buf();
    Arc::new(move |code| {
        if !ERROR_PAGES.contains(&code) {
            return None;
        }
        fs::read(root.join(format!("{code}.html"))).ok()
    })
}

/// Closes the orchestrator when dropped.
struct CloseOnDrop(Arc<BuildOrchestrator>);

impl Drop for CloseOnDrop {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Owns the active server and shuts it down exactly once.
struct ServerGuard {
    server: Option<Box<dyn PreviewServer>>,
}

impl ServerGuard {
    fn new(server: Box<dyn PreviewServer>) -> Self {
        Self {
            server: Some(server),
        }
    }

    fn get(&mut self) -> &mut dyn PreviewServer {
        match &mut self.server {
            Some(server) => server.as_mut(),
            None => unreachable!("server is only taken inside replace_with"),
        }
    }

    /// Hand the server to `f` and keep whatever it returns.
    ///
    /// On error the server passed in is gone; nothing is left to shut down.
    fn replace_with(
        &mut self,
        f: impl FnOnce(Box<dyn PreviewServer>) -> Result<Box<dyn PreviewServer>, ServeError>,
    ) -> Result<(), ServeError> {
        if let Some(current) = self.server.take() {
            self.server = Some(f(current)?);
        }
        Ok(())
    }
}

impl Drop for ServerGuard {
    fn drop(&mut self) {
        if let Some(mut server) = self.server.take() {
            server.shutdown();
        }
    }
}
