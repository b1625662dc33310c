//! Plugin lifecycle events.
//!
//! Three events fire per preview session, in order:
//!
//! ```text
//! startup   before the first build
//! serve     after the server exists and core watches are registered;
//!           the returned server replaces the running one
//! shutdown  during teardown, exactly once
//! ```

use crate::build::Rebuilder;
use crate::config::Config;
use crate::core::Command;
use crate::error::ServeError;
use crate::serve::PreviewServer;
use crate::debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A lifecycle event with its payload.
pub enum Event<'a> {
    Startup {
        command: Command,
        dirty: bool,
    },
    Serve {
        server: Box<dyn PreviewServer>,
        config: &'a Config,
        builder: &'a Rebuilder,
    },
    Shutdown,
}

impl Event<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Startup { .. } => "startup",
            Self::Serve { .. } => "serve",
            Self::Shutdown => "shutdown",
        }
    }
}

/// Result of an event.
pub enum EventOutput {
    Done,
    /// Server to use from now on (answer to [`Event::Serve`])
    Server(Box<dyn PreviewServer>),
}

/// Receives lifecycle events.
pub trait PluginRegistry: Send + Sync {
    /// A `Serve` event must be answered with [`EventOutput::Server`].
    fn run_event(&self, event: Event<'_>) -> EventOutput;
}

/// A single plugin. Every hook defaults to a no-op.
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    fn on_startup(&self, _command: Command, _dirty: bool) {}

    /// Observe or replace the preview server.
    fn on_serve(
        &self,
        server: Box<dyn PreviewServer>,
        _config: &Config,
        _builder: &Rebuilder,
    ) -> Box<dyn PreviewServer> {
        server
    }

    fn on_shutdown(&self) {}
}

// ============================================================================
// PluginSet
// ============================================================================

/// Ordered list of plugins. `serve` chains the server through each one.
#[derive(Default)]
pub struct PluginSet {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl PluginSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl PluginRegistry for PluginSet {
    fn run_event(&self, event: Event<'_>) -> EventOutput {
        debug!("plugin"; "{} ({} plugins)", event.name(), self.len());
        match event {
            Event::Startup { command, dirty } => {
                for plugin in &self.plugins {
                    debug!("plugin"; "{}: startup {}", plugin.name(), command.as_str());
                    plugin.on_startup(command, dirty);
                }
                EventOutput::Done
            }
            Event::Serve {
                server,
                config,
                builder,
            } => {
                let server = self.plugins.iter().fold(server, |server, plugin| {
                    debug!("plugin"; "{}: serve", plugin.name());
                    plugin.on_serve(server, config, builder)
                });
                EventOutput::Server(server)
            }
            Event::Shutdown => {
                for plugin in &self.plugins {
                    debug!("plugin"; "{}: shutdown", plugin.name());
                    plugin.on_shutdown();
                }
                EventOutput::Done
            }
        }
    }
}

// ============================================================================
// EventDispatcher
// ============================================================================

/// Forwards lifecycle events to a [`PluginRegistry`].
///
/// `shutdown` reaches the registry at most once per dispatcher.
pub struct EventDispatcher {
    registry: Arc<dyn PluginRegistry>,
    shut_down: AtomicBool,
}

impl EventDispatcher {
    pub fn new(registry: Arc<dyn PluginRegistry>) -> Self {
        Self {
            registry,
            shut_down: AtomicBool::new(false),
        }
    }

    pub fn startup(&self, command: Command, dirty: bool) {
        self.registry.run_event(Event::Startup { command, dirty });
    }

    /// Fire `serve`, returning the server to use from now on.
    pub fn serve(
        &self,
        server: Box<dyn PreviewServer>,
        config: &Config,
        builder: &Rebuilder,
    ) -> Result<Box<dyn PreviewServer>, ServeError> {
        match self.registry.run_event(Event::Serve {
            server,
            config,
            builder,
        }) {
            EventOutput::Server(server) => Ok(server),
            EventOutput::Done => Err(ServeError::Plugin(
                "`serve` event returned no server".to_string(),
            )),
        }
    }

    /// Fire `shutdown` unless it already fired.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        self.registry.run_event(Event::Shutdown);
    }

    /// Guard firing `shutdown` when dropped.
    pub fn shutdown_guard(&self) -> ShutdownGuard<'_> {
        ShutdownGuard { dispatcher: self }
    }
}

/// Fires [`EventDispatcher::shutdown`] on drop.
pub struct ShutdownGuard<'a> {
    dispatcher: &'a EventDispatcher,
}

impl Drop for ShutdownGuard<'_> {
    fn drop(&mut self) {
        self.dispatcher.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serve::{ErrorHandler, ServeExit};
    use parking_lot::Mutex;
    use std::io;
    use std::path::{Path, PathBuf};

    #[derive(Default)]
    struct NullServer {
        label: &'static str,
        watched: Vec<PathBuf>,
    }

    impl PreviewServer for NullServer {
        fn watch(&mut self, path: &Path) {
            self.watched.push(path.to_path_buf());
        }
        fn watched(&self) -> &[PathBuf] {
            &self.watched
        }
        fn set_error_handler(&mut self, _handler: ErrorHandler) {}
        fn serve(&mut self) -> io::Result<ServeExit> {
            Ok(ServeExit::Finished)
        }
        fn shutdown(&mut self) {}
        fn describe(&self) -> String {
            self.label.to_string()
        }
    }

    /// Records every hook call by name.
    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        replace: bool,
    }

    impl Plugin for Recorder {
        fn name(&self) -> &str {
            self.name
        }
        fn on_startup(&self, command: Command, dirty: bool) {
            self.log
                .lock()
                .push(format!("{}:startup:{}:{}", self.name, command.as_str(), dirty));
        }
        fn on_serve(
            &self,
            server: Box<dyn PreviewServer>,
            _config: &Config,
            _builder: &Rebuilder,
        ) -> Box<dyn PreviewServer> {
            self.log
                .lock()
                .push(format!("{}:serve:{}", self.name, server.describe()));
            if self.replace {
                Box::new(NullServer {
                    label: self.name,
                    ..Default::default()
                })
            } else {
                server
            }
        }
        fn on_shutdown(&self) {
            self.log.lock().push(format!("{}:shutdown", self.name));
        }
    }

    /// Registry answering `serve` with `Done`.
    struct Broken;

    impl PluginRegistry for Broken {
        fn run_event(&self, _event: Event<'_>) -> EventOutput {
            EventOutput::Done
        }
    }

    fn recorder(name: &'static str, log: &Arc<Mutex<Vec<String>>>, replace: bool) -> Arc<dyn Plugin> {
        Arc::new(Recorder {
            name,
            log: Arc::clone(log),
            replace,
        })
    }

    #[test]
    fn test_startup_reaches_every_plugin_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let set = PluginSet::new()
            .with(recorder("a", &log, false))
            .with(recorder("b", &log, false));
        assert_eq!(set.len(), 2);

        EventDispatcher::new(Arc::new(set)).startup(Command::Serve, true);

        assert_eq!(*log.lock(), ["a:startup:serve:true", "b:startup:serve:true"]);
    }

    #[test]
    fn test_shutdown_fires_once() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = EventDispatcher::new(Arc::new(PluginSet::new().with(recorder("a", &log, false))));

        {
            let _guard = dispatcher.shutdown_guard();
            dispatcher.shutdown();
        }
        dispatcher.shutdown();

        assert_eq!(*log.lock(), ["a:shutdown"]);
    }

    #[test]
    fn test_event_names() {
        assert_eq!(Event::Startup { command: Command::Serve, dirty: false }.name(), "startup");
        assert_eq!(Event::Shutdown.name(), "shutdown");
    }

    #[test]
    fn test_serve_without_server_is_plugin_error() {
        let dispatcher = EventDispatcher::new(Arc::new(Broken));
        assert!(PluginSet::new().is_empty());
        // Config and Rebuilder are only borrowed by the event
        let (config, rebuilder) = crate::serve::tests_support::rebuilder();
        let result = dispatcher.serve(Box::new(NullServer::default()), &config, &rebuilder);
        assert!(matches!(result, Err(ServeError::Plugin(_))));
    }

    #[test]
    fn test_serve_chains_replacement() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let set = PluginSet::new()
            .with(recorder("a", &log, true))
            .with(recorder("b", &log, false));
        let dispatcher = EventDispatcher::new(Arc::new(set));
        let (config, rebuilder) = crate::serve::tests_support::rebuilder();

        let server = dispatcher
            .serve(
                Box::new(NullServer {
                    label: "core",
                    ..Default::default()
                }),
                &config,
                &rebuilder,
            )
            .unwrap();

        assert_eq!(server.describe(), "a");
        assert_eq!(*log.lock(), ["a:serve:core", "b:serve:a"]);
    }
}
