//! Preview server contract.

use crate::build::Rebuilder;
use crate::core::ShutdownSignal;
use std::io;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Maps an HTTP status code to a custom error page body.
///
/// `None` falls back to the server's default response.
pub type ErrorHandler = Arc<dyn Fn(u16) -> Option<Vec<u8>> + Send + Sync>;

/// Where and how a preview server listens.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub host: IpAddr,
    pub port: u16,
    /// Directory served
    pub root: PathBuf,
    /// URL prefix the root is mounted under, `/` or `/sub/`
    pub mount_path: String,
    /// Inject the reload script and run rebuilds on change
    pub live_reload: bool,
}

/// How a [`PreviewServer::serve`] call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeExit {
    /// Shutdown was requested
    Interrupted,
    /// The request loop ended on its own
    Finished,
}

/// A running preview server.
pub trait PreviewServer: Send {
    /// Watch `path` for changes, triggering a rebuild.
    fn watch(&mut self, path: &Path);

    /// Paths registered so far, in registration order.
    fn watched(&self) -> &[PathBuf];

    fn set_error_handler(&mut self, handler: ErrorHandler);

    /// Block serving requests.
    fn serve(&mut self) -> io::Result<ServeExit>;

    /// Stop serving and watching. Safe to call more than once.
    fn shutdown(&mut self);

    /// Short label for logs.
    fn describe(&self) -> String {
        "preview server".to_string()
    }
}

/// Constructs preview servers.
pub trait ServerFactory: Send + Sync {
    /// Bind a server; `rebuild` runs for every batch of changed paths.
    fn construct(
        &self,
        rebuild: Rebuilder,
        options: ServerOptions,
        signal: &ShutdownSignal,
    ) -> io::Result<Box<dyn PreviewServer>>;
}
