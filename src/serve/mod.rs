//! Development preview server.
//!
//! # Module Structure
//!
//! ```text
//! serve/
//! ├── lifecycle.rs  # ServerLifecycleManager (build → watch → serve → teardown)
//! ├── server.rs     # PreviewServer / ServerFactory contracts
//! ├── live.rs       # LiveReloadServer (tiny_http)
//! ├── response.rs   # request handling, error pages
//! ├── path.rs       # URL → file resolution under the mount path
//! ├── reload.rs     # build epoch, long-poll endpoint, injected script
//! ├── watch.rs      # notify watcher thread
//! ├── watch_roots.rs # watch targets, re-attach after replace
//! └── debouncer.rs  # event coalescing
//! ```

mod debouncer;
mod lifecycle;
mod live;
mod path;
mod reload;
mod response;
mod server;
mod watch;
mod watch_roots;

pub use lifecycle::{ServeOptions, ServerLifecycleManager};
pub use live::LiveReloadFactory;
pub use server::PreviewServer;
#[cfg(test)]
pub use server::{ErrorHandler, ServeExit};
