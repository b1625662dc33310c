//! Shutdown signalling for serve mode.
//!
//! A `ShutdownSignal` is created once in `main`, carried by the `Context`,
//! and cloned into whatever blocks (the HTTP loop, long-poll requests).
//! Cancellation is cooperative: `cancel()` flips the flag and runs every
//! registered hook, which is how a blocked `recv()` gets unblocked.

use crate::logger::StatusLine;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

type CancelHook = Box<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct SignalInner {
    cancelled: AtomicBool,
    hooks: Mutex<Vec<CancelHook>>,
}

/// Cooperative cancellation flag with unblock hooks.
#[derive(Clone, Default)]
pub struct ShutdownSignal {
    inner: Arc<SignalInner>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown. Hooks run once, on the first call.
    pub fn cancel(&self) {
        if self.inner.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        for hook in self.inner.hooks.lock().iter() {
            hook();
        }
    }

    /// Check if shutdown has been requested
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Register a hook to run on cancellation.
    ///
    /// Runs immediately if the signal was already cancelled.
    pub fn on_cancel(&self, hook: impl Fn() + Send + Sync + 'static) {
        let mut hooks = self.inner.hooks.lock();
        if self.is_cancelled() {
            drop(hooks);
            hook();
            return;
        }
        hooks.push(Box::new(hook));
    }
}

impl std::fmt::Debug for ShutdownSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownSignal")
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Per-process state threaded through the serve command.
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub shutdown: ShutdownSignal,
    /// Rebuild status block shown while watching
    pub status: StatusLine,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Route Ctrl+C to the given signal. Call once at program start.
pub fn setup_shutdown_handler(signal: &ShutdownSignal) -> anyhow::Result<()> {
    let signal = signal.clone();
    ctrlc::set_handler(move || {
        if !signal.is_cancelled() {
            // Keep the next log line off the `^C` echo
            println!();
        }
        signal.cancel();
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}
