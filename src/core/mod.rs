//! Core types shared across the serve pipeline.

mod mode;
mod state;

pub use mode::{Command, LiveReloadMode};
pub use state::{Context, ShutdownSignal, setup_shutdown_handler};
