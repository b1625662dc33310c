//! Live reload modes and command names.

use clap::ValueEnum;

/// How the preview server reacts to source changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LiveReloadMode {
    /// Watch sources, rebuild everything on change, refresh the browser.
    #[default]
    Live,
    /// Watch sources, rebuild only stale pages, refresh the browser.
    Dirty,
    /// Build once and serve the result statically.
    Disabled,
}

impl LiveReloadMode {
    /// Whether the server watches sources and pushes reloads.
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Live | Self::Dirty)
    }

    /// Whether rebuilds reuse previous output.
    pub const fn is_dirty(self) -> bool {
        matches!(self, Self::Dirty)
    }
}

/// Command reported to plugins in the `startup` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Serve,
}

impl Command {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Serve => "serve",
        }
    }
}
