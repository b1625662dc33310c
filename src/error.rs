//! Session-level error taxonomy.

use crate::build::{BuildError, TemplateError};
use crate::config::ConfigError;
use std::io;
use thiserror::Error;

/// Errors ending a preview session.
#[derive(Debug, Error)]
pub enum ServeError {
    /// Fatal before any build or serve work begins.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Content defect; always reaches the caller unchanged.
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Build(BuildError),

    /// Transport or filesystem failure.
    #[error(transparent)]
    Transport(#[from] io::Error),

    #[error("plugin error: {0}")]
    Plugin(String),

    /// User-facing form of a transport or filesystem failure.
    #[error("aborted with {category}: {message}")]
    Abort { category: String, message: String },
}

impl From<BuildError> for ServeError {
    fn from(err: BuildError) -> Self {
        match err {
            BuildError::Template(template) => Self::Template(template),
            other => Self::Build(other),
        }
    }
}

impl ServeError {
    /// Re-present transport and filesystem failures as a single abort.
    ///
    /// Everything else, template errors in particular, passes through.
    pub fn into_abort(self) -> Self {
        match self {
            Self::Transport(e) => Self::abort(&e, e.to_string()),
            Self::Build(BuildError::Io(path, e)) => {
                Self::abort(&e, format!("{}: {}", path.display(), e))
            }
            other => other,
        }
    }

    fn abort(err: &io::Error, message: String) -> Self {
        Self::Abort {
            category: format!("{:?}", err.kind()),
            message,
        }
    }
}
