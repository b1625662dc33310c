//! Build error types.

use std::path::PathBuf;
use thiserror::Error;

/// A defect in a page template. Actionable by the author, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("template error in `{template}` (line {line}): {message}")]
pub struct TemplateError {
    pub template: String,
    pub line: usize,
    pub message: String,
}

impl TemplateError {
    pub fn new(template: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            line,
            message: message.into(),
        }
    }
}

/// Errors raised by a [`Builder`](super::Builder).
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("I/O error at `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    /// Content problem promoted to an error (strict mode).
    #[error("{0}")]
    Content(String),
}

/// Shorthand for `map_err(io_error(path))`.
pub(crate) fn io_error(path: &std::path::Path) -> impl FnOnce(std::io::Error) -> BuildError + '_ {
    move |err| BuildError::Io(path.to_path_buf(), err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_error_display() {
        let err = TemplateError::new("main.html", 7, "unterminated `{{`");
        assert_eq!(
            err.to_string(),
            "template error in `main.html` (line 7): unterminated `{{`"
        );
    }

    #[test]
    fn test_build_error_from_template() {
        let err: BuildError = TemplateError::new("t", 1, "m").into();
        assert!(matches!(err, BuildError::Template(_)));
    }
}
