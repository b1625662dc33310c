//! Scratch output directory for a preview session.
//!
//! The workspace is created once before the first build and removed once
//! when the session ends. Removal runs from `Drop`, so every exit path
//! (normal return, `?` propagation, interrupt) cleans up; an explicit
//! [`TempWorkspace::destroy`] beforehand makes the drop a no-op.

use crate::{debug, log};
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Prefix of workspace directory names, to make them easy to spot in `/tmp`.
const PREFIX: &str = "livedoc_";

/// Owned scratch directory holding rendered output.
#[derive(Debug)]
pub struct TempWorkspace {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl TempWorkspace {
    /// Create a workspace under `parent`.
    pub fn create_in(parent: impl AsRef<Path>) -> io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(PREFIX)
            .tempdir_in(parent)?;
        let path = dir.path().to_path_buf();
        debug!("workspace"; "created {}", path.display());
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the directory. Best-effort and idempotent.
    ///
    /// A directory that is already gone is not an error; other failures are
    /// logged and swallowed so they never mask the session's exit cause.
    pub fn destroy(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };

        match dir.close() {
            Ok(()) => debug!("workspace"; "removed {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("workspace"; "{} already removed", self.path.display());
            }
            Err(e) => log!("warning"; "failed to remove {}: {}", self.path.display(), e),
        }
    }

    /// Whether `destroy` has run.
    #[cfg(test)]
    pub fn is_destroyed(&self) -> bool {
        self.dir.is_none()
    }
}

impl Drop for TempWorkspace {
    fn drop(&mut self) {
        self.destroy();
    }
}
