//! Path normalization utilities.

use std::path::{Path, PathBuf};

/// Normalize a file system path to absolute form.
///
/// Tries `canonicalize()` first (resolves symlinks, `.`, `..`).
/// Falls back to:
/// - Return as-is if already absolute
/// - Join with current directory if relative
#[inline]
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_existing_path() {
        let temp = tempfile::tempdir().unwrap();
        let normalized = normalize_path(temp.path());
        assert!(normalized.is_absolute());
        assert_eq!(normalized, temp.path().canonicalize().unwrap());
    }

    #[test]
    fn test_normalize_missing_absolute_path() {
        let path = Path::new("/definitely/not/here.md");
        assert_eq!(normalize_path(path), path);
    }

    #[test]
    fn test_normalize_missing_relative_path() {
        let normalized = normalize_path(Path::new("not-here.md"));
        assert!(normalized.is_absolute());
        assert!(normalized.ends_with("not-here.md"));
    }
}
