//! Request URL to workspace file resolution.

use percent_encoding::percent_decode_str;
use std::path::{Path, PathBuf};

/// Where a request URL leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Redirect to the mount path
    Redirect(String),
    /// Existing file inside the served root
    File(PathBuf),
    NotFound,
}

/// Route a request URL against a root mounted under `mount_path`.
pub fn route(url: &str, root: &Path, mount_path: &str) -> Route {
    let path = strip_query(url);

    if mount_path != "/" && (path == "/" || path == mount_path.trim_end_matches('/')) {
        return Route::Redirect(mount_path.to_string());
    }

    let Some(rest) = path.strip_prefix(mount_path.trim_end_matches('/')) else {
        return Route::NotFound;
    };
    if !rest.is_empty() && !rest.starts_with('/') {
        // `/docsfoo` is not under `/docs/`
        return Route::NotFound;
    }

    resolve_path(rest, root).map_or(Route::NotFound, Route::File)
}

/// Resolve a URL path to a file under `serve_root`.
///
/// Directories resolve to their `index.html`. Anything escaping the root,
/// through `..` or a symlink, resolves to nothing.
pub fn resolve_path(url: &str, serve_root: &Path) -> Option<PathBuf> {
    let clean = normalize_url(url)?;
    if clean.split('/').any(|segment| segment == "..") {
        return None;
    }

    let canonical = serve_root.join(&clean).canonicalize().ok()?;
    let root_canonical = serve_root.canonicalize().ok()?;
    if !canonical.starts_with(&root_canonical) {
        return None;
    }

    if canonical.is_file() {
        return Some(canonical);
    }

    let index = canonical.join("index.html");
    index.is_file().then_some(index)
}

fn strip_query(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url)
}

/// Percent-decode and trim slashes. `None` when the decoded path is not UTF-8.
fn normalize_url(url: &str) -> Option<String> {
    let decoded = percent_decode_str(strip_query(url)).decode_utf8().ok()?;
    Some(decoded.trim_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn make_root() -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("index.html"), "home").unwrap();
        fs::create_dir_all(temp.path().join("guide")).unwrap();
        fs::write(temp.path().join("guide/index.html"), "guide").unwrap();
        fs::write(temp.path().join("guide/my page.html"), "spaced").unwrap();
        temp
    }

    fn file(root: &TempDir, rel: &str) -> Route {
        Route::File(root.path().join(rel).canonicalize().unwrap())
    }

    #[test]
    fn test_route_at_root() {
        let root = make_root();
        assert_eq!(route("/", root.path(), "/"), file(&root, "index.html"));
        assert_eq!(route("/guide/", root.path(), "/"), file(&root, "guide/index.html"));
        assert_eq!(route("/guide?x=1", root.path(), "/"), file(&root, "guide/index.html"));
        assert_eq!(route("/guide/my%20page.html", root.path(), "/"), file(&root, "guide/my page.html"));
        assert_eq!(route("/missing.html", root.path(), "/"), Route::NotFound);
    }

    #[test]
    fn test_invalid_utf8_is_not_found() {
        let root = make_root();
        assert_eq!(route("/%FF", root.path(), "/"), Route::NotFound);
        assert_eq!(route("/guide/%C3%28", root.path(), "/"), Route::NotFound);
        assert_eq!(normalize_url("/%FF"), None);
    }

    #[test]
    fn test_route_under_mount_path() {
        let root = make_root();
        assert_eq!(route("/", root.path(), "/docs/"), Route::Redirect("/docs/".into()));
        assert_eq!(route("/docs", root.path(), "/docs/"), Route::Redirect("/docs/".into()));
        assert_eq!(route("/docs/", root.path(), "/docs/"), file(&root, "index.html"));
        assert_eq!(route("/docs/guide/", root.path(), "/docs/"), file(&root, "guide/index.html"));
        assert_eq!(route("/guide/", root.path(), "/docs/"), Route::NotFound);
        assert_eq!(route("/docsguide/", root.path(), "/docs/"), Route::NotFound);
    }

    #[test]
    fn test_traversal_is_rejected() {
        let root = make_root();
        let inner = root.path().join("guide");
        assert!(resolve_path("/../index.html", &inner).is_none());
        assert!(resolve_path("/%2e%2e/index.html", &inner).is_none());
    }

    #[test]
    fn test_directory_without_index() {
        let root = make_root();
        fs::create_dir_all(root.path().join("empty")).unwrap();
        assert!(resolve_path("/empty/", root.path()).is_none());
    }
}
