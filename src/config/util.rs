//! Configuration utility functions.

use super::ConfigError;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Extract the mount path from a site URL.
///
/// The result always starts and ends with `/`. An unset URL mounts at root.
///
/// # Examples
/// ```ignore
/// mount_path(None)                               -> Ok("/")
/// mount_path(Some("https://example.com"))        -> Ok("/")
/// mount_path(Some("https://example.com/docs/"))  -> Ok("/docs/")
/// mount_path(Some("https://example.com/a/b"))    -> Ok("/a/b/")
/// mount_path(Some("invalid"))                    -> Err(..)
/// ```
pub fn mount_path(site_url: Option<&str>) -> Result<String, ConfigError> {
    let Some(site_url) = site_url else {
        return Ok("/".to_string());
    };

    let parsed = url::Url::parse(site_url)
        .map_err(|e| ConfigError::Validation(format!("invalid site_url `{site_url}`: {e}")))?;

    let path = parsed.path().trim_matches('/');
    if path.is_empty() {
        Ok("/".to_string())
    } else {
        Ok(format!("/{path}/"))
    }
}

/// Site URL pointing at the local preview server.
///
/// `http://{host}:{port}{mount_path}`; IPv6 hosts are bracketed.
pub fn local_site_url(dev_addr: SocketAddr, mount_path: &str) -> String {
    format!("http://{dev_addr}{mount_path}")
}

/// Find config file by searching upward from current directory
///
/// ```text
/// /home/user/site/docs/guide/  ← cwd
/// /home/user/site/livedoc.toml ← found!
/// ```
pub fn find_config_file(config_name: &Path) -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;

    if config_name.is_absolute() {
        return config_name.exists().then(|| config_name.to_path_buf());
    }

    let mut current = cwd.as_path();
    loop {
        let candidate = current.join(config_name);
        if candidate.exists() {
            return Some(candidate);
        }

        match current.parent() {
            Some(parent) => current = parent,
            None => return None,
        }
    }
}

/// Expand `~` and resolve relative paths against `root`.
pub fn resolve_against(path: &Path, root: &Path) -> PathBuf {
    let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
    let path = PathBuf::from(expanded);
    let full_path = if path.is_relative() {
        root.join(&path)
    } else {
        path
    };
    crate::utils::path::normalize_path(&full_path)
}
