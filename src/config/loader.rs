//! Config file loading.
//!
//! [`TomlLoader`] reads `livedoc.toml`, applies [`ConfigOverrides`] and
//! normalizes every path against the config file's directory.

use super::util::{find_config_file, resolve_against};
use super::{Config, ConfigError, ConfigOverrides, DEFAULT_DEV_ADDR, ThemeConfig};
use crate::{log, utils::path::normalize_path};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Config file name searched for when no path is given.
pub const DEFAULT_CONFIG_NAME: &str = "livedoc.toml";

/// Produces a [`Config`] from a config file and overrides.
pub trait ConfigLoader: Send + Sync {
    /// `path` of `None` means "find the default config file".
    fn load(&self, path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Config, ConfigError>;
}

// ============================================================================
// file format
// ============================================================================

/// Raw `livedoc.toml` contents.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct ConfigFile {
    site_name: String,
    site_url: Option<String>,
    docs_dir: PathBuf,
    dev_addr: SocketAddr,
    strict: bool,
    watch: Option<Vec<PathBuf>>,
    theme: ThemeFile,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            site_name: String::new(),
            site_url: None,
            docs_dir: PathBuf::from("docs"),
            dev_addr: DEFAULT_DEV_ADDR,
            strict: false,
            watch: None,
            theme: ThemeFile::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ThemeFile {
    name: String,
    custom_dir: Option<PathBuf>,
}

impl Default for ThemeFile {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            custom_dir: None,
        }
    }
}

impl ConfigFile {
    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let file = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((file, ignored))
    }
}

// ============================================================================
// TomlLoader
// ============================================================================

/// Loads `livedoc.toml` from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlLoader;

impl ConfigLoader for TomlLoader {
    fn load(&self, path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Config, ConfigError> {
        let path = match path {
            Some(path) if path.exists() => normalize_path(path),
            Some(path) => return Err(ConfigError::NotFound(path.to_path_buf())),
            None => find_config_file(Path::new(DEFAULT_CONFIG_NAME))
                .map(|p| normalize_path(&p))
                .ok_or_else(|| ConfigError::NotFound(PathBuf::from(DEFAULT_CONFIG_NAME)))?,
        };

        let content = fs::read_to_string(&path).map_err(|err| ConfigError::Io(path.clone(), err))?;
        let (file, ignored) = ConfigFile::parse_with_ignored(&content)?;

        let strict = overrides.strict.unwrap_or(file.strict);
        if !ignored.is_empty() {
            if strict {
                return Err(ConfigError::Validation(format!(
                    "unknown fields in {}: {}",
                    path.display(),
                    ignored.join(", ")
                )));
            }
            log!("warning"; "ignoring unknown fields in {}: {}", path.display(), ignored.join(", "));
        }

        let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
        build_config(file, path, &root, strict, overrides)
    }
}

/// Normalize a parsed file into a [`Config`].
fn build_config(
    file: ConfigFile,
    config_file_path: PathBuf,
    root: &Path,
    strict: bool,
    overrides: &ConfigOverrides,
) -> Result<Config, ConfigError> {
    let docs_dir = resolve_against(&file.docs_dir, root);
    if !docs_dir.is_dir() {
        return Err(ConfigError::Validation(format!(
            "docs_dir `{}` does not exist",
            docs_dir.display()
        )));
    }

    // Surface a malformed URL now rather than at first build
    super::mount_path(file.site_url.as_deref())?;

    let theme = resolve_theme(file.theme, root, overrides)?;
    let file_watch = file
        .watch
        .map(|paths| paths.iter().map(|p| resolve_against(p, root)).collect::<Vec<_>>());
    let site_dir = overrides
        .site_dir
        .clone()
        .unwrap_or_else(|| root.join("site"));

    Ok(Config {
        config_file_path,
        site_name: file.site_name,
        site_url: file.site_url,
        docs_dir,
        site_dir,
        dev_addr: overrides.dev_addr.unwrap_or(file.dev_addr),
        strict,
        theme,
        watch: file_watch.clone().unwrap_or_default(),
        file_watch,
        ..Config::default()
    })
}

/// Resolve theme name and directories: `[custom_dir?, <root>/themes/<name>?]`.
fn resolve_theme(
    file: ThemeFile,
    root: &Path,
    overrides: &ConfigOverrides,
) -> Result<ThemeConfig, ConfigError> {
    let name = overrides.theme.clone().unwrap_or(file.name);
    let custom_dir = overrides
        .theme_dir
        .as_ref()
        .or(file.custom_dir.as_ref())
        .map(|dir| resolve_against(dir, root));

    let mut dirs = Vec::new();
    if let Some(dir) = &custom_dir {
        if !dir.is_dir() {
            return Err(ConfigError::Validation(format!(
                "theme custom_dir `{}` does not exist",
                dir.display()
            )));
        }
        dirs.push(dir.clone());
    }

    let named = root.join("themes").join(&name);
    if named.is_dir() {
        dirs.push(normalize_path(&named));
    }

    Ok(ThemeConfig {
        name,
        custom_dir,
        dirs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use tempfile::TempDir;

    /// Write `livedoc.toml` with `content` and a `docs/` dir into a temp site.
    fn make_site(content: &str) -> (TempDir, PathBuf) {
        let temp = TempDir::new().unwrap();
        let root = normalize_path(temp.path());
        fs::create_dir_all(root.join("docs")).unwrap();
        let config_path = root.join(DEFAULT_CONFIG_NAME);
        fs::write(&config_path, content).unwrap();
        (temp, config_path)
    }

    fn load(path: &Path, overrides: &ConfigOverrides) -> Result<Config, ConfigError> {
        TomlLoader.load(Some(path), overrides)
    }

    #[test]
    fn test_load_defaults() {
        let (_temp, path) = make_site("site_name = \"Test\"");
        let config = load(&path, &ConfigOverrides::default()).unwrap();
        let root = path.parent().unwrap();

        assert_eq!(config.site_name, "Test");
        assert_eq!(config.config_file_path, path);
        assert_eq!(config.docs_dir, root.join("docs"));
        assert_eq!(config.dev_addr, DEFAULT_DEV_ADDR);
        assert!(config.site_url.is_none());
        assert!(!config.strict);
        assert_eq!(config.theme.name, "default");
        assert!(config.theme.dirs.is_empty());
    }

    #[test]
    fn test_load_overrides_win() {
        let (temp, path) = make_site("dev_addr = \"127.0.0.1:9000\"\nstrict = false");
        let theme_dir = temp.path().join("custom");
        fs::create_dir_all(&theme_dir).unwrap();

        let overrides = ConfigOverrides {
            dev_addr: Some(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 4000)),
            strict: Some(true),
            theme: Some("material".into()),
            theme_dir: Some(theme_dir.clone()),
            site_dir: Some(temp.path().join("out")),
        };
        let config = load(&path, &overrides).unwrap();

        assert_eq!(config.port(), 4000);
        assert_eq!(config.host(), IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert!(config.strict);
        assert_eq!(config.theme.name, "material");
        assert_eq!(config.theme.dirs, vec![normalize_path(&theme_dir)]);
        assert_eq!(config.site_dir, temp.path().join("out"));
    }

    #[test]
    fn test_load_watch_unset_vs_empty() {
        let (_temp, path) = make_site("");
        let config = load(&path, &ConfigOverrides::default()).unwrap();
        assert!(config.file_watch.is_none());
        assert!(config.watch.is_empty());

        let (_temp, path) = make_site("watch = []");
        let config = load(&path, &ConfigOverrides::default()).unwrap();
        assert_eq!(config.file_watch, Some(vec![]));
        assert!(config.watch.is_empty());
    }

    #[test]
    fn test_load_watch_paths_are_absolute() {
        let (_temp, path) = make_site("watch = [\"snippets\"]");
        let config = load(&path, &ConfigOverrides::default()).unwrap();
        let root = path.parent().unwrap();
        assert_eq!(config.watch, vec![root.join("snippets")]);
    }

    #[test]
    fn test_load_named_theme_dir() {
        let (_temp, path) = make_site("[theme]\nname = \"plain\"");
        let root = path.parent().unwrap();
        fs::create_dir_all(root.join("themes/plain")).unwrap();

        let config = load(&path, &ConfigOverrides::default()).unwrap();
        assert_eq!(config.theme.dirs, vec![root.join("themes/plain")]);
    }

    #[test]
    fn test_load_missing_custom_dir() {
        let (_temp, path) = make_site("[theme]\ncustom_dir = \"nope\"");
        let err = load(&path, &ConfigOverrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_load_missing_docs_dir() {
        let (_temp, path) = make_site("docs_dir = \"missing\"");
        let err = load(&path, &ConfigOverrides::default()).unwrap_err();
        assert!(err.to_string().contains("docs_dir"));
    }

    #[test]
    fn test_load_invalid_site_url() {
        let (_temp, path) = make_site("site_url = \"nope\"");
        let err = load(&path, &ConfigOverrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_load_invalid_toml() {
        let (_temp, path) = make_site("[theme\nname = 1");
        let err = load(&path, &ConfigOverrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_load_unknown_fields() {
        let (_temp, path) = make_site("site_name = \"Test\"\nnav = 3");

        // Warning only
        let config = load(&path, &ConfigOverrides::default()).unwrap();
        assert_eq!(config.site_name, "Test");

        // Error under strict
        let strict = ConfigOverrides {
            strict: Some(true),
            ..Default::default()
        };
        let err = load(&path, &strict).unwrap_err();
        assert!(err.to_string().contains("nav"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = TomlLoader
            .load(Some(Path::new("/nonexistent/livedoc.toml")), &ConfigOverrides::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_parse_with_ignored() {
        let (file, ignored) =
            ConfigFile::parse_with_ignored("site_name = \"x\"\n[extra]\nkey = 1").unwrap();
        assert_eq!(file.site_name, "x");
        assert!(ignored.iter().any(|f| f.contains("extra")));
    }
}
