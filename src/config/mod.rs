//! Configuration management for `livedoc.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── error.rs    # ConfigError
//! ├── loader.rs   # ConfigLoader trait, TomlLoader (file format)
//! ├── resolve.rs  # ConfigResolver (per-build snapshots)
//! ├── util.rs     # URL and path helpers
//! └── mod.rs      # Config (this file)
//! ```
//!
//! # Example
//!
//! ```toml
//! site_name = "My Docs"
//! site_url = "https://example.com/docs/"
//! docs_dir = "docs"
//! dev_addr = "127.0.0.1:8000"
//! strict = false
//! watch = ["snippets"]
//!
//! [theme]
//! name = "default"
//! custom_dir = "overrides"
//! ```

mod error;
mod loader;
mod resolve;
mod util;

pub use error::ConfigError;
pub use loader::{ConfigLoader, TomlLoader};
pub use resolve::ConfigResolver;
pub use util::{local_site_url, mount_path};

use crate::plugin::{PluginRegistry, PluginSet};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

/// Default listen address, `127.0.0.1:8000`.
pub const DEFAULT_DEV_ADDR: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8000);

// ============================================================================
// Config
// ============================================================================

/// Resolved settings for one build pass.
///
/// Produced by [`ConfigResolver::resolve`]. All paths are absolute.
#[derive(Clone)]
pub struct Config {
    /// Absolute path to the config file
    pub config_file_path: PathBuf,

    /// Site title used by page templates
    pub site_name: String,

    /// Production URL of the site; the preview rewrites it to the local server
    pub site_url: Option<String>,

    /// Markdown source directory
    pub docs_dir: PathBuf,

    /// Output directory; always the preview workspace once resolved
    pub site_dir: PathBuf,

    /// Listen address of the preview server
    pub dev_addr: SocketAddr,

    /// Turn warnings (broken links, unknown config keys) into errors
    pub strict: bool,

    pub theme: ThemeConfig,

    /// `watch` exactly as the config file declared it.
    ///
    /// `None` when the key is absent, `Some(vec![])` for an explicit `watch = []`.
    pub file_watch: Option<Vec<PathBuf>>,

    /// Effective extra watch paths: file entries followed by caller-supplied
    /// paths, see [`merge_watch`](resolve::merge_watch).
    pub watch: Vec<PathBuf>,

    /// Plugin registry receiving lifecycle events
    pub plugins: Arc<dyn PluginRegistry>,
}

impl Config {
    /// Listen host.
    pub fn host(&self) -> IpAddr {
        self.dev_addr.ip()
    }

    /// Listen port.
    pub fn port(&self) -> u16 {
        self.dev_addr.port()
    }

    /// URL sub-path the preview is served under, derived from `site_url`.
    pub fn mount_path(&self) -> Result<String, ConfigError> {
        mount_path(self.site_url.as_deref())
    }

    /// Point `site_url` at the preview server, keeping the mount path.
    ///
    /// Applying it twice gives the same URL.
    pub fn use_local_site_url(&mut self) -> Result<(), ConfigError> {
        let mount_path = self.mount_path()?;
        self.site_url = Some(local_site_url(self.dev_addr, &mount_path));
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_file_path: PathBuf::new(),
            site_name: String::new(),
            site_url: None,
            docs_dir: PathBuf::new(),
            site_dir: PathBuf::new(),
            dev_addr: DEFAULT_DEV_ADDR,
            strict: false,
            theme: ThemeConfig::default(),
            file_watch: None,
            watch: Vec::new(),
            plugins: Arc::new(PluginSet::default()),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("config_file_path", &self.config_file_path)
            .field("site_name", &self.site_name)
            .field("site_url", &self.site_url)
            .field("docs_dir", &self.docs_dir)
            .field("site_dir", &self.site_dir)
            .field("dev_addr", &self.dev_addr)
            .field("strict", &self.strict)
            .field("theme", &self.theme)
            .field("file_watch", &self.file_watch)
            .field("watch", &self.watch)
            .finish_non_exhaustive()
    }
}

/// Resolved theme settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeConfig {
    pub name: String,
    pub custom_dir: Option<PathBuf>,
    /// Existing theme directories, highest priority first
    pub dirs: Vec<PathBuf>,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            custom_dir: None,
            dirs: Vec::new(),
        }
    }
}

// ============================================================================
// Overrides
// ============================================================================

/// Settings that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub dev_addr: Option<SocketAddr>,
    pub strict: Option<bool>,
    pub theme: Option<String>,
    pub theme_dir: Option<PathBuf>,
    pub site_dir: Option<PathBuf>,
}
