//! Per-build configuration snapshots.

use super::{Config, ConfigError, ConfigLoader, ConfigOverrides};
use crate::plugin::PluginRegistry;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Produces a fresh [`Config`] on every call to [`resolve`](Self::resolve).
///
/// Whatever the loader returns, the resolved `site_dir` is the preview
/// workspace and the effective `watch` list is rebuilt from the file's
/// entries plus the caller's extra paths.
pub struct ConfigResolver {
    loader: Arc<dyn ConfigLoader>,
    config_file: Option<PathBuf>,
    overrides: ConfigOverrides,
    site_dir: PathBuf,
    extra_watch: Arc<[PathBuf]>,
    plugins: Arc<dyn PluginRegistry>,
}

impl ConfigResolver {
    pub fn new(
        loader: Arc<dyn ConfigLoader>,
        config_file: Option<PathBuf>,
        overrides: ConfigOverrides,
        site_dir: &Path,
        extra_watch: Arc<[PathBuf]>,
        plugins: Arc<dyn PluginRegistry>,
    ) -> Self {
        let overrides = ConfigOverrides {
            site_dir: Some(site_dir.to_path_buf()),
            ..overrides
        };
        Self {
            loader,
            config_file,
            overrides,
            site_dir: site_dir.to_path_buf(),
            extra_watch,
            plugins,
        }
    }

    /// Load and finalize a configuration snapshot.
    pub fn resolve(&self) -> Result<Config, ConfigError> {
        let mut config = self
            .loader
            .load(self.config_file.as_deref(), &self.overrides)?;

        config.site_dir = self.site_dir.clone();
        config.watch = merge_watch(config.file_watch.as_deref(), &self.extra_watch);
        config.plugins = Arc::clone(&self.plugins);

        // Loader implementations other than TomlLoader may skip URL checks
        config.mount_path()?;

        Ok(config)
    }
}

/// Merge the config file's `watch` entries with caller-supplied paths.
///
/// Precedence: file entries first, in file order, then extra paths in the
/// order given. Duplicates keep their first position. An unset `watch` and
/// an explicit `watch = []` both contribute nothing here; the distinction
/// stays visible through [`Config::file_watch`].
pub fn merge_watch(file_watch: Option<&[PathBuf]>, extra: &[PathBuf]) -> Vec<PathBuf> {
    let mut merged: Vec<PathBuf> = Vec::new();
    for path in file_watch.unwrap_or_default().iter().chain(extra) {
        if !merged.contains(path) {
            merged.push(path.clone());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::PluginSet;
    use parking_lot::Mutex;

    /// Loader returning a fixed config and recording the overrides it saw.
    struct StubLoader {
        file_watch: Option<Vec<PathBuf>>,
        seen: Mutex<Vec<ConfigOverrides>>,
    }

    impl ConfigLoader for StubLoader {
        fn load(
            &self,
            _path: Option<&Path>,
            overrides: &ConfigOverrides,
        ) -> Result<Config, ConfigError> {
            self.seen.lock().push(overrides.clone());
            Ok(Config {
                site_dir: PathBuf::from("/caller/site"),
                file_watch: self.file_watch.clone(),
                watch: vec![PathBuf::from("/stale")],
                ..Config::default()
            })
        }
    }

    fn resolver(file_watch: Option<Vec<PathBuf>>, extra: &[&str]) -> (ConfigResolver, Arc<StubLoader>) {
        let loader = Arc::new(StubLoader {
            file_watch,
            seen: Mutex::new(Vec::new()),
        });
        let extra: Arc<[PathBuf]> = extra.iter().map(PathBuf::from).collect();
        let resolver = ConfigResolver::new(
            loader.clone(),
            None,
            ConfigOverrides {
                site_dir: Some(PathBuf::from("/ignored")),
                ..Default::default()
            },
            Path::new("/tmp/livedoc_ws"),
            extra,
            Arc::new(PluginSet::default()),
        );
        (resolver, loader)
    }

    #[test]
    fn test_site_dir_is_always_workspace() {
        let (resolver, loader) = resolver(None, &[]);
        let config = resolver.resolve().unwrap();

        assert_eq!(config.site_dir, PathBuf::from("/tmp/livedoc_ws"));
        assert_eq!(
            loader.seen.lock()[0].site_dir,
            Some(PathBuf::from("/tmp/livedoc_ws"))
        );
    }

    #[test]
    fn test_watch_is_file_then_extra() {
        let (resolver, _) = resolver(Some(vec!["/a".into(), "/b".into()]), &["/c", "/a"]);
        let config = resolver.resolve().unwrap();
        assert_eq!(
            config.watch,
            vec![PathBuf::from("/a"), PathBuf::from("/b"), PathBuf::from("/c")]
        );
    }

    #[test]
    fn test_watch_unset_and_empty_merge_alike() {
        let (unset, _) = resolver(None, &["/x"]);
        let (empty, _) = resolver(Some(vec![]), &["/x"]);

        let unset = unset.resolve().unwrap();
        let empty = empty.resolve().unwrap();

        assert_eq!(unset.watch, empty.watch);
        assert!(unset.file_watch.is_none());
        assert_eq!(empty.file_watch, Some(vec![]));
    }

    #[test]
    fn test_repeated_resolve_does_not_accumulate() {
        let (resolver, _) = resolver(Some(vec!["/a".into()]), &["/b"]);
        let first = resolver.resolve().unwrap();
        let second = resolver.resolve().unwrap();
        assert_eq!(first.watch, second.watch);
        assert_eq!(second.watch.len(), 2);
    }

    #[test]
    fn test_merge_watch_dedup() {
        let a = PathBuf::from("/a");
        assert_eq!(
            merge_watch(Some(&[a.clone(), a.clone()][..]), &[a.clone()]),
            vec![a]
        );
        assert!(merge_watch(None, &[]).is_empty());
    }
}
