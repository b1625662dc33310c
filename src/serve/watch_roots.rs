//! Watch roots that survive editors replacing files.
//!
//! A watch on a single file follows its inode, so a save that renames a new
//! file over the old one silently ends it. File roots are therefore watched
//! through their parent directory and events are filtered back down to the
//! requested paths. Directory roots are watched recursively and re-attached
//! when they are removed and recreated.

use crate::debug;
use crate::log;
use crate::utils::path::normalize_path;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};

pub(super) struct WatchRoots {
    dirs: Vec<PathBuf>,
    files: Vec<PathBuf>,
    /// What is actually handed to notify
    targets: Vec<(PathBuf, RecursiveMode)>,
    attached: FxHashSet<PathBuf>,
}

impl WatchRoots {
    /// Classify `paths`. Missing paths are skipped.
    pub(super) fn new(paths: &[PathBuf]) -> Self {
        let mut dirs = Vec::new();
        let mut files = Vec::new();
        for path in paths {
            if !path.exists() {
                log!("watch"; "skipping missing path {}", path.display());
                continue;
            }
            let path = normalize_path(path);
            let list = if path.is_dir() { &mut dirs } else { &mut files };
            if !list.contains(&path) {
                list.push(path);
            }
        }

        let mut targets: Vec<(PathBuf, RecursiveMode)> =
            dirs.iter().map(|dir| (dir.clone(), RecursiveMode::Recursive)).collect();
        for file in &files {
            if dirs.iter().any(|dir| file.starts_with(dir)) {
                continue;
            }
            let Some(parent) = file.parent() else {
                continue;
            };
            if !targets.iter().any(|(target, _)| target == parent) {
                targets.push((parent.to_path_buf(), RecursiveMode::NonRecursive));
            }
        }

        Self {
            dirs,
            files,
            targets,
            attached: FxHashSet::default(),
        }
    }

    pub(super) fn attach_existing(&mut self, watcher: &mut RecommendedWatcher) -> notify::Result<()> {
        for (target, mode) in &self.targets {
            watcher.watch(target, *mode)?;
            self.attached.insert(target.clone());
            debug!("watch"; "watching {}", target.display());
        }
        Ok(())
    }

    /// Whether a changed path belongs to a requested root.
    pub(super) fn covers(&self, path: &Path) -> bool {
        self.dirs.iter().any(|dir| path.starts_with(dir)) || self.files.iter().any(|file| file == path)
    }

    /// Narrow an event to covered paths; `None` when nothing is left.
    pub(super) fn filter(&mut self, mut event: notify::Event) -> Option<notify::Event> {
        if matches!(event.kind, EventKind::Remove(_)) {
            // The watch on a removed target is gone even if it reappears
            self.attached.retain(|target| !event.paths.contains(target));
        }
        event.paths.retain(|path| self.covers(path));
        (!event.paths.is_empty()).then_some(event)
    }

    /// Re-attach targets that were removed and recreated.
    pub(super) fn maintain(&mut self, watcher: &mut RecommendedWatcher) {
        self.attached.retain(|target| target.exists());

        for (target, mode) in &self.targets {
            if self.attached.contains(target) || !target.exists() {
                continue;
            }
            if watcher.watch(target, *mode).is_ok() {
                self.attached.insert(target.clone());
                debug!("watch"; "re-attached watch: {}", target.display());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, RemoveKind};
    use std::fs;

    fn roots(paths: &[PathBuf]) -> WatchRoots {
        WatchRoots::new(paths)
    }

    #[test]
    fn test_file_roots_watch_their_parent() {
        let temp = tempfile::tempdir().unwrap();
        let config = temp.path().join("livedoc.toml");
        fs::write(&config, "").unwrap();

        let roots = roots(&[config]);
        let parent = normalize_path(temp.path());
        assert_eq!(roots.targets.len(), 1);
        assert_eq!(roots.targets[0].0, parent);
        assert_eq!(roots.targets[0].1, RecursiveMode::NonRecursive);
    }

    #[test]
    fn test_file_inside_dir_root_adds_no_target() {
        let temp = tempfile::tempdir().unwrap();
        let docs = temp.path().join("docs");
        fs::create_dir(&docs).unwrap();
        fs::write(docs.join("index.md"), "").unwrap();

        let roots = roots(&[docs.clone(), docs.join("index.md"), docs]);
        assert_eq!(roots.targets.len(), 1);
        assert_eq!(roots.targets[0].1, RecursiveMode::Recursive);
    }

    #[test]
    fn test_filter_keeps_only_requested_paths() {
        let temp = tempfile::tempdir().unwrap();
        let config = temp.path().join("livedoc.toml");
        let docs = temp.path().join("docs");
        fs::write(&config, "").unwrap();
        fs::create_dir(&docs).unwrap();

        let mut roots = roots(&[docs, config]);
        let parent = normalize_path(temp.path());

        let event = notify::Event::new(EventKind::Create(CreateKind::File))
            .add_path(parent.join("livedoc.toml.new"))
            .add_path(parent.join("livedoc.toml"))
            .add_path(parent.join("docs/guide.md"));
        let event = roots.filter(event).unwrap();
        assert_eq!(
            event.paths,
            vec![parent.join("livedoc.toml"), parent.join("docs/guide.md")]
        );

        let unrelated = notify::Event::new(EventKind::Create(CreateKind::File)).add_path(parent.join("notes.txt"));
        assert!(roots.filter(unrelated).is_none());
    }

    #[test]
    fn test_removed_dir_is_reattached_after_recreate() {
        let temp = tempfile::tempdir().unwrap();
        let docs = temp.path().join("docs");
        fs::create_dir(&docs).unwrap();

        let mut roots = roots(&[docs.clone()]);
        let mut watcher = notify::recommended_watcher(|_: notify::Result<notify::Event>| {}).unwrap();
        roots.attach_existing(&mut watcher).unwrap();

        let target = normalize_path(&docs);
        fs::remove_dir(&docs).unwrap();
        let removed = notify::Event::new(EventKind::Remove(RemoveKind::Folder)).add_path(target.clone());
        assert!(roots.filter(removed).is_some());
        assert!(!roots.attached.contains(&target));

        roots.maintain(&mut watcher);
        assert!(!roots.attached.contains(&target));

        fs::create_dir(&docs).unwrap();
        roots.maintain(&mut watcher);
        assert!(roots.attached.contains(&target));
    }
}
