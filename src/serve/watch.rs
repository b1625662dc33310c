//! File watching and rebuild triggering.
//!
//! ```text
//! notify → WatchRoots → Debouncer → Rebuilder::rebuild → ReloadState::bump
//! ```

use super::debouncer::Debouncer;
use super::reload::ReloadState;
use super::watch_roots::WatchRoots;
use crate::build::Rebuilder;
use crate::{debug, log};
use crossbeam::channel::{self, Sender, select};
use notify::RecommendedWatcher;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// A running watcher thread.
pub(super) struct WatchThread {
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl WatchThread {
    /// Start watching `paths`. Missing paths are skipped.
    pub(super) fn spawn(
        paths: &[PathBuf],
        rebuilder: Rebuilder,
        reload: Arc<ReloadState>,
    ) -> notify::Result<Self> {
        let (event_tx, event_rx) = channel::unbounded::<notify::Result<notify::Event>>();
        let mut watcher: RecommendedWatcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let _ = event_tx.send(res);
        })?;

        let mut roots = WatchRoots::new(paths);
        roots.attach_existing(&mut watcher)?;

        let (stop_tx, stop_rx) = channel::bounded::<()>(1);
        let handle = thread::Builder::new()
            .name("livedoc-watch".into())
            .spawn(move || {
                // Dropped with the thread, which stops notify
                let mut watcher = watcher;
                let mut debouncer = Debouncer::new();
                loop {
                    select! {
                        recv(stop_rx) -> _ => break,
                        recv(event_rx) -> msg => match msg {
                            Ok(Ok(event)) => {
                                if let Some(event) = roots.filter(event) {
                                    debouncer.add_event(&event);
                                }
                            }
                            Ok(Err(e)) => log!("watch"; "notify error: {}", e),
                            Err(_) => break,
                        },
                        default(debouncer.sleep_duration()) => {
                            roots.maintain(&mut watcher);
                            if let Some(changed) = debouncer.take_if_ready() {
                                rebuild(&rebuilder, &reload, &changed);
                            }
                        }
                    }
                }
                debug!("watch"; "stopped");
            })
            .map_err(notify::Error::io)?;

        Ok(Self {
            stop_tx,
            handle: Some(handle),
        })
    }

    /// Stop the thread and wait for an in-flight rebuild to finish.
    pub(super) fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        let _ = self.stop_tx.try_send(());
        if handle.join().is_err() {
            log!("watch"; "watcher thread panicked");
        }
    }
}

impl Drop for WatchThread {
    fn drop(&mut self) {
        self.stop();
    }
}

fn rebuild(rebuilder: &Rebuilder, reload: &ReloadState, changed: &[PathBuf]) {
    let summary = summarize(changed);
    debug!("watch"; "rebuilding after {}", summary);

    match rebuilder.rebuild(changed) {
        Ok(()) if rebuilder.orchestrator().is_closed() => {}
        Ok(()) => {
            reload.bump();
            rebuilder.status().success(&format!("rebuilt: {summary}"));
        }
        Err(e) => rebuilder.status().error("rebuild failed", &e.to_string()),
    }
}

/// `a.md` or `a.md (+2 more)`.
fn summarize(changed: &[PathBuf]) -> String {
    let name = |path: &Path| {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string())
    };
    match changed {
        [] => "no changes".to_string(),
        [one] => name(one),
        [first, rest @ ..] => format!("{} (+{} more)", name(first), rest.len()),
    }
}
