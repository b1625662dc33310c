//! Default preview server: `tiny_http` with file watching and live reload.

use super::reload::{ReloadState, parse_poll_url};
use super::response::{self, Site};
use super::server::{ErrorHandler, PreviewServer, ServeExit, ServerFactory, ServerOptions};
use super::watch::WatchThread;
use crate::build::Rebuilder;
use crate::core::ShutdownSignal;
use crate::{debug, log};
use parking_lot::RwLock;
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use tiny_http::{Request, Server};

/// Worker threads answering file requests.
const REQUEST_THREADS: usize = 4;

#[derive(Debug, Default)]
struct StopFlags {
    /// `shutdown()` was called
    interrupted: AtomicBool,
    /// A [`StopHandle`] ended the loop
    finished: AtomicBool,
}

/// Ends a running [`LiveReloadServer::serve`] with [`ServeExit::Finished`].
#[cfg(test)]
#[derive(Clone)]
pub struct StopHandle {
    flags: Arc<StopFlags>,
    http: Weak<Server>,
}

#[cfg(test)]
impl StopHandle {
    pub fn stop(&self) {
        self.flags.finished.store(true, Ordering::SeqCst);
        if let Some(http) = self.http.upgrade() {
            http.unblock();
        }
    }
}

/// HTTP preview server over the workspace.
pub struct LiveReloadServer {
    http: Arc<Server>,
    addr: SocketAddr,
    site: Arc<Site>,
    rebuilder: Rebuilder,
    reload: Arc<ReloadState>,
    live_reload: bool,
    watched: Vec<PathBuf>,
    watcher: Option<WatchThread>,
    signal: ShutdownSignal,
    flags: Arc<StopFlags>,
    shut_down: bool,
}

impl LiveReloadServer {
    /// Bind the listening socket. Requests are answered once `serve` runs.
    pub fn bind(
        rebuilder: Rebuilder,
        options: ServerOptions,
        signal: &ShutdownSignal,
    ) -> io::Result<Self> {
        let requested = SocketAddr::new(options.host, options.port);
        let http = Arc::new(Server::http(requested).map_err(into_io_error)?);
        let addr = http.server_addr().to_ip().unwrap_or(requested);

        let reload = Arc::new(ReloadState::new());
        {
            let http = Arc::downgrade(&http);
            let reload = Arc::clone(&reload);
            signal.on_cancel(move || {
                if let Some(http) = http.upgrade() {
                    http.unblock();
                }
                reload.close();
            });
        }

        let site = Arc::new(Site {
            root: options.root,
            mount_path: options.mount_path,
            reload: options.live_reload.then(|| Arc::clone(&reload)),
            error_handler: RwLock::new(None),
        });

        Ok(Self {
            http,
            addr,
            site,
            rebuilder,
            reload,
            live_reload: options.live_reload,
            watched: Vec::new(),
            watcher: None,
            signal: signal.clone(),
            flags: Arc::new(StopFlags::default()),
            shut_down: false,
        })
    }

    /// Address actually bound (differs from the requested one for port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    #[cfg(test)]
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            flags: Arc::clone(&self.flags),
            http: Arc::downgrade(&self.http),
        }
    }

    fn exit_reason(&self) -> Option<ServeExit> {
        if self.signal.is_cancelled() || self.flags.interrupted.load(Ordering::SeqCst) {
            Some(ServeExit::Interrupted)
        } else if self.flags.finished.load(Ordering::SeqCst) {
            Some(ServeExit::Finished)
        } else {
            None
        }
    }

    fn dispatch(&self, request: Request, pool: &rayon::ThreadPool) {
        if let Some(seen) = parse_poll_url(request.url())
            && self.live_reload
        {
            // Long polls block for a while; keep them off the worker pool
            let reload = Arc::clone(&self.reload);
            thread::spawn(move || {
                if let Err(e) = response::respond_poll(request, &reload, seen) {
                    debug!("serve"; "poll error: {e}");
                }
            });
            return;
        }

        let site = Arc::clone(&self.site);
        pool.spawn(move || {
            if let Err(e) = site.handle(request) {
                debug!("serve"; "request error: {e}");
            }
        });
    }
}

impl PreviewServer for LiveReloadServer {
    fn watch(&mut self, path: &Path) {
        if !self.watched.iter().any(|p| p == path) {
            self.watched.push(path.to_path_buf());
        }
    }

    fn watched(&self) -> &[PathBuf] {
        &self.watched
    }

    fn set_error_handler(&mut self, handler: ErrorHandler) {
        *self.site.error_handler.write() = Some(handler);
    }

    fn serve(&mut self) -> io::Result<ServeExit> {
        if let Some(exit) = self.exit_reason() {
            return Ok(exit);
        }

        if self.live_reload && self.watcher.is_none() {
            let watcher = WatchThread::spawn(
                &self.watched,
                self.rebuilder.clone(),
                Arc::clone(&self.reload),
            )
            .map_err(io::Error::other)?;
            self.watcher = Some(watcher);
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(REQUEST_THREADS)
            .thread_name(|i| format!("livedoc-http-{i}"))
            .build()
            .map_err(io::Error::other)?;

        log!("serve"; "http://{}{}", self.local_addr(), self.site.mount_path);

        loop {
            match self.http.recv() {
                Ok(request) => {
                    if self.exit_reason().is_some() {
                        if let Err(e) = response::respond_unavailable(request) {
                            debug!("serve"; "request error: {e}");
                        }
                        continue;
                    }
                    self.dispatch(request, &pool);
                }
                // `unblock()` surfaces as an error; only a real failure escapes
                Err(e) => return self.exit_reason().map_or(Err(e), Ok),
            }
        }
    }

    fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.flags.interrupted.store(true, Ordering::SeqCst);
        self.http.unblock();
        self.reload.close();
        if let Some(mut watcher) = self.watcher.take() {
            watcher.stop();
        }
        debug!("serve"; "server stopped");
    }

    fn describe(&self) -> String {
        format!("live reload server on {}", self.addr)
    }
}

impl Drop for LiveReloadServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Builds [`LiveReloadServer`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiveReloadFactory;

impl ServerFactory for LiveReloadFactory {
    fn construct(
        &self,
        rebuild: Rebuilder,
        options: ServerOptions,
        signal: &ShutdownSignal,
    ) -> io::Result<Box<dyn PreviewServer>> {
        Ok(Box::new(LiveReloadServer::bind(rebuild, options, signal)?))
    }
}

fn into_io_error(err: Box<dyn std::error::Error + Send + Sync>) -> io::Error {
    match err.downcast::<io::Error>() {
        Ok(err) => *err,
        Err(err) => io::Error::other(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serve::tests_support;
    use std::fs;
    use std::io::{Read, Write};
    use std::net::{IpAddr, Ipv4Addr, TcpStream};
    use std::thread::JoinHandle;
    use std::time::Duration;
    use tempfile::TempDir;

    fn options(root: &Path, mount_path: &str, live_reload: bool) -> ServerOptions {
        ServerOptions {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            root: root.to_path_buf(),
            mount_path: mount_path.to_string(),
            live_reload,
        }
    }

    fn make_root() -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("index.html"), "<html><body>home</body></html>").unwrap();
        fs::write(temp.path().join("style.css"), "body{}").unwrap();
        temp
    }

    /// Start serving on a background thread.
    fn start(
        mut server: LiveReloadServer,
    ) -> (SocketAddr, StopHandle, JoinHandle<io::Result<ServeExit>>) {
        let addr = server.local_addr();
        let stop = server.stop_handle();
        let handle = thread::spawn(move || server.serve());
        (addr, stop, handle)
    }

    fn get(addr: SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(10)))
            .unwrap();
        write!(stream, "GET {path} HTTP/1.0\r\nHost: localhost\r\nConnection: close\r\n\r\n").unwrap();
        let mut out = String::new();
        stream.read_to_string(&mut out).unwrap();
        out
    }

    fn bind(root: &Path, mount_path: &str, live_reload: bool, signal: &ShutdownSignal) -> LiveReloadServer {
        let (_, rebuilder) = tests_support::rebuilder();
        LiveReloadServer::bind(rebuilder, options(root, mount_path, live_reload), signal).unwrap()
    }

    #[test]
    fn test_serves_files_with_reload_script() {
        let root = make_root();
        let server = bind(root.path(), "/", true, &ShutdownSignal::new());
        let (addr, stop, handle) = start(server);

        let page = get(addr, "/");
        assert!(page.starts_with("HTTP/1.1 200") || page.starts_with("HTTP/1.0 200"));
        assert!(page.contains("home"));
        assert!(page.contains("/livereload/"));

        let css = get(addr, "/style.css");
        assert!(css.contains("body{}"));
        assert!(!css.contains("/livereload/"));

        stop.stop();
        assert_eq!(handle.join().unwrap().unwrap(), ServeExit::Finished);
    }

    #[test]
    fn test_no_script_without_live_reload() {
        let root = make_root();
        let server = bind(root.path(), "/", false, &ShutdownSignal::new());
        let (addr, stop, handle) = start(server);

        let page = get(addr, "/");
        assert!(page.contains("home"));
        assert!(!page.contains("/livereload/"));

        stop.stop();
        handle.join().unwrap().unwrap();
    }

    #[test]
    fn test_mount_path_redirect() {
        let root = make_root();
        let server = bind(root.path(), "/docs/", false, &ShutdownSignal::new());
        let (addr, stop, handle) = start(server);

        let redirect = get(addr, "/");
        assert!(redirect.contains(" 302 "));
        assert!(redirect.contains("Location: /docs/"));
        assert!(get(addr, "/docs/").contains("home"));

        stop.stop();
        handle.join().unwrap().unwrap();
    }

    #[test]
    fn test_not_found_uses_error_handler() {
        let root = make_root();
        let mut server = bind(root.path(), "/", false, &ShutdownSignal::new());
        server.set_error_handler(Arc::new(|code| (code == 404).then(|| b"<p>custom</p>".to_vec())));
        let (addr, stop, handle) = start(server);

        let page = get(addr, "/missing.html");
        assert!(page.contains(" 404 "));
        assert!(page.contains("custom"));

        stop.stop();
        handle.join().unwrap().unwrap();
    }

    #[test]
    fn test_not_found_default() {
        let root = make_root();
        let server = bind(root.path(), "/", false, &ShutdownSignal::new());
        let (addr, stop, handle) = start(server);

        let page = get(addr, "/missing.html");
        assert!(page.contains("404 Not Found"));

        stop.stop();
        handle.join().unwrap().unwrap();
    }

    #[test]
    fn test_long_poll_returns_after_bump() {
        let root = make_root();
        let server = bind(root.path(), "/", true, &ShutdownSignal::new());
        let reload = Arc::clone(&server.reload);
        let (addr, stop, handle) = start(server);

        let poll = thread::spawn(move || get(addr, "/livereload/0"));
        thread::sleep(Duration::from_millis(100));
        reload.bump();

        let body = poll.join().unwrap();
        assert!(body.ends_with("\r\n\r\n1"));

        stop.stop();
        handle.join().unwrap().unwrap();
    }

    #[test]
    fn test_cancel_interrupts_serve() {
        let root = make_root();
        let signal = ShutdownSignal::new();
        let server = bind(root.path(), "/", true, &signal);
        let (_, _stop, handle) = start(server);

        thread::sleep(Duration::from_millis(100));
        signal.cancel();

        assert_eq!(handle.join().unwrap().unwrap(), ServeExit::Interrupted);
    }

    #[test]
    fn test_serve_after_cancel_returns_at_once() {
        let root = make_root();
        let signal = ShutdownSignal::new();
        let mut server = bind(root.path(), "/", true, &signal);
        signal.cancel();
        assert_eq!(server.serve().unwrap(), ServeExit::Interrupted);
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let root = make_root();
        let mut server = bind(root.path(), "/", true, &ShutdownSignal::new());
        server.watch(root.path());
        server.watch(root.path());
        assert_eq!(server.watched().len(), 1);

        server.shutdown();
        server.shutdown();
        assert_eq!(server.serve().unwrap(), ServeExit::Interrupted);
    }

    #[test]
    fn test_bind_conflict_is_io_error() {
        let root = make_root();
        let first = bind(root.path(), "/", false, &ShutdownSignal::new());
        let (_, rebuilder) = tests_support::rebuilder();
        let mut opts = options(root.path(), "/", false);
        opts.port = first.local_addr().port();

        assert!(LiveReloadServer::bind(rebuilder, opts, &ShutdownSignal::new()).is_err());
    }
}
