//! HTTP request handling.

use super::path::{Route, route};
use super::reload::{self, ReloadState};
use super::server::ErrorHandler;
use crate::utils::mime::{self, types::{HTML, PLAIN}};
use parking_lot::RwLock;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tiny_http::{Header, Method, Request, Response, StatusCode};

/// What a request handler needs to know about the server.
pub struct Site {
    pub root: PathBuf,
    pub mount_path: String,
    /// Present when live reload is on
    pub reload: Option<Arc<ReloadState>>,
    pub error_handler: RwLock<Option<ErrorHandler>>,
}

impl Site {
    /// Answer a file request.
    pub fn handle(&self, request: Request) -> io::Result<()> {
        match route(request.url(), &self.root, &self.mount_path) {
            Route::Redirect(location) => respond_redirect(request, &location),
            Route::File(path) => self.respond_file(request, &path),
            Route::NotFound => self.respond_error(request, 404),
        }
    }

    fn respond_file(&self, request: Request, path: &Path) -> io::Result<()> {
        let content_type = mime::from_path(path);
        if is_head_request(&request) {
            return send_head(request, 200, content_type);
        }

        match fs::read(path) {
            Ok(body) => {
                let body = self.maybe_inject(body, content_type);
                send_body(request, 200, content_type, body)
            }
            Err(e) => {
                crate::debug!("serve"; "failed to read {}: {}", path.display(), e);
                self.respond_error(request, 500)
            }
        }
    }

    /// Respond with the custom error page for `status`, or a plain one.
    fn respond_error(&self, request: Request, status: u16) -> io::Result<()> {
        let handler = self.error_handler.read().clone();
        let custom = handler.and_then(|handler| handler(status));

        if is_head_request(&request) {
            let mime = if custom.is_some() { HTML } else { PLAIN };
            return send_head(request, status, mime);
        }

        match custom {
            Some(body) => {
                let body = self.maybe_inject(body, HTML);
                send_body(request, status, HTML, body)
            }
            None => {
                let text = match status {
                    404 => "404 Not Found",
                    _ => "500 Internal Server Error",
                };
                send_body(request, status, PLAIN, text.as_bytes().to_vec())
            }
        }
    }

    fn maybe_inject(&self, body: Vec<u8>, content_type: &str) -> Vec<u8> {
        match &self.reload {
            Some(state) if content_type.starts_with("text/html") => {
                reload::inject_script(&body, &reload::script(state.epoch()))
            }
            _ => body,
        }
    }
}

/// Answer a `/livereload/<epoch>` long-poll request.
pub fn respond_poll(request: Request, state: &ReloadState, seen: u64) -> io::Result<()> {
    let epoch = state.wait_newer(seen, reload::POLL_TIMEOUT);
    let mut response = Response::from_string(epoch.to_string());
    add_headers(&mut response, &[("Content-Type", PLAIN), ("Cache-Control", "no-store")]);
    request.respond(response)
}

/// Answer with 503 while shutting down.
pub fn respond_unavailable(request: Request) -> io::Result<()> {
    send_body(request, 503, PLAIN, b"503 Service Unavailable".to_vec())
}

fn respond_redirect(request: Request, location: &str) -> io::Result<()> {
    let mut response = Response::empty(StatusCode(302));
    add_headers(&mut response, &[("Location", location)]);
    request.respond(response)
}

fn is_head_request(request: &Request) -> bool {
    request.method() == &Method::Head
}

fn send_head(request: Request, status: u16, content_type: &str) -> io::Result<()> {
    let mut response = Response::empty(StatusCode(status));
    add_headers(&mut response, &[("Content-Type", content_type)]);
    request.respond(response)
}

fn send_body(request: Request, status: u16, content_type: &str, body: Vec<u8>) -> io::Result<()> {
    let mut response = Response::from_data(body).with_status_code(StatusCode(status));
    add_headers(&mut response, &[("Content-Type", content_type)]);
    request.respond(response)
}

/// Add headers, skipping any that are not valid ASCII.
fn add_headers<R: io::Read>(response: &mut Response<R>, headers: &[(&str, &str)]) {
    for (key, value) in headers {
        match Header::from_bytes(key.as_bytes(), value.as_bytes()) {
            Ok(header) => response.add_header(header),
            Err(()) => crate::debug!("serve"; "skipping invalid header {key}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_headers_skips_invalid() {
        let mut response = Response::empty(StatusCode(200));
        add_headers(&mut response, &[("Content-Type", HTML), ("Location", "/caf\u{e9}/")]);
        assert!(response.headers().iter().any(|h| h.field.equiv("Content-Type")));
    }
}
