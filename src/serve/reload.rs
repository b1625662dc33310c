//! Browser refresh via long polling.
//!
//! Every successful rebuild bumps a build epoch. Pages carry a small script
//! that asks `GET /livereload/<epoch>`; the request blocks until the server's
//! epoch is newer, then the page reloads.

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// URL prefix of the long-poll endpoint.
pub const LIVERELOAD_PREFIX: &str = "/livereload/";

/// How long a long-poll request is held open.
pub const POLL_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Default)]
struct EpochState {
    epoch: u64,
    closed: bool,
}

/// Shared build epoch.
#[derive(Debug, Default)]
pub struct ReloadState {
    state: Mutex<EpochState>,
    changed: Condvar,
}

impl ReloadState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn epoch(&self) -> u64 {
        self.state.lock().epoch
    }

    /// Mark a new build, waking every waiting client.
    pub fn bump(&self) -> u64 {
        let mut state = self.state.lock();
        state.epoch += 1;
        self.changed.notify_all();
        state.epoch
    }

    /// Release every waiting client; later waits return at once.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.changed.notify_all();
    }

    /// Block until the epoch passes `seen`, `timeout` elapses or the state
    /// is closed. Returns the current epoch.
    pub fn wait_newer(&self, seen: u64, timeout: Duration) -> u64 {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while state.epoch <= seen && !state.closed {
            if self.changed.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
        state.epoch
    }
}

/// Parse the epoch out of a `/livereload/<epoch>` URL.
pub fn parse_poll_url(url: &str) -> Option<u64> {
    url.strip_prefix(LIVERELOAD_PREFIX)?
        .split(['?', '#'])
        .next()?
        .parse()
        .ok()
}

/// Client script polling for a newer epoch than `epoch`.
pub fn script(epoch: u64) -> String {
    format!(
        r#"<script>
(function(){{
    var epoch = {epoch};
    function poll() {{
        fetch("{LIVERELOAD_PREFIX}" + epoch)
            .then(function(r) {{ return r.text(); }})
            .then(function(text) {{
                var next = parseInt(text, 10);
                if (next > epoch) {{ location.reload(); return; }}
                poll();
            }})
            .catch(function() {{ setTimeout(poll, 1000); }});
    }}
    poll();
}})();
</script>"#
    )
}

/// Insert `script` before the last `</body>`, or append it.
pub fn inject_script(content: &[u8], script: &str) -> Vec<u8> {
    const PATTERN: &[u8] = b"</body>";

    let pos = content
        .windows(PATTERN.len())
        .rposition(|w| w.eq_ignore_ascii_case(PATTERN))
        .unwrap_or(content.len());

    let mut result = Vec::with_capacity(content.len() + script.len());
    result.extend_from_slice(&content[..pos]);
    result.extend_from_slice(script.as_bytes());
    result.extend_from_slice(&content[pos..]);
    result
}
