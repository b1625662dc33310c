//! MIME type detection utilities.

use std::path::Path;

/// Common MIME type constants.
pub mod types {
    pub const HTML: &str = "text/html; charset=utf-8";
    pub const PLAIN: &str = "text/plain; charset=utf-8";
    pub const CSS: &str = "text/css; charset=utf-8";
    pub const JAVASCRIPT: &str = "text/javascript; charset=utf-8";
    pub const JSON: &str = "application/json";
    pub const XML: &str = "application/xml";
    pub const MARKDOWN: &str = "text/markdown; charset=utf-8";
    pub const OCTET_STREAM: &str = "application/octet-stream";
    pub const WASM: &str = "application/wasm";
    pub const PDF: &str = "application/pdf";

    pub const PNG: &str = "image/png";
    pub const JPEG: &str = "image/jpeg";
    pub const GIF: &str = "image/gif";
    pub const WEBP: &str = "image/webp";
    pub const SVG: &str = "image/svg+xml";
    pub const ICO: &str = "image/x-icon";

    pub const WOFF: &str = "font/woff";
    pub const WOFF2: &str = "font/woff2";
    pub const TTF: &str = "font/ttf";

    pub const MP4: &str = "video/mp4";
    pub const WEBM: &str = "video/webm";
    pub const MP3: &str = "audio/mpeg";
}

/// Get MIME type from file path (by extension).
pub fn from_path(path: &Path) -> &'static str {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(types::OCTET_STREAM, from_extension)
}

/// Get MIME type from a file extension (case-insensitive).
pub fn from_extension(ext: &str) -> &'static str {
    use types::*;
    match ext.to_ascii_lowercase().as_str() {
        "html" | "htm" => HTML,
        "txt" => PLAIN,
        "css" => CSS,
        "js" | "mjs" => JAVASCRIPT,
        "json" | "map" => JSON,
        "xml" => XML,
        "md" => MARKDOWN,
        "wasm" => WASM,
        "pdf" => PDF,
        "png" => PNG,
        "jpg" | "jpeg" => JPEG,
        "gif" => GIF,
        "webp" => WEBP,
        "svg" => SVG,
        "ico" => ICO,
        "woff" => WOFF,
        "woff2" => WOFF2,
        "ttf" => TTF,
        "mp4" => MP4,
        "webm" => WEBM,
        "mp3" => MP3,
        _ => OCTET_STREAM,
    }
}
