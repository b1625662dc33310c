//! Sitemap generation.
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
//!   <url>
//!     <loc>https://example.com/guide/setup.html</loc>
//!   </url>
//! </urlset>
//! ```

use super::error::{BuildError, io_error};
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";
pub const SITEMAP_FILE: &str = "sitemap.xml";

/// Write `sitemap.xml` into `site_dir` for the given page outputs.
///
/// `pages` are output paths relative to `site_dir`.
pub fn write_sitemap(site_dir: &Path, site_url: &str, pages: &[PathBuf]) -> Result<(), BuildError> {
    let path = site_dir.join(SITEMAP_FILE);
    let xml = into_xml(site_url, pages);
    fs::write(&path, xml).map_err(io_error(&path))?;
    crate::debug!("sitemap"; "{} urls", pages.len());
    Ok(())
}

fn into_xml(site_url: &str, pages: &[PathBuf]) -> String {
    let base_url = site_url.trim_end_matches('/');
    let mut xml = String::with_capacity(256 + pages.len() * 96);

    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<urlset xmlns=\"");
    xml.push_str(SITEMAP_NS);
    xml.push_str("\">\n");

    for page in pages {
        let loc = format!("{}/{}", base_url, page_url(page));
        xml.push_str("  <url>\n    <loc>");
        xml.push_str(&escape_xml(&loc));
        xml.push_str("</loc>\n  </url>\n");
    }

    xml.push_str("</urlset>\n");
    xml
}

/// URL path of an output file: `a/index.html` → `a/`, `a/b.html` → `a/b.html`.
fn page_url(page: &Path) -> String {
    let url = page
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    match url.strip_suffix("index.html") {
        Some(dir) => dir.to_string(),
        None => url,
    }
}

/// Escape special XML characters.
fn escape_xml(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(s);
    }

    Cow::Owned(
        s.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&apos;"),
    )
}
