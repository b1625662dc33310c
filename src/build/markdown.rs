//! Default builder: Markdown pages through a page template.
//!
//! ```text
//! docs/index.md        → <site_dir>/index.html
//! docs/guide/setup.md  → <site_dir>/guide/setup.html
//! docs/img/logo.png    → <site_dir>/img/logo.png (copied)
//! <theme>/style.css    → <site_dir>/style.css    (copied)
//! ```

use super::error::{BuildError, io_error};
use super::freshness::is_output_fresh;
use super::sitemap::write_sitemap;
use super::template::{PageContext, TEMPLATE_NAME, Template};
use super::Builder;
use crate::config::Config;
use crate::{debug, log};
use jwalk::WalkDir;
use pulldown_cmark::{CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Renders `*.md` sources to HTML and copies everything else.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownBuilder;

impl Builder for MarkdownBuilder {
    fn build(&self, config: &Config, live_reload: bool, dirty: bool) -> Result<(), BuildError> {
        let site_dir = &config.site_dir;
        if !dirty {
            clean_directory(site_dir)?;
        }
        fs::create_dir_all(site_dir).map_err(io_error(site_dir))?;

        let template = Template::locate(&config.theme.dirs)?;
        copy_theme_files(&config.theme.dirs, site_dir, dirty)?;

        let (pages, assets): (Vec<_>, Vec<_>) = collect_all_files(&config.docs_dir)
            .into_iter()
            .partition(|path| is_markdown(path));

        let site_url = config.site_url.as_deref().unwrap_or("/");
        let rendered = AtomicUsize::new(0);

        pages.par_iter().try_for_each(|source| {
            let rel = relative(source, &config.docs_dir);
            let output = site_dir.join(output_path(&rel));

            let mut inputs = vec![source.as_path()];
            inputs.extend(template.path());
            if dirty && is_output_fresh(&output, &inputs) {
                return Ok(());
            }

            let page = PageSource {
                source,
                rel: &rel,
                output: &output,
            };
            render_page(config, &template, &page, site_url)?;
            rendered.fetch_add(1, Ordering::Relaxed);
            Ok::<_, BuildError>(())
        })?;

        assets.par_iter().try_for_each(|source| {
            let output = site_dir.join(relative(source, &config.docs_dir));
            copy_file(source, &output, dirty)
        })?;

        if !live_reload {
            let outputs: Vec<PathBuf> = pages
                .iter()
                .map(|source| output_path(&relative(source, &config.docs_dir)))
                .collect();
            write_sitemap(site_dir, site_url, &outputs)?;
        }

        debug!(
            "build";
            "rendered {}/{} pages, {} files copied",
            rendered.load(Ordering::Relaxed),
            pages.len(),
            assets.len()
        );
        Ok(())
    }
}

// ============================================================================
// pages
// ============================================================================

struct PageSource<'a> {
    source: &'a Path,
    /// Path relative to `docs_dir`
    rel: &'a Path,
    output: &'a Path,
}

fn render_page(
    config: &Config,
    template: &Template,
    page: &PageSource<'_>,
    site_url: &str,
) -> Result<(), BuildError> {
    let markdown = fs::read_to_string(page.source).map_err(io_error(page.source))?;

    let links = LinkContext {
        docs_dir: &config.docs_dir,
        page_dir: page.rel.parent().unwrap_or(Path::new("")),
        source: page.rel,
        site_url,
        strict: config.strict,
    };
    let (content, title) = markdown_to_html(&markdown, &links)?;
    let title = title.unwrap_or_else(|| {
        page.rel
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    });

    let html = template.render(&PageContext {
        title: &title,
        content: &content,
        site_name: &config.site_name,
        site_url,
    });

    if let Some(parent) = page.output.parent() {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    fs::write(page.output, html).map_err(io_error(page.output))
}

/// Convert Markdown to HTML, returning the first `# heading` as title.
fn markdown_to_html(
    markdown: &str,
    links: &LinkContext<'_>,
) -> Result<(String, Option<String>), BuildError> {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS;

    let mut title: Option<String> = None;
    let mut in_title = false;
    let mut events = Vec::new();

    for event in Parser::new_ext(markdown, options) {
        let event = match event {
            Event::Start(Tag::Heading {
                level: HeadingLevel::H1,
                ..
            }) if title.is_none() => {
                in_title = true;
                event
            }
            Event::End(TagEnd::Heading(HeadingLevel::H1)) if in_title => {
                in_title = false;
                event
            }
            Event::Text(ref text) | Event::Code(ref text) if in_title => {
                title.get_or_insert_with(String::new).push_str(text);
                event
            }
            Event::Start(Tag::Link {
                link_type,
                dest_url,
                title: link_title,
                id,
            }) => Event::Start(Tag::Link {
                link_type,
                dest_url: CowStr::from(links.rewrite(&dest_url)?),
                title: link_title,
                id,
            }),
            other => other,
        };
        events.push(event);
    }

    let mut html = String::with_capacity(markdown.len() * 3 / 2);
    pulldown_cmark::html::push_html(&mut html, events.into_iter());
    Ok((html, title))
}

/// Link rewriting for one page.
struct LinkContext<'a> {
    docs_dir: &'a Path,
    /// Directory of the page, relative to `docs_dir`
    page_dir: &'a Path,
    source: &'a Path,
    site_url: &'a str,
    strict: bool,
}

impl LinkContext<'_> {
    /// - `/x` (site-absolute) → `{site_url}x`
    /// - `page.md#frag` → `page.html#frag`, checked against `docs_dir`
    /// - external and fragment-only links are left alone
    fn rewrite(&self, dest: &str) -> Result<String, BuildError> {
        if dest.is_empty() || dest.starts_with('#') || dest.starts_with("//") || is_absolute_url(dest) {
            return Ok(dest.to_string());
        }

        if let Some(rest) = dest.strip_prefix('/') {
            return Ok(format!("{}/{}", self.site_url.trim_end_matches('/'), rest));
        }

        let (path, suffix) = split_suffix(dest);
        let Some(stem) = path.strip_suffix(".md") else {
            return Ok(dest.to_string());
        };

        if !self.docs_dir.join(self.page_dir).join(path).is_file() {
            let message = format!(
                "{}: link to missing page `{}`",
                self.source.display(),
                path
            );
            if self.strict {
                return Err(BuildError::Content(message));
            }
            log!("warning"; "{message}");
        }

        Ok(format!("{stem}.html{suffix}"))
    }
}

fn is_absolute_url(dest: &str) -> bool {
    url::Url::parse(dest).is_ok()
}

/// Split `path?query#fragment` into `(path, "?query#fragment")`.
fn split_suffix(dest: &str) -> (&str, &str) {
    match dest.find(['#', '?']) {
        Some(i) => dest.split_at(i),
        None => (dest, ""),
    }
}

// ============================================================================
// files
// ============================================================================

fn is_markdown(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "md")
}

fn output_path(rel: &Path) -> PathBuf {
    rel.with_extension("html")
}

fn relative(path: &Path, base: &Path) -> PathBuf {
    path.strip_prefix(base)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Collect all non-hidden files under `dir`, sorted.
fn collect_all_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort(true)
        .skip_hidden(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path())
        .collect()
}

/// Copy theme static files; higher-priority directories win.
fn copy_theme_files(theme_dirs: &[PathBuf], site_dir: &Path, dirty: bool) -> Result<(), BuildError> {
    for dir in theme_dirs.iter().rev() {
        for source in collect_all_files(dir) {
            let rel = relative(&source, dir);
            if rel == Path::new(TEMPLATE_NAME) {
                continue;
            }
            copy_file(&source, &site_dir.join(rel), dirty)?;
        }
    }
    Ok(())
}

fn copy_file(source: &Path, output: &Path, dirty: bool) -> Result<(), BuildError> {
    if dirty && is_output_fresh(output, &[source]) {
        return Ok(());
    }
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    fs::copy(source, output).map_err(io_error(output))?;
    Ok(())
}

/// Remove everything inside `dir`, keeping `dir` itself.
fn clean_directory(dir: &Path) -> Result<(), BuildError> {
    if !dir.exists() {
        return Ok(());
    }
    for entry in fs::read_dir(dir).map_err(io_error(dir))? {
        let path = entry.map_err(io_error(dir))?.path();
        let result = if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        result.map_err(io_error(&path))?;
    }
    Ok(())
}
