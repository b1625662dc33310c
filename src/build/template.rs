//! Page templates with `{{ name }}` placeholders.
//!
//! Supported variables: `title`, `content`, `site_name`, `site_url`.
//! Templates are parsed up front, so an unknown variable or an unterminated
//! `{{` fails the build before any page is written.

use super::error::{BuildError, TemplateError, io_error};
use std::fs;
use std::path::{Path, PathBuf};

/// Template file looked up in each theme directory.
pub const TEMPLATE_NAME: &str = "main.html";

/// Built-in page template used when no theme provides one.
const DEFAULT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{{ title }} - {{ site_name }}</title>
</head>
<body>
<header><a href="{{ site_url }}">{{ site_name }}</a></header>
<main>
{{ content }}
</main>
</body>
</html>
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Var {
    Title,
    Content,
    SiteName,
    SiteUrl,
}

impl Var {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "title" => Some(Self::Title),
            "content" => Some(Self::Content),
            "site_name" => Some(Self::SiteName),
            "site_url" => Some(Self::SiteUrl),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Var(Var),
}

/// Values substituted into a template.
#[derive(Debug, Clone, Copy)]
pub struct PageContext<'a> {
    /// Plain text, escaped on output
    pub title: &'a str,
    /// Rendered HTML, inserted as-is
    pub content: &'a str,
    pub site_name: &'a str,
    pub site_url: &'a str,
}

/// A parsed page template.
#[derive(Debug, Clone)]
pub struct Template {
    segments: Vec<Segment>,
    path: Option<PathBuf>,
}

impl Template {
    /// Parse template source. `name` is used in error messages.
    pub fn parse(name: &str, source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut rest = source;
        let mut offset = 0;

        while let Some(start) = rest.find("{{") {
            if start > 0 {
                segments.push(Segment::Text(rest[..start].to_string()));
            }

            let line = line_at(source, offset + start);
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else {
                return Err(TemplateError::new(name, line, "unterminated `{{`"));
            };

            let key = after[..end].trim();
            let var = Var::from_name(key).ok_or_else(|| {
                TemplateError::new(name, line, format!("unknown variable `{key}`"))
            })?;
            segments.push(Segment::Var(var));

            let consumed = start + 2 + end + 2;
            offset += consumed;
            rest = &rest[consumed..];
        }

        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }

        Ok(Self {
            segments,
            path: None,
        })
    }

    /// The built-in template.
    pub fn builtin() -> Self {
        Self::parse("<builtin>", DEFAULT_TEMPLATE).unwrap_or_else(|_| Self {
            segments: vec![Segment::Var(Var::Content)],
            path: None,
        })
    }

    /// Load `main.html` from the first theme directory that has one.
    pub fn locate(theme_dirs: &[PathBuf]) -> Result<Self, BuildError> {
        for dir in theme_dirs {
            let path = dir.join(TEMPLATE_NAME);
            if !path.is_file() {
                continue;
            }
            let source = fs::read_to_string(&path).map_err(io_error(&path))?;
            let mut template = Self::parse(&path.display().to_string(), &source)?;
            template.path = Some(path);
            return Ok(template);
        }
        Ok(Self::builtin())
    }

    /// Source file of this template, `None` for the built-in one.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn render(&self, page: &PageContext<'_>) -> String {
        let mut out = String::with_capacity(page.content.len() + 1024);
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Var(Var::Title) => out.push_str(&escape_html(page.title)),
                Segment::Var(Var::Content) => out.push_str(page.content),
                Segment::Var(Var::SiteName) => out.push_str(&escape_html(page.site_name)),
                Segment::Var(Var::SiteUrl) => out.push_str(&escape_html(page.site_url)),
            }
        }
        out
    }
}

/// 1-based line number of a byte offset.
fn line_at(source: &str, offset: usize) -> usize {
    source[..offset].matches('\n').count() + 1
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
