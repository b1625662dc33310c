//! Site building.
//!
//! # Module Structure
//!
//! ```text
//! build/
//! ├── error.rs         # TemplateError, BuildError
//! ├── freshness.rs     # mtime comparison for dirty builds
//! ├── markdown.rs      # MarkdownBuilder (default Builder)
//! ├── orchestrator.rs  # BuildOrchestrator, Rebuilder
//! ├── sitemap.rs       # sitemap.xml
//! └── template.rs      # `{{ name }}` page templates
//! ```

mod error;
mod freshness;
mod markdown;
mod orchestrator;
mod sitemap;
mod template;

pub use error::{BuildError, TemplateError};
pub use markdown::MarkdownBuilder;
pub use orchestrator::{BuildOrchestrator, Rebuilder};

use crate::config::Config;

/// Renders a site into `config.site_dir`.
pub trait Builder: Send + Sync {
    /// - `live_reload`: output is served by a live-reloading server
    /// - `dirty`: reuse existing output, only re-render what changed
    fn build(&self, config: &Config, live_reload: bool, dirty: bool) -> Result<(), BuildError>;
}
