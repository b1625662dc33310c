//! `serve` command.

use super::args::ServeArgs;
use crate::build::MarkdownBuilder;
use crate::config::{ConfigOverrides, TomlLoader};
use crate::core::Context;
use crate::error::ServeError;
use crate::plugin::PluginSet;
use crate::serve::{LiveReloadFactory, ServeOptions, ServerLifecycleManager};
use std::sync::Arc;

impl From<&ServeArgs> for ServeOptions {
    fn from(args: &ServeArgs) -> Self {
        Self {
            config_file: args.config_file.clone(),
            overrides: ConfigOverrides {
                dev_addr: args.dev_addr,
                // Only an explicit flag overrides the file
                strict: args.strict.then_some(true),
                theme: args.theme.clone(),
                theme_dir: args.theme_dir.clone(),
                site_dir: None,
            },
            livereload: args.livereload,
            watch_theme: args.watch_theme,
            watch: args.watch.clone(),
        }
    }
}

/// Run a preview session with the built-in loader, builder and server.
pub fn run_serve(ctx: Context, args: &ServeArgs) -> Result<(), ServeError> {
    let mut manager = ServerLifecycleManager::new(
        ctx,
        Arc::new(TomlLoader),
        Arc::new(MarkdownBuilder),
        Arc::new(LiveReloadFactory),
        Arc::new(PluginSet::new()),
    );
    manager.run(ServeOptions::from(args))
}
