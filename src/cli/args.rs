//! Command-line interface definitions.

use crate::core::LiveReloadMode;
use clap::{ColorChoice, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Documentation preview server
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Show debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Build the docs and serve them with live reload
    #[command(visible_alias = "s")]
    Serve {
        #[command(flatten)]
        args: ServeArgs,
    },
}

/// Serve command arguments.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Config file path (default: search upward for livedoc.toml)
    #[arg(short = 'f', long = "config-file", value_hint = clap::ValueHint::FilePath)]
    pub config_file: Option<PathBuf>,

    /// Address to listen on, e.g. 127.0.0.1:8000
    #[arg(short = 'a', long = "dev-addr")]
    pub dev_addr: Option<SocketAddr>,

    /// Turn warnings into errors
    #[arg(short, long)]
    pub strict: bool,

    /// Theme name
    #[arg(short, long)]
    pub theme: Option<String>,

    /// Theme directory overriding the named theme
    #[arg(short = 'e', long = "theme-dir", value_hint = clap::ValueHint::DirPath)]
    pub theme_dir: Option<PathBuf>,

    /// How to react to source changes
    #[arg(long, value_enum, default_value_t = LiveReloadMode::Live)]
    pub livereload: LiveReloadMode,

    /// Also watch theme directories
    #[arg(long)]
    pub watch_theme: bool,

    /// Extra file or directory to watch (repeatable)
    #[arg(short, long, value_hint = clap::ValueHint::AnyPath)]
    pub watch: Vec<PathBuf>,
}
