//! livedoc - build, watch and serve a documentation site with live reload.

mod build;
mod cli;
mod config;
mod core;
mod error;
mod logger;
mod plugin;
mod serve;
mod utils;
mod workspace;

use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log!("error"; "{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<()> {
    let ctx = core::Context::new();

    // Setup Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler(&ctx.shutdown)?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    match &cli.command {
        Commands::Serve { args } => cli::serve::run_serve(ctx, args)?,
    }
    Ok(())
}
