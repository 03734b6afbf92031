//! unity-agent - compile status agent for a scripting editor.
//!
//! `check` asks the editor to refresh, follows the compilation (including a
//! scripting domain reload) and prints the resulting compile errors.
//! `serve` runs the matching status server outside the editor.

#![allow(dead_code)]

mod cli;
mod client;
mod config;
mod core;
mod host;
mod logger;
mod protocol;
mod server;

use std::process::ExitCode;

use anyhow::Result;
use clap::{ColorChoice, CommandFactory, Parser};
use cli::{Cli, Commands};
use config::AgentConfig;

fn main() -> Result<ExitCode> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let Some(cli) = parse_args()? else {
        return Ok(ExitCode::SUCCESS);
    };

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = AgentConfig::load(&cli)?;
    if let Some(path) = &config.config_path {
        debug!("config"; "loaded {}", path.display());
    }

    match cli.command {
        Commands::Check => Ok(cli::check::run(&config)),
        Commands::Serve => cli::serve::run(&config).map(|()| ExitCode::SUCCESS),
    }
}

/// Parse arguments. Help and version print as usual; any other usage error
/// prints the usage text and yields `None`.
fn parse_args() -> Result<Option<Cli>> {
    match Cli::try_parse() {
        Ok(cli) => Ok(Some(cli)),
        Err(e) if !e.use_stderr() => {
            e.print()?;
            Ok(None)
        }
        Err(_) => {
            Cli::command().print_help()?;
            Ok(None)
        }
    }
}
