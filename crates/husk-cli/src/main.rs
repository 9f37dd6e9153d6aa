//! husk CLI - inspect installed package trees
//!
//! Entry point for the `husk` binary. Parses arguments, installs logging
//! and hands off to the command handlers.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{CommandContext, Outcome};
use output::errors::ErrorFormatter;

#[derive(Parser)]
#[command(name = "husk")]
#[command(about = "Inspect installed package trees")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the installed dependency tree
    Ls {
        /// Package directory (defaults to the current directory)
        path: Option<PathBuf>,
        /// Count devDependencies as required
        #[arg(long)]
        dev: bool,
        /// Stop expanding the tree below this depth
        #[arg(long, value_name = "N")]
        depth: Option<u32>,
        /// Print an `npm ls --json` style document
        #[arg(long)]
        json: bool,
    },
    /// Report missing, invalid and extraneous packages
    Check {
        /// Package directory (defaults to the current directory)
        path: Option<PathBuf>,
        /// Count devDependencies as required
        #[arg(long)]
        dev: bool,
    },
    /// Show the effective options and where each one was set
    Config,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose);
    setup_panic_handler();

    debug!("Starting husk v{}", env!("CARGO_PKG_VERSION"));

    match run_cli(cli) {
        Ok(Outcome::Clean) => ExitCode::SUCCESS,
        Ok(Outcome::Problems) => ExitCode::from(1),
        Err(err) => {
            eprintln!("{}", ErrorFormatter::new().format_report(&err));
            ExitCode::from(2)
        },
    }
}

fn run_cli(cli: Cli) -> anyhow::Result<Outcome> {
    let ctx = CommandContext::new()?;
    commands::dispatch_command(cli.command, &ctx)
}

fn setup_logging(verbose: bool) {
    // Warnings reach the user through command output, not the log
    let level = if verbose { "debug" } else { "error" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "husk={level},husk_core={level},husk_config={level},husk_tree={level}"
        ))
    });

    // stdout carries the tree and the JSON document
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        error!("husk encountered an unexpected error: {}", panic_info);
        eprintln!("husk crashed! This is a bug.");
        eprintln!("Please report this at: https://github.com/husk-pm/husk/issues");
        eprintln!("Error: {}", panic_info);
    }));
}
