//! Herder: sync agent configuration from herds into every agent's layout.
//!
//! # Usage
//!
//! ```text
//! herder [--repo <path>] [--dry-run] [-v] [--include <globs>]
//!                                                       merge herds, run every target
//! herder [--repo <path>] [--dry-run] [-v] antigravity   mirror target only
//! herder [--repo <path>] [--dry-run] [-v] copilot       fan-out target only
//! herder [--repo <path>] [--dry-run] [-v] compound-v    extract bundled content
//! herder [--repo <path>] herds                          list installed herds
//! ```

mod bundle;
mod commands;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;

use commands::{herds::HerdsArgs, sync::SyncArgs};
use herder_sync::SyncError;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "herder",
    version,
    about = "Sync agent rules, skills and workflows from herds into each agent's layout",
    long_about = None,
)]
struct Cli {
    /// Path to the repository root.
    #[arg(long, global = true, default_value = ".")]
    repo: PathBuf,

    /// Comma-separated globs selecting rule files for Copilot (default: all).
    #[arg(long, global = true, value_name = "GLOBS", default_value = "")]
    include: String,

    /// Show what would be written or removed without touching any file.
    #[arg(long, global = true)]
    dry_run: bool,

    /// Verbose (debug) logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Commands {
    /// Mirror the canonical tree into `.agent/`.
    Antigravity,

    /// Write Copilot instructions and prompts under `.github/`.
    Copilot,

    /// Extract the bundled Compound V content into the canonical tree.
    #[command(name = "compound-v")]
    CompoundV,

    /// List installed herds in merge order.
    Herds,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            if is_validation(&err) {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn dispatch(cli: Cli) -> Result<()> {
    let target = match cli.command {
        Some(Commands::Herds) => return HerdsArgs { repo: cli.repo }.run(),
        Some(Commands::Antigravity) => Some(herder_sync::MirrorTarget::NAME),
        Some(Commands::Copilot) => Some(herder_sync::FanoutTarget::NAME),
        Some(Commands::CompoundV) => Some(herder_sync::BundledTarget::NAME),
        None => None,
    };
    SyncArgs {
        repo: cli.repo,
        dry_run: cli.dry_run,
        include: commands::sync::parse_include_patterns(&cli.include),
        target: target.map(str::to_owned),
    }
    .run()
}

fn is_validation(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<SyncError>())
        .any(SyncError::is_validation)
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();
}
