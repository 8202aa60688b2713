//! canopy: mirror a hosting service's repositories into a local directory tree.
//!
//! # Usage
//!
//! ```text
//! canopy sync [-n] [-j N] [-k] [-p] [PATH...]
//! canopy sync init <server> <account>... [--single-dir] [--separator S] [--force]
//! canopy list [--json]
//! ```

mod commands;
mod report;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use commands::{list::ListArgs, sync::SyncArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "canopy",
    version,
    about = "Keep a directory of git clones in step with a GitHub account",
    long_about = None,
)]
struct Cli {
    /// Log every git and HTTP call to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Clone, update, move or remove local repositories to match the host.
    Sync(SyncArgs),

    /// Show working-tree flags and branch for every local repository.
    #[command(alias = "ls")]
    List(ListArgs),
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Stderr only; stdout belongs to the reporters.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Sync(args) => args.run(),
        Commands::List(args) => args.run(),
    }
}
