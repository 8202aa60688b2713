//! `canopy sync`: converge the local tree with the host.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};

use canopy_core::ConfigError;
use canopy_git::GitCli;
use canopy_sync::{
    build_plan, connect_github, display_path, scheduler, Executor, Reporter, SyncError,
    SyncOptions,
};

use super::init::InitArgs;
use crate::report::{PlainReporter, ProgressReporter};

/// Arguments for `canopy sync`.
#[derive(Args, Debug)]
#[command(args_conflicts_with_subcommands = true)]
pub struct SyncArgs {
    #[command(subcommand)]
    pub command: Option<SyncCommand>,

    /// Show what would happen without touching anything.
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Number of repositories to work on at once (default: CPU count).
    #[arg(short, long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub jobs: Option<u32>,

    /// Keep starting new actions after one fails.
    #[arg(short, long)]
    pub keep_going: bool,

    /// Delete local repositories that are no longer wanted.
    #[arg(short, long)]
    pub prune: bool,

    /// Limit the sync to these directories inside the sync root.
    #[arg(value_name = "PATH")]
    pub paths: Vec<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum SyncCommand {
    /// Write a new canopy.sync.yaml in the current directory.
    Init(InitArgs),
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        if let Some(SyncCommand::Init(args)) = self.command {
            return args.run();
        }

        let cwd = std::env::current_dir().context("could not determine current directory")?;
        let plan = match build_plan(&cwd, &self.paths, &GitCli, connect_github) {
            Ok(plan) => plan,
            Err(SyncError::Config(err @ ConfigError::NotFound { .. })) => {
                bail!("{err}\nDid you run 'canopy sync init' first?")
            }
            Err(err) => return Err(err).context("failed to plan sync"),
        };
        tracing::debug!(
            root = %plan.sync_root.display(),
            actions = plan.actions.len(),
            "plan ready"
        );

        let opts = SyncOptions {
            dry_run: self.dry_run,
            jobs: self.jobs.map(|n| n as usize),
            keep_going: self.keep_going,
            prune: self.prune,
        };

        let name_width = plan
            .actions
            .iter()
            .map(|a| display_path(a.name(), Some(cwd.as_path())).len())
            .max()
            .unwrap_or(0);
        let reporter: Box<dyn Reporter> = if std::io::stdout().is_terminal() && !opts.dry_run {
            Box::new(ProgressReporter::new(name_width))
        } else {
            Box::new(PlainReporter::new(std::io::stdout(), name_width))
        };

        let executor = Arc::new(Executor::new(GitCli).with_display_base(cwd));
        let summary = scheduler::run_blocking(plan.actions, executor, opts, reporter)
            .context("failed to run sync")?;

        if summary.num_failed() > 0 {
            bail!("{} FAILED", summary.num_failed());
        }
        Ok(())
    }
}
