//! `canopy sync init`: write a starter config for one or more accounts.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use canopy_core::{config, AccountKind, GitHubConfig, SyncConfig};
use canopy_github::RepoHost;
use canopy_sync::connect_github;

/// Arguments for `canopy sync init`.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// `github.com` or a GitHub Enterprise host name.
    pub server: String,

    /// Organizations or users whose repositories should be mirrored.
    #[arg(required = true, value_name = "ACCOUNT")]
    pub accounts: Vec<String>,

    /// Put every repository directly in the sync root instead of per-account dirs.
    #[arg(long)]
    pub single_dir: bool,

    /// Directory name = account + SEPARATOR + repo.
    #[arg(long, value_name = "SEPARATOR")]
    pub separator: Option<String>,

    /// Overwrite an existing config file.
    #[arg(short, long)]
    pub force: bool,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let cwd = std::env::current_dir().context("could not determine current directory")?;
        let existing = cwd.join(config::CONFIG_FILE_NAME);
        if existing.exists() && !self.force {
            bail!("{} already exists -- use --force to overwrite it", existing.display());
        }

        let mut github = GitHubConfig {
            server: self.server.clone(),
            single_dir_for_all_repos: self.single_dir.then_some(true),
            account_prefix_separator: self.separator.clone(),
            ..Default::default()
        };

        let host = connect_github(&github)
            .with_context(|| format!("failed to connect to {}", self.server))?;
        let mut classified = Vec::with_capacity(self.accounts.len());
        for name in &self.accounts {
            let account = host
                .get_account(name)
                .with_context(|| format!("failed to look up '{name}' on {}", self.server))?;
            classified.push((account.login.clone(), account.kind()));
        }
        place_accounts(&mut github, classified);

        let cfg = SyncConfig {
            github: Some(github),
        };
        cfg.validate().context("refusing to write an invalid config")?;
        let path = config::write_config(&cwd, &cfg, self.force)
            .context("failed to write sync config")?;

        println!("{} Wrote {}", "✓".green().bold(), path.display());
        println!("Run 'canopy sync' to clone the repositories.");
        Ok(())
    }
}

/// One account goes in `org`/`user`; several go in the `orgs`/`users` maps.
fn place_accounts(github: &mut GitHubConfig, accounts: Vec<(String, AccountKind)>) {
    if let [(login, kind)] = accounts.as_slice() {
        match kind {
            AccountKind::Organization => github.single_org = Some(login.clone()),
            AccountKind::User => github.single_user = Some(login.clone()),
        }
        return;
    }
    for (login, kind) in accounts {
        match kind {
            AccountKind::Organization => github.orgs.insert(login, None),
            AccountKind::User => github.users.insert(login, None),
        };
    }
}
