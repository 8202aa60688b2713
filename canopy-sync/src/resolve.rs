//! Desired-state resolution: host listings + filter criteria -> desired repos.

use std::collections::BTreeSet;
use std::path::Path;

use canopy_core::{
    AccountKind, ComparableUrl, DesiredRepo, DesiredRepos, GitHubConfig, RejectionReasons,
    ScopeTarget,
};
use canopy_github::{Account, Repo, RepoHost};

use crate::error::SyncError;
use crate::filter::rejection_reason;

/// Which accounts and individual repositories to ask the host about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryScope {
    /// Accounts listed in full.
    pub accounts: Vec<(String, AccountKind)>,
    /// `owner/name` of repos fetched one by one; their owner is not in `accounts`.
    pub repos: Vec<String>,
}

impl DiscoveryScope {
    /// Build the scope from positional targets. No targets, or any target
    /// naming the sync root, means every configured account.
    pub fn from_targets(cfg: &GitHubConfig, targets: &[ScopeTarget]) -> Self {
        if targets.is_empty() || targets.contains(&ScopeTarget::All) {
            return Self {
                accounts: cfg.accounts(),
                repos: Vec::new(),
            };
        }

        let mut accounts = BTreeSet::new();
        let mut repos = BTreeSet::new();
        for target in targets {
            match target {
                ScopeTarget::All => {}
                ScopeTarget::Account { login, kind } => {
                    accounts.insert((login.clone(), *kind));
                }
                ScopeTarget::Repo { login, kind, name } => {
                    repos.insert((login.clone(), *kind, name.clone()));
                }
            }
        }

        let repos = repos
            .into_iter()
            .filter(|(login, kind, _)| !accounts.contains(&(login.clone(), *kind)))
            .map(|(login, _, name)| format!("{login}/{name}"))
            .collect();
        Self {
            accounts: accounts.into_iter().collect(),
            repos,
        }
    }

    /// Nothing to ask the host about.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty() && self.repos.is_empty()
    }
}

/// Output of a resolution pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub desired: DesiredRepos,
    pub rejections: RejectionReasons,
}

/// Query `host` for everything in `scope` and classify the results.
pub fn resolve<H: RepoHost + ?Sized>(
    cfg: &GitHubConfig,
    sync_root: &Path,
    scope: &DiscoveryScope,
    host: &H,
) -> Result<Resolution, SyncError> {
    let mut records: Vec<Repo> = Vec::new();

    for (login, kind) in &scope.accounts {
        tracing::info!(server = %cfg.server, account = %login, "finding repositories");
        let listed = host.list_repos(&Account::new(login.clone(), *kind))?;
        records.extend(listed);
    }
    for full_name in &scope.repos {
        tracing::info!(server = %cfg.server, repo = %full_name, "fetching repository");
        records.push(host.get_repo(full_name)?);
    }

    classify(cfg, sync_root, records)
}

/// Filter `records` into desired repos and rejection reasons.
///
/// A record whose comparable URL was already seen replaces the earlier one.
pub fn classify(
    cfg: &GitHubConfig,
    sync_root: &Path,
    records: Vec<Repo>,
) -> Result<Resolution, SyncError> {
    let mut resolution = Resolution::default();

    for repo in records {
        let url = ComparableUrl::parse(&repo.clone_url)?;
        let login = repo.owner.login.as_str();
        let kind = repo.owner.kind();

        let include = cfg.effective_include(login, kind);
        let exclude = cfg.effective_exclude(login, kind);
        if let Some(reason) = rejection_reason(&repo, &include, exclude.as_ref()) {
            tracing::debug!(repo = %repo.full_name, %reason, "rejected");
            resolution.rejections.insert(url, reason);
            continue;
        }

        let path = sync_root.join(cfg.path_for_repo(login, &repo.name)?);
        let desired = DesiredRepo {
            url: url.clone(),
            clone_url: repo.clone_url,
            path,
            default_branch: repo.default_branch,
        };
        if let Some(previous) = resolution.desired.insert(url.clone(), desired) {
            tracing::warn!(
                %url,
                replaced = %previous.path.display(),
                "two repositories share one comparable URL; keeping the later one"
            );
        }
    }

    Ok(resolution)
}
