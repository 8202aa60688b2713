//! Plan building: config discovery, local scan, resolution and reconciliation.
//!
//! Everything here runs on the calling thread and finishes before any action
//! is executed.

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use canopy_core::config::{find_config_file, load_config};
use canopy_core::{ConfigError, GitHubConfig, ScopeTarget};
use canopy_git::{fill_credential, find_repos, GitBackend, WorkingCopy};
use canopy_github::{GitHubClient, RepoHost};

use crate::action::Action;
use crate::error::SyncError;
use crate::reconcile::{reconcile, LocalRepoInfo};
use crate::resolve::{resolve, DiscoveryScope, Resolution};

/// Environment variable consulted for a host token before git's credential helpers.
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

/// An action plan and the root it was computed for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    /// Directory holding the config file.
    pub sync_root: PathBuf,
    pub actions: Vec<Action>,
}

/// Build the plan for `work_dir`, restricted to `args` when any are given.
///
/// `connect` is only called when at least one account or repository has to
/// be looked up at the host.
pub fn build_plan<G, H, F>(
    work_dir: &Path,
    args: &[PathBuf],
    git: &G,
    connect: F,
) -> Result<Plan, SyncError>
where
    G: GitBackend,
    H: RepoHost,
    F: FnOnce(&GitHubConfig) -> Result<H, SyncError>,
{
    let config_path = find_config_file(work_dir)?;
    let config = load_config(&config_path)?;
    let sync_root = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| work_dir.to_path_buf());
    tracing::debug!(root = %sync_root.display(), "found sync root");

    let targets = scope_paths(&sync_root, work_dir, args)?;
    let local = scan_local_repos(&sync_root, &targets, git)?;

    let resolution = match &config.github {
        Some(github) => {
            let scope_targets = targets
                .iter()
                .map(|t| relative_to(t, &sync_root).and_then(|rel| github.scope_for_path(&rel)))
                .collect::<Result<Vec<ScopeTarget>, ConfigError>>()?;
            let scope = DiscoveryScope::from_targets(github, &scope_targets);
            if scope.is_empty() {
                Resolution::default()
            } else {
                let host = connect(github)?;
                resolve(github, &sync_root, &scope, &host)?
            }
        }
        None => Resolution::default(),
    };

    let actions = reconcile(local, resolution.desired, &resolution.rejections)?;
    Ok(Plan { sync_root, actions })
}

/// Token for `server`: `$GITHUB_TOKEN`, else git's credential helpers.
pub fn host_token(server: &str) -> Result<String, SyncError> {
    if let Ok(token) = std::env::var(TOKEN_ENV) {
        if !token.is_empty() {
            return Ok(token);
        }
    }
    let (protocol, host) = server.split_once("://").unwrap_or(("https", server));
    let host = host.trim_end_matches('/');
    let cred = fill_credential(protocol, host).map_err(|source| SyncError::Credential {
        server: server.to_string(),
        source,
    })?;
    Ok(cred.password)
}

/// Connect to the configured GitHub server.
pub fn connect_github(cfg: &GitHubConfig) -> Result<GitHubClient, SyncError> {
    Ok(GitHubClient::new(&cfg.server, host_token(&cfg.server)?))
}

/// Absolute, lexically normalised scope paths; each must lie inside `sync_root`.
fn scope_paths(sync_root: &Path, work_dir: &Path, args: &[PathBuf]) -> Result<Vec<PathBuf>, SyncError> {
    args.iter()
        .map(|arg| {
            let abs = normalize(&work_dir.join(arg));
            relative_to(&abs, sync_root)?;
            Ok(abs)
        })
        .collect()
}

fn relative_to(path: &Path, root: &Path) -> Result<PathBuf, ConfigError> {
    path.strip_prefix(root)
        .map(Path::to_path_buf)
        .map_err(|_| ConfigError::OutsideRoot {
            path: path.to_path_buf(),
            root: root.to_path_buf(),
        })
}

/// Resolve `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Repositories below each target (or the whole root), with remotes read.
fn scan_local_repos<G: GitBackend>(
    sync_root: &Path,
    targets: &[PathBuf],
    git: &G,
) -> Result<Vec<LocalRepoInfo>, SyncError> {
    let roots: Vec<&Path> = if targets.is_empty() {
        vec![sync_root]
    } else {
        targets.iter().map(PathBuf::as_path).collect()
    };

    let mut found = BTreeSet::new();
    for root in roots.into_iter().filter(|r| r.exists()) {
        found.extend(find_repos(root)?);
    }
    tracing::debug!(count = found.len(), "found local repositories");

    found
        .into_iter()
        .map(|path| {
            let remotes = git.open(&path)?.remotes()?;
            Ok(LocalRepoInfo { path, remotes })
        })
        .collect()
}
