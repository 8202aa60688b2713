//! `canopy.sync.yaml`: sync config model, discovery, validation and path mapping.
//!
//! # Layout on disk
//!
//! ```text
//! <sync root>/
//!   canopy.sync.yaml
//!   <org>/<repo>/            (nested, default with several accounts)
//!   <org>__<repo>/           (single dir, several accounts)
//!   <repo>/                  (single dir, single account)
//! ```
//!
//! Per-account criteria override the global criteria field by field, and only
//! where the account sets the field ("override-on-set").

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};
use crate::types::AccountKind;

pub const CONFIG_FILE_NAME: &str = "canopy.sync.yaml";

/// Separator between account and repo name when several accounts share one directory.
pub const DEFAULT_ACCOUNT_PREFIX_SEPARATOR: &str = "__";

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// Root of the sync config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<GitHubConfig>,
}

/// Repositories to mirror from a GitHub (or GitHub Enterprise) server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// `github.com` or an enterprise host name.
    #[serde(default)]
    pub server: String,

    #[serde(rename = "org", default, skip_serializing_if = "Option::is_none")]
    pub single_org: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub orgs: BTreeMap<String, Option<AccountCriteria>>,

    #[serde(rename = "user", default, skip_serializing_if = "Option::is_none")]
    pub single_user: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub users: BTreeMap<String, Option<AccountCriteria>>,

    /// Global criteria, written inline at the `github:` level.
    #[serde(flatten)]
    pub criteria: AccountCriteria,

    #[serde(
        rename = "singleDirForAllRepos",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub single_dir_for_all_repos: Option<bool>,

    #[serde(
        rename = "accountPrefixSeparator",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub account_prefix_separator: Option<String>,
}

/// Inclusion criteria plus optional exclusions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountCriteria {
    #[serde(flatten)]
    pub include: Criteria,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Criteria>,
}

/// Glob lists and exact-match booleans evaluated against a hosted repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criteria {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub topics: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fork: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_template: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private: Option<bool>,
}

impl Criteria {
    /// `self` with every field the `overrides` sets replaced.
    pub fn overridden_by(&self, overrides: &Criteria) -> Criteria {
        fn pick_list(base: &[String], over: &[String]) -> Vec<String> {
            if over.is_empty() { base.to_vec() } else { over.to_vec() }
        }
        Criteria {
            names: pick_list(&self.names, &overrides.names),
            topics: pick_list(&self.topics, &overrides.topics),
            languages: pick_list(&self.languages, &overrides.languages),
            archived: overrides.archived.or(self.archived),
            fork: overrides.fork.or(self.fork),
            is_template: overrides.is_template.or(self.is_template),
            private: overrides.private.or(self.private),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Criteria::default()
    }
}

/// What a positional scope argument resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeTarget {
    /// The sync root itself: every configured account.
    All,
    /// One account, all of its repositories.
    Account { login: String, kind: AccountKind },
    /// One repository of one account.
    Repo {
        login: String,
        kind: AccountKind,
        name: String,
    },
}

// ---------------------------------------------------------------------------
// Validation and account lookup
// ---------------------------------------------------------------------------

impl SyncConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.github {
            Some(github) => github.validate(),
            None => Err(ConfigError::Invalid("empty config".to_string())),
        }
    }
}

impl GitHubConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.server.trim().is_empty() {
            return invalid("server is missing");
        }

        if self.single_org.is_some() {
            if !self.orgs.is_empty() {
                return invalid("cannot have org and orgs");
            }
            if self.single_user.is_some() {
                return invalid("cannot have org and user");
            }
            if !self.users.is_empty() {
                return invalid("cannot have org and users");
            }
        }

        if self.single_user.is_some() {
            if !self.orgs.is_empty() {
                return invalid("cannot have user and orgs");
            }
            if !self.users.is_empty() {
                return invalid("cannot have user and users");
            }
        }

        Ok(())
    }

    /// Exactly one account configured via `org:` or `user:`.
    pub fn is_single_account(&self) -> bool {
        self.single_org.is_some() || self.single_user.is_some()
    }

    /// Every configured account, orgs first, each group sorted by login.
    pub fn accounts(&self) -> Vec<(String, AccountKind)> {
        let mut accounts = Vec::new();
        match &self.single_org {
            Some(org) => accounts.push((org.clone(), AccountKind::Organization)),
            None => accounts.extend(
                self.orgs
                    .keys()
                    .map(|name| (name.clone(), AccountKind::Organization)),
            ),
        }
        match &self.single_user {
            Some(user) => accounts.push((user.clone(), AccountKind::User)),
            None => accounts.extend(self.users.keys().map(|name| (name.clone(), AccountKind::User))),
        }
        accounts
    }

    /// Kind of the configured account named `name`, if any.
    pub fn account_kind(&self, name: &str) -> Option<AccountKind> {
        if self.single_org.as_deref() == Some(name) || self.orgs.contains_key(name) {
            return Some(AccountKind::Organization);
        }
        if self.single_user.as_deref() == Some(name) || self.users.contains_key(name) {
            return Some(AccountKind::User);
        }
        None
    }

    /// Per-account criteria block, when the account has one.
    pub fn account_criteria(&self, login: &str, kind: AccountKind) -> Option<&AccountCriteria> {
        let map = match kind {
            AccountKind::Organization => &self.orgs,
            AccountKind::User => &self.users,
        };
        map.get(login).and_then(Option::as_ref)
    }

    /// Effective inclusion criteria for an account.
    pub fn effective_include(&self, login: &str, kind: AccountKind) -> Criteria {
        match self.account_criteria(login, kind) {
            Some(account) => self.criteria.include.overridden_by(&account.include),
            None => self.criteria.include.clone(),
        }
    }

    /// Effective exclusion criteria for an account.
    pub fn effective_exclude(&self, login: &str, kind: AccountKind) -> Option<Criteria> {
        let global = self.criteria.exclude.as_ref();
        let account = self
            .account_criteria(login, kind)
            .and_then(|c| c.exclude.as_ref());
        match (global, account) {
            (Some(global), Some(account)) => Some(global.overridden_by(account)),
            (None, Some(account)) => Some(account.clone()),
            (Some(global), None) => Some(global.clone()),
            (None, None) => None,
        }
    }

    // -----------------------------------------------------------------------
    // Path mapping
    // -----------------------------------------------------------------------

    fn single_dir(&self) -> bool {
        self.single_dir_for_all_repos
            .unwrap_or_else(|| self.is_single_account())
    }

    /// Separator used in single-directory mode.
    fn single_dir_separator(&self) -> &str {
        match &self.account_prefix_separator {
            Some(sep) => sep,
            None if self.is_single_account() => "",
            None => DEFAULT_ACCOUNT_PREFIX_SEPARATOR,
        }
    }

    /// Path of a repository relative to the sync root.
    pub fn path_for_repo(&self, account: &str, repo: &str) -> Result<PathBuf, ConfigError> {
        if self.account_kind(account).is_none() {
            return Err(ConfigError::UnmappedPath {
                path: PathBuf::from(account).join(repo),
                reason: format!("account {account:?} is neither a configured org nor user"),
            });
        }

        if self.single_dir() {
            let sep = self.single_dir_separator();
            if sep.is_empty() {
                return Ok(PathBuf::from(repo));
            }
            return Ok(PathBuf::from(format!("{account}{sep}{repo}")));
        }

        let repo_dir = match &self.account_prefix_separator {
            Some(sep) => format!("{account}{sep}{repo}"),
            None => repo.to_string(),
        };
        Ok(PathBuf::from(account).join(repo_dir))
    }

    /// Inverse of [`path_for_repo`](Self::path_for_repo) for a path relative to the sync root.
    ///
    /// An empty path means the whole sync root.
    pub fn scope_for_path(&self, rel: &Path) -> Result<ScopeTarget, ConfigError> {
        let parts: Vec<String> = rel
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();

        let Some(first) = parts.first() else {
            return Ok(ScopeTarget::All);
        };

        let unmapped = |reason: String| ConfigError::UnmappedPath {
            path: rel.to_path_buf(),
            reason,
        };

        if self.single_dir() {
            let sep = self.single_dir_separator();
            if sep.is_empty() {
                let (login, kind) = match (&self.single_org, &self.single_user) {
                    (Some(org), _) => (org.clone(), AccountKind::Organization),
                    (None, Some(user)) => (user.clone(), AccountKind::User),
                    (None, None) => {
                        return Err(unmapped(
                            "several accounts share one directory without a separator".into(),
                        ))
                    }
                };
                return Ok(ScopeTarget::Repo {
                    login,
                    kind,
                    name: first.clone(),
                });
            }

            let Some((login, name)) = first.split_once(sep) else {
                return Err(unmapped(format!("{first:?} has no {sep:?} account prefix")));
            };
            let kind = self
                .account_kind(login)
                .ok_or_else(|| unmapped(format!("unknown account {login:?}")))?;
            return Ok(ScopeTarget::Repo {
                login: login.to_string(),
                kind,
                name: name.to_string(),
            });
        }

        let login = first.clone();
        let kind = self
            .account_kind(&login)
            .ok_or_else(|| unmapped(format!("unknown account {login:?}")))?;

        let Some(repo_dir) = parts.get(1) else {
            return Ok(ScopeTarget::Account { login, kind });
        };

        let name = match &self.account_prefix_separator {
            Some(sep) if !sep.is_empty() => {
                let prefix = format!("{login}{sep}");
                repo_dir
                    .strip_prefix(&prefix)
                    .ok_or_else(|| unmapped(format!("{repo_dir:?} does not start with {prefix:?}")))?
                    .to_string()
            }
            _ => repo_dir.clone(),
        };

        Ok(ScopeTarget::Repo { login, kind, name })
    }
}

// ---------------------------------------------------------------------------
// Load / save
// ---------------------------------------------------------------------------

/// Walk up from `start` looking for [`CONFIG_FILE_NAME`].
pub fn find_config_file(start: &Path) -> Result<PathBuf, ConfigError> {
    for dir in start.ancestors() {
        let candidate = dir.join(CONFIG_FILE_NAME);
        match std::fs::metadata(&candidate) {
            Ok(_) => return Ok(candidate),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
            Err(err) => return Err(io_err(candidate, err)),
        }
    }
    Err(ConfigError::NotFound {
        start: start.to_path_buf(),
    })
}

/// Decode and validate a config document.
pub fn parse_config(contents: &str) -> Result<SyncConfig, ConfigError> {
    let cfg: SyncConfig = serde_yaml::from_str(contents)?;
    cfg.validate()?;
    Ok(cfg)
}

/// Load and validate the config at `path`.
pub fn load_config(path: &Path) -> Result<SyncConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let cfg: SyncConfig = serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    cfg.validate()?;
    tracing::debug!(path = %path.display(), "loaded sync config");
    Ok(cfg)
}

/// Write `cfg` to `<dir>/canopy.sync.yaml`; refuses to overwrite unless `force`.
///
/// Accounts without criteria are written as bare `name:` keys instead of `name: null`.
pub fn write_config(dir: &Path, cfg: &SyncConfig, force: bool) -> Result<PathBuf, ConfigError> {
    let path = dir.join(CONFIG_FILE_NAME);
    if path.exists() && !force {
        return Err(ConfigError::AlreadyExists { path });
    }

    let yaml = serde_yaml::to_string(cfg)?;
    let mut out = String::with_capacity(yaml.len());
    for line in yaml.lines() {
        match line.strip_suffix(": null") {
            Some(key) => {
                out.push_str(key);
                out.push(':');
            }
            None => out.push_str(line),
        }
        out.push('\n');
    }

    let tmp = path.with_extension("yaml.tmp");
    std::fs::write(&tmp, out).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;
    Ok(path)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
