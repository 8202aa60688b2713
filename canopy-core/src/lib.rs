//! canopy core library: domain types, comparable URLs, sync config, errors.
//!
//! Public API surface:
//! - [`types`]: desired repos, remotes, branch snapshots, account kinds
//! - [`comparable_url`]: the join key between local remotes and hosted repos
//! - [`config`]: `canopy.sync.yaml` model, discovery, validation, path mapping
//! - [`error`]: [`ConfigError`], [`UrlError`]

pub mod comparable_url;
pub mod config;
pub mod error;
pub mod types;

pub use comparable_url::ComparableUrl;
pub use config::{AccountCriteria, Criteria, GitHubConfig, ScopeTarget, SyncConfig};
pub use error::{ConfigError, UrlError};
pub use types::{
    AccountKind, BranchInfo, BranchSnapshot, DesiredRepo, DesiredRepos, RejectionReasons,
    RemoteUrls, Remotes, TrackState,
};
