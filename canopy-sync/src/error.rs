//! Error types for canopy-sync.

use std::path::PathBuf;

use canopy_core::{ConfigError, UrlError};
use canopy_git::GitError;
use canopy_github::GitHubError;
use thiserror::Error;

/// Failures that stop a sync before any action runs.
///
/// Per-action failures never surface here; they become `Failed` events.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Listing or fetching repositories at the host failed.
    #[error("failed to discover repositories: {0}")]
    Discovery(#[from] GitHubError),

    /// Walking the sync root or reading a local repo's remotes failed.
    #[error("failed to scan local repositories: {0}")]
    LocalScan(#[from] GitError),

    #[error("failed to get credentials for {server}: {source}")]
    Credential {
        server: String,
        #[source]
        source: GitError,
    },

    #[error(transparent)]
    Url(#[from] UrlError),

    /// One local working copy matches several desired repositories.
    #[error("{path} matched with more than one URL: {matches:?}")]
    AmbiguousMatch { path: PathBuf, matches: Vec<String> },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
