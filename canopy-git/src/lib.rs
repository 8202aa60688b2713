//! # canopy-git
//!
//! Per-repository git operations used by the sync engine.
//!
//! The engine talks to working copies only through [`WorkingCopy`] and opens or
//! clones them through [`GitBackend`]; [`GitCli`] implements both by running the
//! `git` executable.

pub mod credential;
pub mod error;
pub mod repo;
pub mod scan;
pub mod status;

pub use credential::{fill_credential, Credential};
pub use error::GitError;
pub use repo::{GitBackend, GitCli, GitRepo, WorkingCopy};
pub use scan::{find_repos, is_repo_root};
pub use status::WorkTreeStatus;
