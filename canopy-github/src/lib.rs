//! # canopy-github
//!
//! Repo-host collaborator: repository listings and account lookups.
//!
//! The sync engine depends only on [`RepoHost`]; [`GitHubClient`] implements it
//! against the GitHub REST v3 API (github.com or GitHub Enterprise Server).

pub mod client;
pub mod error;
pub mod types;

pub use client::{api_root, GitHubClient};
pub use error::GitHubError;
pub use types::{Account, Repo};

/// A hosting service that can enumerate repositories.
pub trait RepoHost {
    /// Every repository `account` owns or can see, across all pages.
    fn list_repos(&self, account: &Account) -> Result<Vec<Repo>, GitHubError>;

    /// Look up an account by login to learn whether it is a user or an org.
    fn get_account(&self, name: &str) -> Result<Account, GitHubError>;

    /// One repository by `owner/name`.
    fn get_repo(&self, full_name: &str) -> Result<Repo, GitHubError>;
}
