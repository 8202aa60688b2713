//! # canopy-sync
//!
//! Converges a tree of local git working copies with the repositories a
//! hosting service reports for the configured accounts.
//!
//! A run has two phases:
//!
//! 1. **Plan** ([`pipeline::build_plan`]), single-threaded: find the config,
//!    scan local repositories, resolve the desired set through a
//!    [`RepoHost`](canopy_github::RepoHost), and [`reconcile`](reconcile::reconcile)
//!    the two into a list of [`Action`]s.
//! 2. **Execute** ([`scheduler::run`]): a bounded worker pool runs each action
//!    through an [`ActionExecutor`] and streams one [`ActionEvent`] per action
//!    to a [`Reporter`].

pub mod action;
pub mod branch_sync;
pub mod error;
pub mod event;
pub mod filter;
pub mod pipeline;
pub mod reconcile;
pub mod resolve;
pub mod scheduler;

pub use action::{display_path, Action, ActionExecutor, Executor, SyncOptions};
pub use branch_sync::{sync_branches, BranchSyncOutcome};
pub use error::SyncError;
pub use event::{ActionEvent, EventKind, Reporter, RunSummary};
pub use pipeline::{build_plan, connect_github, Plan};
pub use reconcile::{reconcile, LocalRepoInfo};
pub use resolve::{DiscoveryScope, Resolution};
