//! Domain types shared by the canopy crates.
//!
//! All path fields use `PathBuf`. Maps are `BTreeMap` so that every pass over
//! remotes, branches and desired repos happens in a reproducible order.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::comparable_url::ComparableUrl;

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

/// Kind of account that owns hosted repositories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AccountKind {
    Organization,
    User,
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountKind::Organization => write!(f, "Organization"),
            AccountKind::User => write!(f, "User"),
        }
    }
}

// ---------------------------------------------------------------------------
// Desired state
// ---------------------------------------------------------------------------

/// A repository that should exist locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredRepo {
    /// Canonical join key.
    pub url: ComparableUrl,
    /// URL handed to `git clone`.
    pub clone_url: String,
    /// Absolute target path of the working copy.
    pub path: PathBuf,
    pub default_branch: String,
}

/// Desired repos keyed by comparable URL.
pub type DesiredRepos = BTreeMap<ComparableUrl, DesiredRepo>;

/// Comparable URL -> why the repo was filtered out.
pub type RejectionReasons = BTreeMap<ComparableUrl, String>;

// ---------------------------------------------------------------------------
// Local state
// ---------------------------------------------------------------------------

/// Fetch and push URLs of one named remote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RemoteUrls {
    pub fetch_url: String,
    pub push_url: String,
}

/// Remote name -> URLs.
pub type Remotes = BTreeMap<String, RemoteUrls>;

/// Upstream information of one local branch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BranchInfo {
    /// Short upstream ref, e.g. `origin/main`; empty when none is configured.
    pub upstream_branch: String,
    /// Raw track status, e.g. `""`, `"behind 2"`, `"ahead 1, behind 3"`, `"gone"`.
    pub upstream_track: String,
}

impl BranchInfo {
    pub fn new(upstream_branch: impl Into<String>, upstream_track: impl Into<String>) -> Self {
        Self {
            upstream_branch: upstream_branch.into(),
            upstream_track: upstream_track.into(),
        }
    }

    /// Classification by the first whitespace-delimited token of the track status.
    pub fn track_state(&self) -> TrackState {
        TrackState::from_track(&self.upstream_track)
    }

    pub fn is_in_sync(&self) -> bool {
        self.track_state() == TrackState::InSync
    }
}

/// Coarse relationship between a branch and its upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    /// Empty status: in sync, or no upstream configured.
    InSync,
    Behind,
    /// The upstream ref was deleted.
    Gone,
    /// Ahead, diverged or anything else git may report.
    Other,
}

impl TrackState {
    pub fn from_track(track: &str) -> Self {
        match track.split_whitespace().next().unwrap_or("") {
            "" => TrackState::InSync,
            "behind" => TrackState::Behind,
            "gone" => TrackState::Gone,
            _ => TrackState::Other,
        }
    }
}

/// Local branches of a working copy plus the checked-out branch
/// (`None` when HEAD is detached).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BranchSnapshot {
    pub branches: BTreeMap<String, BranchInfo>,
    pub current: Option<String>,
}

impl BranchSnapshot {
    /// Track status of `branch`; a branch missing from the snapshot reads as in sync.
    pub fn track_of(&self, branch: &str) -> &str {
        self.branches
            .get(branch)
            .map(|info| info.upstream_track.as_str())
            .unwrap_or("")
    }

    /// First branch (by name) whose upstream is `upstream`.
    pub fn branch_tracking(&self, upstream: &str) -> Option<&str> {
        self.branches
            .iter()
            .find(|(_, info)| info.upstream_branch == upstream)
            .map(|(name, _)| name.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
