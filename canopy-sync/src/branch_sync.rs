//! Per-repository branch convergence after a fetch.

use canopy_core::TrackState;
use canopy_git::{GitError, WorkingCopy};

/// Result of one branch-sync pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchSyncOutcome {
    /// The fetch brought nothing new; no branch was touched.
    Unchanged,
    Updated { caveats: Vec<String> },
}

/// Fetch every remote and bring local branches in line with their upstreams.
///
/// Branches behind their upstream are fast-forwarded. A branch whose upstream
/// disappeared is deleted only if it was in sync before the fetch; anything
/// ahead or diverged is left alone with a caveat. When the checked-out
/// branch loses its upstream, the working copy switches to the branch
/// tracking `default_tracking_branch` first, creating it if needed.
///
/// The first failing git call aborts the pass.
pub fn sync_branches<W: WorkingCopy + ?Sized>(
    repo: &W,
    default_tracking_branch: &str,
) -> Result<BranchSyncOutcome, GitError> {
    let before = repo.local_branches()?;

    if !repo.fetch_all_and_prune()? {
        return Ok(BranchSyncOutcome::Unchanged);
    }

    let after = repo.local_branches()?;
    let mut current = before.current.clone();

    if let Some(cur) = before.current.as_deref() {
        let lost_upstream = before.track_of(cur).is_empty()
            && TrackState::from_track(after.track_of(cur)) == TrackState::Gone;
        if lost_upstream {
            match after.branch_tracking(default_tracking_branch) {
                Some(existing) => repo.switch_to_existing_branch(existing)?,
                None => repo.switch_to_new_tracking_branch(default_tracking_branch)?,
            }
            current = repo.current_branch()?;
            tracing::debug!(
                repo = %repo.root().display(),
                from = cur,
                to = current.as_deref().unwrap_or("(detached)"),
                "switched away from branch whose upstream is gone"
            );
        }
    }

    let mut caveats = Vec::new();
    for (branch, info) in &after.branches {
        match info.track_state() {
            TrackState::InSync => {}
            TrackState::Behind => {
                if current.as_deref() == Some(branch.as_str()) {
                    repo.fast_forward_merge()?;
                } else {
                    repo.reset_branch(branch, &info.upstream_branch)?;
                }
            }
            TrackState::Gone if before.track_of(branch).is_empty() => {
                repo.delete_branch(branch, true)?;
                caveats.push(format!("deleted {branch}"));
            }
            TrackState::Gone | TrackState::Other => {
                caveats.push(format!("left {branch} in place since it had unpushed changes"));
            }
        }
    }

    Ok(BranchSyncOutcome::Updated { caveats })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use canopy_core::{BranchInfo, BranchSnapshot, Remotes};
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::path::Path;

    /// Scripted working copy: hands out queued snapshots and records calls.
    #[derive(Default)]
    pub(crate) struct ScriptedRepo {
        pub snapshots: RefCell<VecDeque<BranchSnapshot>>,
        pub fetch_changed: bool,
        pub current_after_switch: Option<String>,
        pub fail_on: Option<&'static str>,
        pub calls: RefCell<Vec<String>>,
    }

    impl ScriptedRepo {
        fn record(&self, call: String) -> Result<(), GitError> {
            let failing = self.fail_on.is_some_and(|f| call.starts_with(f));
            self.calls.borrow_mut().push(call.clone());
            if failing {
                return Err(GitError::Command {
                    dir: "/repo".into(),
                    args: call,
                    output: "fatal: scripted failure".into(),
                });
            }
            Ok(())
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }
    }

    impl WorkingCopy for ScriptedRepo {
        fn root(&self) -> &Path {
            Path::new("/repo")
        }
        fn remotes(&self) -> Result<Remotes, GitError> {
            Ok(Remotes::new())
        }
        fn local_branches(&self) -> Result<BranchSnapshot, GitError> {
            self.record("branches".into())?;
            Ok(self.snapshots.borrow_mut().pop_front().unwrap_or_default())
        }
        fn current_branch(&self) -> Result<Option<String>, GitError> {
            self.record("current".into())?;
            Ok(self.current_after_switch.clone())
        }
        fn fetch_all_and_prune(&self) -> Result<bool, GitError> {
            self.record("fetch".into())?;
            Ok(self.fetch_changed)
        }
        fn fast_forward_merge(&self) -> Result<(), GitError> {
            self.record("merge".into())
        }
        fn reset_branch(&self, branch: &str, start: &str) -> Result<(), GitError> {
            self.record(format!("reset {branch} {start}"))
        }
        fn delete_branch(&self, branch: &str, force: bool) -> Result<(), GitError> {
            self.record(format!("delete {branch} force={force}"))
        }
        fn switch_to_existing_branch(&self, branch: &str) -> Result<(), GitError> {
            self.record(format!("switch {branch}"))
        }
        fn switch_to_new_tracking_branch(&self, upstream: &str) -> Result<(), GitError> {
            self.record(format!("track {upstream}"))
        }
    }

    fn snapshot(current: Option<&str>, branches: &[(&str, &str, &str)]) -> BranchSnapshot {
        BranchSnapshot {
            current: current.map(String::from),
            branches: branches
                .iter()
                .map(|(name, up, track)| (name.to_string(), BranchInfo::new(*up, *track)))
                .collect(),
        }
    }

    fn scripted(before: BranchSnapshot, after: BranchSnapshot) -> ScriptedRepo {
        ScriptedRepo {
            snapshots: RefCell::new(VecDeque::from([before, after])),
            fetch_changed: true,
            ..Default::default()
        }
    }

    #[test]
    fn noop_fetch_stops_immediately() {
        let repo = ScriptedRepo {
            snapshots: RefCell::new(VecDeque::from([snapshot(
                Some("main"),
                &[("main", "origin/main", "behind 1")],
            )])),
            fetch_changed: false,
            ..Default::default()
        };
        let outcome = sync_branches(&repo, "origin/main").unwrap();
        assert_eq!(outcome, BranchSyncOutcome::Unchanged);
        assert_eq!(repo.calls(), vec!["branches", "fetch"]);
    }

    #[test]
    fn behind_branches_merge_or_reset_by_checkout() {
        let before = snapshot(
            Some("main"),
            &[("main", "origin/main", ""), ("release", "origin/release", "")],
        );
        let after = snapshot(
            Some("main"),
            &[
                ("main", "origin/main", "behind 3"),
                ("release", "origin/release", "behind 1"),
            ],
        );
        let repo = scripted(before, after);

        let outcome = sync_branches(&repo, "origin/main").unwrap();
        assert_eq!(outcome, BranchSyncOutcome::Updated { caveats: vec![] });
        assert_eq!(
            repo.calls(),
            vec!["branches", "fetch", "branches", "merge", "reset release origin/release"]
        );
    }

    #[test]
    fn gone_branch_deleted_only_when_it_was_in_sync() {
        let before = snapshot(
            Some("main"),
            &[
                ("main", "origin/main", ""),
                ("merged", "origin/merged", ""),
                ("wip", "origin/wip", "ahead 2"),
            ],
        );
        let after = snapshot(
            Some("main"),
            &[
                ("main", "origin/main", ""),
                ("merged", "origin/merged", "gone"),
                ("wip", "origin/wip", "gone"),
            ],
        );
        let repo = scripted(before, after);

        let outcome = sync_branches(&repo, "origin/main").unwrap();
        assert_eq!(
            outcome,
            BranchSyncOutcome::Updated {
                caveats: vec![
                    "deleted merged".into(),
                    "left wip in place since it had unpushed changes".into()
                ]
            }
        );
        assert!(repo.calls().contains(&"delete merged force=true".to_string()));
        assert!(!repo.calls().iter().any(|c| c.starts_with("delete wip")));
    }

    #[test]
    fn ahead_and_diverged_branches_are_left_alone() {
        let before = snapshot(Some("main"), &[("main", "origin/main", "")]);
        let after = snapshot(
            Some("main"),
            &[
                ("main", "origin/main", "ahead 1"),
                ("topic", "origin/topic", "ahead 1, behind 2"),
            ],
        );
        let repo = scripted(before, after);

        let BranchSyncOutcome::Updated { caveats } = sync_branches(&repo, "origin/main").unwrap()
        else {
            panic!("expected update");
        };
        assert_eq!(caveats.len(), 2);
        assert_eq!(repo.calls(), vec!["branches", "fetch", "branches"]);
    }

    #[test]
    fn current_branch_losing_upstream_switches_to_existing_default() {
        let before = snapshot(
            Some("feature"),
            &[("feature", "origin/feature", ""), ("main", "origin/main", "")],
        );
        let after = snapshot(
            Some("feature"),
            &[
                ("feature", "origin/feature", "gone"),
                ("main", "origin/main", "behind 4"),
            ],
        );
        let mut repo = scripted(before, after);
        repo.current_after_switch = Some("main".into());

        let outcome = sync_branches(&repo, "origin/main").unwrap();
        assert_eq!(
            outcome,
            BranchSyncOutcome::Updated {
                caveats: vec!["deleted feature".into()]
            }
        );
        assert_eq!(
            repo.calls(),
            vec![
                "branches",
                "fetch",
                "branches",
                "switch main",
                "current",
                "delete feature force=true",
                "merge",
            ]
        );
    }

    #[test]
    fn current_branch_losing_upstream_creates_tracking_branch() {
        let before = snapshot(Some("feature"), &[("feature", "origin/feature", "")]);
        let after = snapshot(Some("feature"), &[("feature", "origin/feature", "gone")]);
        let mut repo = scripted(before, after);
        repo.current_after_switch = Some("main".into());

        sync_branches(&repo, "origin/main").unwrap();
        assert_eq!(
            repo.calls()[3..5],
            ["track origin/main".to_string(), "current".to_string()]
        );
    }

    #[test]
    fn detached_head_never_switches() {
        let before = snapshot(None, &[("main", "origin/main", "")]);
        let after = snapshot(None, &[("main", "origin/main", "behind 1")]);
        let repo = scripted(before, after);

        sync_branches(&repo, "origin/main").unwrap();
        assert_eq!(
            repo.calls(),
            vec!["branches", "fetch", "branches", "reset main origin/main"]
        );
    }

    #[test]
    fn first_failure_aborts() {
        let before = snapshot(Some("main"), &[("main", "origin/main", "")]);
        let after = snapshot(
            Some("main"),
            &[("a", "origin/a", "behind 1"), ("b", "origin/b", "behind 1")],
        );
        let mut repo = scripted(before, after);
        repo.fail_on = Some("reset a");

        let err = sync_branches(&repo, "origin/main").unwrap_err();
        assert!(err.to_string().contains("scripted failure"));
        assert!(!repo.calls().iter().any(|c| c.starts_with("reset b")));
    }
}
