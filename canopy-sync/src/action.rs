//! Planned actions and their execution.

use std::fs;
use std::path::{Path, PathBuf};

use canopy_git::{GitBackend, GitError};

use crate::branch_sync::{sync_branches, BranchSyncOutcome};
use crate::event::{ActionEvent, EventKind};

/// One step of the plan. Each carries everything a worker needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Clone {
        url: String,
        path: PathBuf,
    },
    MoveAndSync {
        orig_path: PathBuf,
        dest_path: PathBuf,
        default_tracking_branch: String,
    },
    Sync {
        path: PathBuf,
        default_tracking_branch: String,
    },
    Remove {
        path: PathBuf,
        reason: String,
    },
}

impl Action {
    /// Path the action is reported under.
    pub fn name(&self) -> &Path {
        match self {
            Action::Clone { path, .. } => path,
            Action::MoveAndSync { dest_path, .. } => dest_path,
            Action::Sync { path, .. } => path,
            Action::Remove { path, .. } => path,
        }
    }
}

/// Run-wide switches consumed by the scheduler and by action execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOptions {
    pub dry_run: bool,
    /// Worker count; `None` means one per logical CPU.
    pub jobs: Option<usize>,
    pub keep_going: bool,
    pub prune: bool,
}

impl SyncOptions {
    pub fn worker_count(&self) -> usize {
        self.jobs
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            })
            .max(1)
    }
}

/// Executes one action to completion and reports the outcome.
///
/// Never fails: every error becomes a [`EventKind::Failed`] event.
pub trait ActionExecutor: Send + Sync + 'static {
    fn execute(&self, action: &Action, opts: &SyncOptions) -> ActionEvent;
}

/// `path` relative to `base` when it lies below it, for display.
pub fn display_path(path: &Path, base: Option<&Path>) -> String {
    base.and_then(|b| path.strip_prefix(b).ok())
        .filter(|rel| !rel.as_os_str().is_empty())
        .unwrap_or(path)
        .display()
        .to_string()
}

/// [`ActionExecutor`] over a git backend and the local filesystem.
pub struct Executor<B> {
    backend: B,
    display_base: Option<PathBuf>,
}

impl<B: GitBackend> Executor<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            display_base: None,
        }
    }

    /// Report paths relative to `base`.
    pub fn with_display_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.display_base = Some(base.into());
        self
    }

    fn name(&self, path: &Path) -> String {
        display_path(path, self.display_base.as_deref())
    }

    fn clone_repo(&self, url: &str, path: &Path, opts: &SyncOptions) -> ActionEvent {
        let name = self.name(path);
        match path.try_exists() {
            Ok(false) => {}
            Ok(true) => {
                return ActionEvent::new(
                    EventKind::Failed,
                    name,
                    format!("would clone from {url}, but {} already exists", path.display()),
                )
            }
            Err(e) => return unreadable(name, path, e),
        }
        if opts.dry_run {
            return ActionEvent::new(EventKind::Cloned, name, format!("would clone from {url}"));
        }
        match self.backend.clone_repo(url, path) {
            Ok(()) => ActionEvent::new(EventKind::Cloned, name, format!("cloned from {url}")),
            Err(e) => ActionEvent::new(EventKind::Failed, name, e.to_string()),
        }
    }

    fn move_and_sync(
        &self,
        orig: &Path,
        dest: &Path,
        tracking: &str,
        opts: &SyncOptions,
    ) -> ActionEvent {
        match dest.try_exists() {
            Ok(false) => {}
            Ok(true) => {
                return ActionEvent::new(
                    EventKind::Failed,
                    self.name(orig),
                    format!("would move to {}, but it already exists", dest.display()),
                )
            }
            Err(e) => return unreadable(self.name(orig), dest, e),
        }
        if opts.dry_run {
            return ActionEvent::new(
                EventKind::Updated,
                self.name(dest),
                format!("would move to {} and sync", dest.display()),
            );
        }

        let moved = dest
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|()| fs::rename(orig, dest));
        if let Err(e) = moved {
            return ActionEvent::new(EventKind::Failed, self.name(orig), e.to_string());
        }
        self.sync(dest, tracking)
    }

    fn sync(&self, path: &Path, tracking: &str) -> ActionEvent {
        let name = self.name(path);
        let outcome = self
            .backend
            .open(path)
            .and_then(|repo| sync_branches(&repo, tracking));
        match outcome {
            Ok(BranchSyncOutcome::Unchanged) => {
                ActionEvent::new(EventKind::Unchanged, name, "no updates")
            }
            Ok(BranchSyncOutcome::Updated { caveats }) => {
                ActionEvent::new(EventKind::Updated, name, "updated").with_caveats(caveats)
            }
            Err(e) => failed(name, e),
        }
    }

    fn remove(&self, path: &Path, reason: &str, opts: &SyncOptions) -> ActionEvent {
        let name = self.name(path);
        match (opts.prune, opts.dry_run) {
            (false, true) => ActionEvent::new(
                EventKind::Ignored,
                name,
                format!("would not remove without --prune: {reason}"),
            ),
            (false, false) => ActionEvent::new(
                EventKind::Ignored,
                name,
                format!("keeping extra repo: {reason} -- use --prune to remove it"),
            ),
            (true, true) => {
                ActionEvent::new(EventKind::Removed, name, format!("would remove: {reason}"))
            }
            (true, false) => match fs::remove_dir_all(path) {
                Ok(()) => ActionEvent::new(EventKind::Removed, name, "removed"),
                Err(e) => ActionEvent::new(EventKind::Failed, name, e.to_string()),
            },
        }
    }
}

/// A target whose existence cannot be determined is never written to.
fn unreadable(name: String, path: &Path, e: std::io::Error) -> ActionEvent {
    ActionEvent::new(
        EventKind::Failed,
        name,
        format!("cannot check {}: {e}", path.display()),
    )
}

fn failed(name: String, e: GitError) -> ActionEvent {
    ActionEvent::new(EventKind::Failed, name, e.to_string())
}

impl<B: GitBackend + 'static> ActionExecutor for Executor<B> {
    fn execute(&self, action: &Action, opts: &SyncOptions) -> ActionEvent {
        let event = match action {
            Action::Clone { url, path } => self.clone_repo(url, path, opts),
            Action::MoveAndSync {
                orig_path,
                dest_path,
                default_tracking_branch,
            } => self.move_and_sync(orig_path, dest_path, default_tracking_branch, opts),
            Action::Sync {
                path,
                default_tracking_branch,
            } => {
                if opts.dry_run {
                    ActionEvent::new(EventKind::Updated, self.name(path), "would sync")
                } else {
                    self.sync(path, default_tracking_branch)
                }
            }
            Action::Remove { path, reason } => self.remove(path, reason, opts),
        };
        tracing::info!(
            kind = ?event.kind,
            name = %event.name,
            message = %event.message,
            "action finished"
        );
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::branch_sync::tests::ScriptedRepo;
    use canopy_core::{BranchInfo, BranchSnapshot};
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Backend whose clones create an empty `.git` dir and whose working
    /// copies report a fixed branch layout.
    #[derive(Default)]
    struct FakeBackend {
        cloned: Mutex<Vec<(String, PathBuf)>>,
        fetch_changed: bool,
    }

    impl GitBackend for FakeBackend {
        type Repo = ScriptedRepo;

        fn open(&self, root: &Path) -> Result<ScriptedRepo, GitError> {
            if !root.join(".git").exists() {
                return Err(GitError::NotARepo {
                    path: root.to_path_buf(),
                });
            }
            let snapshot = BranchSnapshot {
                current: Some("main".into()),
                branches: [("main".to_string(), BranchInfo::new("origin/main", ""))].into(),
            };
            let mut after = snapshot.clone();
            after.branches.insert("old".into(), BranchInfo::new("origin/old", "gone"));
            Ok(ScriptedRepo {
                snapshots: RefCell::new(VecDeque::from([snapshot, after])),
                fetch_changed: self.fetch_changed,
                ..Default::default()
            })
        }

        fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), GitError> {
            if url.contains("broken") {
                return Err(GitError::Command {
                    dir: dest.to_path_buf(),
                    args: format!("clone -- {url}"),
                    output: "fatal: repository not found".into(),
                });
            }
            fs::create_dir_all(dest.join(".git")).map_err(|source| GitError::Io {
                path: dest.to_path_buf(),
                source,
            })?;
            self.cloned
                .lock()
                .unwrap()
                .push((url.to_string(), dest.to_path_buf()));
            Ok(())
        }
    }

    fn opts(dry_run: bool, prune: bool) -> SyncOptions {
        SyncOptions {
            dry_run,
            prune,
            ..Default::default()
        }
    }

    fn repo_dir(root: &Path, rel: &str) -> PathBuf {
        let dir = root.join(rel);
        fs::create_dir_all(dir.join(".git")).unwrap();
        dir
    }

    #[test]
    fn clone_into_missing_path() {
        let tmp = TempDir::new().unwrap();
        let exec = Executor::new(FakeBackend::default()).with_display_base(tmp.path());
        let path = tmp.path().join("org/a");
        let event = exec.execute(
            &Action::Clone {
                url: "https://h/org/a.git".into(),
                path: path.clone(),
            },
            &opts(false, false),
        );
        assert_eq!(event.kind, EventKind::Cloned);
        assert_eq!(event.name, "org/a");
        assert_eq!(event.message, "cloned from https://h/org/a.git");
        assert!(path.join(".git").exists());
    }

    #[test]
    fn clone_onto_existing_path_fails_without_cloning() {
        let tmp = TempDir::new().unwrap();
        let backend = FakeBackend::default();
        let exec = Executor::new(backend);
        let event = exec.execute(
            &Action::Clone {
                url: "u".into(),
                path: tmp.path().to_path_buf(),
            },
            &opts(false, false),
        );
        assert_eq!(event.kind, EventKind::Failed);
        assert!(event.message.ends_with("already exists"), "{}", event.message);
        assert!(exec.backend.cloned.lock().unwrap().is_empty());
    }

    #[test]
    fn clone_target_that_cannot_be_checked_fails_without_cloning() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("org");
        fs::write(&blocker, "not a directory").unwrap();
        let exec = Executor::new(FakeBackend::default());
        let event = exec.execute(
            &Action::Clone {
                url: "u".into(),
                path: blocker.join("a"),
            },
            &opts(false, false),
        );
        assert_eq!(event.kind, EventKind::Failed);
        assert!(event.message.starts_with("cannot check "), "{}", event.message);
        assert!(exec.backend.cloned.lock().unwrap().is_empty());
    }

    #[test]
    fn clone_failure_carries_git_output() {
        let tmp = TempDir::new().unwrap();
        let exec = Executor::new(FakeBackend::default());
        let event = exec.execute(
            &Action::Clone {
                url: "https://h/broken".into(),
                path: tmp.path().join("x"),
            },
            &opts(false, false),
        );
        assert_eq!(event.kind, EventKind::Failed);
        assert!(event.message.contains("repository not found"));
    }

    #[test]
    fn dry_run_has_no_side_effects() {
        let tmp = TempDir::new().unwrap();
        let exec = Executor::new(FakeBackend::default());
        let orig = repo_dir(tmp.path(), "old/a");
        let dest = tmp.path().join("org/a");

        let clone = exec.execute(
            &Action::Clone {
                url: "u".into(),
                path: tmp.path().join("new"),
            },
            &opts(true, true),
        );
        let moved = exec.execute(
            &Action::MoveAndSync {
                orig_path: orig.clone(),
                dest_path: dest.clone(),
                default_tracking_branch: "origin/main".into(),
            },
            &opts(true, true),
        );
        let synced = exec.execute(
            &Action::Sync {
                path: orig.clone(),
                default_tracking_branch: "origin/main".into(),
            },
            &opts(true, true),
        );
        let removed = exec.execute(
            &Action::Remove {
                path: orig.clone(),
                reason: "gone".into(),
            },
            &opts(true, true),
        );

        assert_eq!(clone.message, "would clone from u");
        assert_eq!(moved.kind, EventKind::Updated);
        assert!(moved.message.starts_with("would move to"));
        assert_eq!(synced.message, "would sync");
        assert_eq!(removed.kind, EventKind::Removed);
        assert_eq!(removed.message, "would remove: gone");
        assert!(orig.exists());
        assert!(!dest.exists());
        assert!(!tmp.path().join("new").exists());
    }

    #[test]
    fn move_creates_parent_and_syncs_at_destination() {
        let tmp = TempDir::new().unwrap();
        let exec = Executor::new(FakeBackend {
            fetch_changed: true,
            ..Default::default()
        })
        .with_display_base(tmp.path());
        let orig = repo_dir(tmp.path(), "old/a");
        let dest = tmp.path().join("org/a");

        let event = exec.execute(
            &Action::MoveAndSync {
                orig_path: orig.clone(),
                dest_path: dest.clone(),
                default_tracking_branch: "origin/main".into(),
            },
            &opts(false, false),
        );
        assert_eq!(event.kind, EventKind::Updated, "{event:?}");
        assert_eq!(event.name, "org/a");
        assert_eq!(event.caveats, vec!["deleted old".to_string()]);
        assert!(!orig.exists());
        assert!(dest.join(".git").exists());
    }

    #[test]
    fn move_onto_existing_destination_fails_under_original_name() {
        let tmp = TempDir::new().unwrap();
        let exec = Executor::new(FakeBackend::default()).with_display_base(tmp.path());
        let orig = repo_dir(tmp.path(), "old/a");
        let dest = repo_dir(tmp.path(), "org/a");

        let event = exec.execute(
            &Action::MoveAndSync {
                orig_path: orig.clone(),
                dest_path: dest.clone(),
                default_tracking_branch: "origin/main".into(),
            },
            &opts(false, false),
        );
        assert_eq!(event.kind, EventKind::Failed);
        assert_eq!(event.name, "old/a");
        assert!(orig.exists());
    }

    #[test]
    fn move_to_destination_that_cannot_be_checked_fails() {
        let tmp = TempDir::new().unwrap();
        let exec = Executor::new(FakeBackend::default()).with_display_base(tmp.path());
        let orig = repo_dir(tmp.path(), "old/a");
        fs::write(tmp.path().join("org"), "not a directory").unwrap();

        let event = exec.execute(
            &Action::MoveAndSync {
                orig_path: orig.clone(),
                dest_path: tmp.path().join("org/a"),
                default_tracking_branch: "origin/main".into(),
            },
            &opts(false, false),
        );
        assert_eq!(event.kind, EventKind::Failed);
        assert_eq!(event.name, "old/a");
        assert!(event.message.starts_with("cannot check "), "{}", event.message);
        assert!(orig.exists());
    }

    #[test]
    fn sync_without_changes_is_unchanged() {
        let tmp = TempDir::new().unwrap();
        let exec = Executor::new(FakeBackend::default());
        let path = repo_dir(tmp.path(), "org/a");
        let event = exec.execute(
            &Action::Sync {
                path,
                default_tracking_branch: "origin/main".into(),
            },
            &opts(false, false),
        );
        assert_eq!(event.kind, EventKind::Unchanged);
        assert_eq!(event.message, "no updates");
    }

    #[test]
    fn sync_of_non_repo_fails() {
        let tmp = TempDir::new().unwrap();
        let exec = Executor::new(FakeBackend::default());
        let event = exec.execute(
            &Action::Sync {
                path: tmp.path().to_path_buf(),
                default_tracking_branch: "origin/main".into(),
            },
            &opts(false, false),
        );
        assert_eq!(event.kind, EventKind::Failed);
    }

    #[test]
    fn remove_without_prune_is_ignored_and_keeps_directory() {
        let tmp = TempDir::new().unwrap();
        let exec = Executor::new(FakeBackend::default());
        let path = repo_dir(tmp.path(), "extra");
        let action = Action::Remove {
            path: path.clone(),
            reason: "did not match any remote repo URL".into(),
        };

        let event = exec.execute(&action, &opts(false, false));
        assert_eq!(event.kind, EventKind::Ignored);
        assert_eq!(
            event.message,
            "keeping extra repo: did not match any remote repo URL -- use --prune to remove it"
        );

        let event = exec.execute(&action, &opts(true, false));
        assert_eq!(event.kind, EventKind::Ignored);
        assert!(event.message.starts_with("would not remove without --prune"));
        assert!(path.exists());
    }

    #[test]
    fn remove_with_prune_deletes_directory() {
        let tmp = TempDir::new().unwrap();
        let exec = Executor::new(FakeBackend::default());
        let path = repo_dir(tmp.path(), "extra");
        fs::write(path.join("file.txt"), "data").unwrap();

        let event = exec.execute(
            &Action::Remove {
                path: path.clone(),
                reason: "r".into(),
            },
            &opts(false, true),
        );
        assert_eq!(event.kind, EventKind::Removed);
        assert_eq!(event.message, "removed");
        assert!(!path.exists());
    }

    #[test]
    fn display_path_is_relative_below_base() {
        let base = Path::new("/sync");
        assert_eq!(display_path(Path::new("/sync/org/a"), Some(base)), "org/a");
        assert_eq!(display_path(Path::new("/elsewhere/a"), Some(base)), "/elsewhere/a");
        assert_eq!(display_path(Path::new("/sync"), Some(base)), "/sync");
        assert_eq!(display_path(Path::new("/sync/x"), None), "/sync/x");
    }
}
