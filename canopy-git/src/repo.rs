//! Working-copy operations over the `git` CLI.
//!
//! Every call runs one `git` subprocess synchronously in the repository root.
//! No call carries a timeout: a hung remote stalls the calling thread.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use canopy_core::types::{BranchInfo, BranchSnapshot, RemoteUrls, Remotes};

use crate::error::{io_err, GitError};
use crate::scan::is_repo_root;
use crate::status::{parse_porcelain_v2, WorkTreeStatus};

/// `git branch --list` format: name, HEAD marker, upstream, track status.
const BRANCH_FORMAT: &str =
    "%(refname:short)\t%(HEAD)\t%(upstream:short)\t%(upstream:track,nobracket)";

// ---------------------------------------------------------------------------
// Collaborator traits
// ---------------------------------------------------------------------------

/// The operations the sync engine performs on one local working copy.
pub trait WorkingCopy {
    fn root(&self) -> &Path;

    /// Remote name -> fetch/push URLs.
    fn remotes(&self) -> Result<Remotes, GitError>;

    /// Local branches with upstream info, plus the checked-out branch.
    fn local_branches(&self) -> Result<BranchSnapshot, GitError>;

    /// Checked-out branch; `None` when HEAD is detached.
    fn current_branch(&self) -> Result<Option<String>, GitError>;

    /// `git fetch --prune --all`; `true` when anything changed.
    fn fetch_all_and_prune(&self) -> Result<bool, GitError>;

    /// Fast-forward the checked-out branch to its upstream.
    fn fast_forward_merge(&self) -> Result<(), GitError>;

    /// Point a branch that is not checked out at `start_point`.
    fn reset_branch(&self, branch: &str, start_point: &str) -> Result<(), GitError>;

    fn delete_branch(&self, branch: &str, force: bool) -> Result<(), GitError>;

    fn switch_to_existing_branch(&self, branch: &str) -> Result<(), GitError>;

    /// Create a local branch tracking `upstream` and check it out.
    fn switch_to_new_tracking_branch(&self, upstream: &str) -> Result<(), GitError>;
}

/// Opens existing working copies and clones new ones.
pub trait GitBackend: Send + Sync {
    type Repo: WorkingCopy;

    fn open(&self, root: &Path) -> Result<Self::Repo, GitError>;

    fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), GitError>;
}

// ---------------------------------------------------------------------------
// git CLI backend
// ---------------------------------------------------------------------------

/// [`GitBackend`] that shells out to `git`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitCli;

impl GitBackend for GitCli {
    type Repo = GitRepo;

    fn open(&self, root: &Path) -> Result<GitRepo, GitError> {
        GitRepo::open(root)
    }

    fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), GitError> {
        let dest_arg = dest.to_string_lossy();
        let cwd = dest
            .parent()
            .filter(|p| p.is_dir())
            .unwrap_or_else(|| Path::new("."));
        run_git(cwd, &["clone", "--", url, &dest_arg], None).map(|_| ())
    }
}

/// A working copy rooted at `root`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitRepo {
    root: PathBuf,
}

impl GitRepo {
    /// Open the working copy whose root is `root`.
    pub fn open(root: &Path) -> Result<Self, GitError> {
        if !is_repo_root(root) {
            return Err(GitError::NotARepo {
                path: root.to_path_buf(),
            });
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    fn git(&self, args: &[&str]) -> Result<String, GitError> {
        run_git(&self.root, args, None)
    }

    /// Working-tree flags and branch head from `git status --porcelain=v2`.
    pub fn status(&self) -> Result<WorkTreeStatus, GitError> {
        let out = self.git(&[
            "status",
            "--null",
            "--porcelain=v2",
            "--branch",
            "--ignored",
            "--untracked-files=normal",
        ])?;
        Ok(parse_porcelain_v2(&out))
    }
}

impl WorkingCopy for GitRepo {
    fn root(&self) -> &Path {
        &self.root
    }

    fn remotes(&self) -> Result<Remotes, GitError> {
        parse_remotes(&self.git(&["remote", "--verbose"])?)
    }

    fn local_branches(&self) -> Result<BranchSnapshot, GitError> {
        let format = format!("--format={BRANCH_FORMAT}");
        parse_branches(&self.git(&["branch", "--list", &format])?)
    }

    fn current_branch(&self) -> Result<Option<String>, GitError> {
        let out = self.git(&["branch", "--show-current"])?;
        let branch = out.trim();
        Ok((!branch.is_empty()).then(|| branch.to_string()))
    }

    fn fetch_all_and_prune(&self) -> Result<bool, GitError> {
        Ok(fetch_reported_changes(&self.git(&["fetch", "--prune", "--all"])?))
    }

    fn fast_forward_merge(&self) -> Result<(), GitError> {
        self.git(&["merge", "--ff-only"]).map(|_| ())
    }

    fn reset_branch(&self, branch: &str, start_point: &str) -> Result<(), GitError> {
        self.git(&["branch", "--force", branch, start_point]).map(|_| ())
    }

    fn delete_branch(&self, branch: &str, force: bool) -> Result<(), GitError> {
        let mut args = vec!["branch", "--delete"];
        if force {
            args.push("--force");
        }
        args.push(branch);
        self.git(&args).map(|_| ())
    }

    fn switch_to_existing_branch(&self, branch: &str) -> Result<(), GitError> {
        self.git(&["switch", "--no-guess", branch]).map(|_| ())
    }

    fn switch_to_new_tracking_branch(&self, upstream: &str) -> Result<(), GitError> {
        self.git(&["switch", "--track", upstream]).map(|_| ())
    }
}

// ---------------------------------------------------------------------------
// Process plumbing
// ---------------------------------------------------------------------------

/// Run `git <args>` in `dir` and return stdout followed by stderr.
pub(crate) fn run_git(dir: &Path, args: &[&str], stdin: Option<&str>) -> Result<String, GitError> {
    use std::io::Write;

    let joined = args.join(" ");
    tracing::debug!(dir = %dir.display(), args = %joined, "running git");

    let mut cmd = Command::new("git");
    cmd.args(args)
        .current_dir(dir)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if stdin.is_some() {
        cmd.stdin(Stdio::piped());
    } else {
        cmd.stdin(Stdio::null()).env("GIT_TERMINAL_PROMPT", "0");
    }

    let mut child = cmd.spawn().map_err(|source| GitError::Spawn {
        args: joined.clone(),
        source,
    })?;
    if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
        pipe.write_all(input.as_bytes())
            .map_err(|e| io_err(dir, e))?;
    }
    let output = child.wait_with_output().map_err(|e| io_err(dir, e))?;

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    if !output.status.success() {
        return Err(GitError::Command {
            dir: dir.to_path_buf(),
            args: joined,
            output: combined.trim().to_string(),
        });
    }
    Ok(combined)
}

// ---------------------------------------------------------------------------
// Output parsers
// ---------------------------------------------------------------------------

/// Parse `git remote --verbose`: `name<TAB>url (fetch|push)` per line.
pub fn parse_remotes(output: &str) -> Result<Remotes, GitError> {
    let mut remotes = Remotes::new();
    for line in output.lines().filter(|l| !l.trim().is_empty()) {
        let parse_err = || GitError::Parse {
            args: "remote --verbose".to_string(),
            line: line.to_string(),
        };
        let mut fields = line.split_whitespace();
        let (Some(name), Some(url), Some(kind)) = (fields.next(), fields.next(), fields.next())
        else {
            return Err(parse_err());
        };

        let entry: &mut RemoteUrls = remotes.entry(name.to_string()).or_default();
        match kind.trim_matches(|c| c == '(' || c == ')') {
            "fetch" => entry.fetch_url = url.to_string(),
            "push" => entry.push_url = url.to_string(),
            _ => return Err(parse_err()),
        }
    }
    Ok(remotes)
}

/// Parse `git branch --list` output produced with [`BRANCH_FORMAT`].
pub fn parse_branches(output: &str) -> Result<BranchSnapshot, GitError> {
    let mut snapshot = BranchSnapshot::default();
    for line in output.lines().filter(|l| !l.is_empty()) {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 4 {
            return Err(GitError::Parse {
                args: "branch --list".to_string(),
                line: line.to_string(),
            });
        }
        let name = fields[0].to_string();
        if fields[1] == "*" {
            snapshot.current = Some(name.clone());
        }
        snapshot
            .branches
            .insert(name, BranchInfo::new(fields[2], fields[3]));
    }
    Ok(snapshot)
}

/// `git fetch --all` prints `Fetching <remote>` for every remote it contacts;
/// any other non-blank line means refs were updated or pruned.
pub fn fetch_reported_changes(output: &str) -> bool {
    output
        .lines()
        .filter(|line| !line.is_empty())
        .any(|line| !line.starts_with("Fetching "))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
