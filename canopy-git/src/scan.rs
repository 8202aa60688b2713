//! Local-state scanner: find working-copy roots below a directory.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::GitError;

/// `true` when `dir` contains a `.git` directory or gitfile.
pub fn is_repo_root(dir: &Path) -> bool {
    dir.join(".git").exists()
}

/// All working-copy roots at or below `root`, sorted by path.
///
/// A directory classified as a repository root is not descended into, so
/// nested checkouts inside a working copy are not reported separately.
pub fn find_repos(root: &Path) -> Result<Vec<PathBuf>, GitError> {
    if is_repo_root(root) {
        return Ok(vec![root.to_path_buf()]);
    }

    let mut repos = Vec::new();
    let mut walker = WalkDir::new(root).min_depth(1).follow_links(false).into_iter();
    while let Some(entry) = walker.next() {
        let entry = entry?;
        if !entry.file_type().is_dir() {
            continue;
        }
        if is_repo_root(entry.path()) {
            repos.push(entry.path().to_path_buf());
            walker.skip_current_dir();
        }
    }

    repos.sort();
    tracing::debug!(root = %root.display(), found = repos.len(), "scanned for repositories");
    Ok(repos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn make_repo(root: &Path, rel: &str) -> PathBuf {
        let dir = root.join(rel);
        fs::create_dir_all(dir.join(".git")).unwrap();
        dir
    }

    #[test]
    fn finds_nested_repos_sorted() {
        let tmp = TempDir::new().unwrap();
        let b = make_repo(tmp.path(), "acme/zeta");
        let a = make_repo(tmp.path(), "acme/alpha");
        let c = make_repo(tmp.path(), "other/deep/tool");
        fs::create_dir_all(tmp.path().join("acme/not-a-repo/src")).unwrap();

        let found = find_repos(tmp.path()).unwrap();
        assert_eq!(found, vec![a, b, c]);
    }

    #[test]
    fn does_not_descend_into_repos() {
        let tmp = TempDir::new().unwrap();
        let outer = make_repo(tmp.path(), "acme/outer");
        make_repo(tmp.path(), "acme/outer/vendor/inner");

        assert_eq!(find_repos(tmp.path()).unwrap(), vec![outer]);
    }

    #[test]
    fn root_that_is_a_repo_is_returned_alone() {
        let tmp = TempDir::new().unwrap();
        let root = make_repo(tmp.path(), "widgets");
        make_repo(tmp.path(), "widgets/sub");

        assert_eq!(find_repos(&root).unwrap(), vec![root.clone()]);
    }

    #[test]
    fn gitfile_counts_as_repo_root() {
        let tmp = TempDir::new().unwrap();
        let wt = tmp.path().join("worktree");
        fs::create_dir_all(&wt).unwrap();
        fs::write(wt.join(".git"), "gitdir: /elsewhere\n").unwrap();

        assert!(is_repo_root(&wt));
        assert_eq!(find_repos(tmp.path()).unwrap(), vec![wt]);
    }

    #[test]
    fn empty_tree_has_no_repos() {
        let tmp = TempDir::new().unwrap();
        assert!(find_repos(tmp.path()).unwrap().is_empty());
    }
}
