//! Working-tree status from `git status --porcelain=v2`.

use serde::Serialize;

/// Summary flags for one working copy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkTreeStatus {
    /// `branch.head` header: a branch name, or `(detached)`.
    pub branch_head: String,
    pub changed_or_renamed: bool,
    pub unmerged: bool,
    pub untracked: bool,
    pub ignored: bool,
}

impl WorkTreeStatus {
    /// Tracked changes or conflicts are present.
    pub fn is_dirty(&self) -> bool {
        self.changed_or_renamed || self.unmerged
    }
}

/// Parse NUL-separated porcelain v2 output (`--null --branch --ignored`).
pub(crate) fn parse_porcelain_v2(output: &str) -> WorkTreeStatus {
    let mut status = WorkTreeStatus::default();
    let mut records = output.split('\0').filter(|r| !r.is_empty());
    while let Some(record) = records.next() {
        match record.as_bytes()[0] {
            b'#' => {
                let mut parts = record.split(' ');
                if parts.nth(1) == Some("branch.head") {
                    status.branch_head = parts.next().unwrap_or_default().to_string();
                }
            }
            b'1' => status.changed_or_renamed = true,
            // Renames carry their original path as the next record.
            b'2' => {
                status.changed_or_renamed = true;
                records.next();
            }
            b'u' => status.unmerged = true,
            b'?' => status.untracked = true,
            b'!' => status.ignored = true,
            _ => {}
        }
    }
    status
}
