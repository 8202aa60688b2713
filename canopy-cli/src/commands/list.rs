//! `canopy list`: working-tree state of every local repository.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use canopy_core::config;
use canopy_git::{find_repos, GitRepo, WorkTreeStatus};
use canopy_sync::display_path;

/// Arguments for `canopy list`.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct RepoStatusJson {
    repo: String,
    #[serde(flatten)]
    status: WorkTreeStatus,
}

#[derive(Tabled)]
struct RepoTableRow {
    #[tabled(rename = "flags")]
    flags: String,
    #[tabled(rename = "repository")]
    repo: String,
    #[tabled(rename = "branch")]
    branch: String,
}

impl ListArgs {
    pub fn run(self) -> Result<()> {
        let cwd = std::env::current_dir().context("could not determine current directory")?;
        let root = scan_root(&cwd);

        let mut rows = Vec::new();
        for path in find_repos(&root).with_context(|| format!("failed to scan {}", root.display()))? {
            let status = GitRepo::open(&path)
                .and_then(|repo| repo.status())
                .with_context(|| format!("failed to read status of {}", path.display()))?;
            rows.push(RepoStatusJson {
                repo: display_path(&path, Some(cwd.as_path())),
                status,
            });
        }

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&rows).context("failed to serialize list JSON")?
            );
            return Ok(());
        }

        print_table(rows);
        Ok(())
    }
}

/// The sync root when one encloses `cwd`, else `cwd` itself.
fn scan_root(cwd: &Path) -> PathBuf {
    config::find_config_file(cwd)
        .ok()
        .and_then(|file| file.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| cwd.to_path_buf())
}

fn print_table(rows: Vec<RepoStatusJson>) {
    if rows.is_empty() {
        println!("No repositories found.");
        return;
    }

    let dirty = rows.iter().filter(|r| r.status.is_dirty()).count();
    let table_rows: Vec<RepoTableRow> = rows
        .into_iter()
        .map(|row| RepoTableRow {
            flags: flags(&row.status),
            repo: row.repo,
            branch: row.status.branch_head,
        })
        .collect();
    let total = table_rows.len();

    let mut table = Table::new(table_rows);
    table.with(Style::rounded());
    println!("{table}");
    println!(
        "Flags: {} changed  {} unmerged  {} untracked  {} ignored",
        "c".yellow().bold(),
        "U".red().bold(),
        "?".cyan(),
        "i".bright_black(),
    );
    println!("{total} repositories, {dirty} with uncommitted changes");
}

/// Four fixed columns, blank where the flag is unset.
fn flags(status: &WorkTreeStatus) -> String {
    let mut out = String::new();
    for (set, mark) in [
        (status.changed_or_renamed, "c".yellow().bold()),
        (status.unmerged, "U".red().bold()),
        (status.untracked, "?".cyan()),
        (status.ignored, "i".bright_black()),
    ] {
        if set {
            out.push_str(&mark.to_string());
        } else {
            out.push(' ');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_keep_their_columns() {
        colored::control::set_override(false);
        let status = WorkTreeStatus {
            branch_head: "main".into(),
            changed_or_renamed: true,
            untracked: true,
            ..Default::default()
        };
        assert_eq!(flags(&status), "c ? ");
        assert_eq!(flags(&WorkTreeStatus::default()), "    ");
    }

    #[test]
    fn scan_root_falls_back_to_cwd() {
        let dir = tempfile::TempDir::new().unwrap();
        assert_eq!(scan_root(dir.path()), dir.path());
    }

    #[test]
    fn scan_root_prefers_the_sync_root() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(config::CONFIG_FILE_NAME),
            "github:\n  server: github.com\n",
        )
        .unwrap();
        let nested = dir.path().join("acme");
        std::fs::create_dir_all(&nested).unwrap();
        assert_eq!(scan_root(&nested), dir.path());
    }
}
