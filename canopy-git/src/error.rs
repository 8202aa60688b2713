//! Error types for canopy-git.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from git operations and repository scanning.
#[derive(Debug, Error)]
pub enum GitError {
    /// The `git` executable could not be started.
    #[error("failed to run `git {args}`: {source}")]
    Spawn {
        args: String,
        #[source]
        source: std::io::Error,
    },

    /// git ran and exited unsuccessfully.
    #[error("`git {args}` failed in {dir}: {output}")]
    Command {
        dir: PathBuf,
        args: String,
        output: String,
    },

    /// git output did not have the expected shape.
    #[error("unexpected output from `git {args}`: {line:?}")]
    Parse { args: String, line: String },

    /// The directory is not the root of a git working copy.
    #[error("{path} is not a git repository root")]
    NotARepo { path: PathBuf },

    /// I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory walk failure while scanning for repositories.
    #[error("failed to scan for repositories: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Convenience constructor for [`GitError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> GitError {
    GitError::Io {
        path: path.into(),
        source,
    }
}
