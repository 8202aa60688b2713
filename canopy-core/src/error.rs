//! Error types for canopy-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::CONFIG_FILE_NAME;

/// Errors raised while locating, parsing, validating or writing the sync config.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No `canopy.sync.yaml` in the start directory or any of its parents.
    #[error("no sync config file ({CONFIG_FILE_NAME}) found in {start} or any parent directory")]
    NotFound { start: PathBuf },

    /// Underlying I/O failure, annotated with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML error without file context (string parse or serialization).
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load, with the file path.
    #[error("failed to parse sync config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The config decoded but is semantically wrong.
    #[error("invalid sync config: {0}")]
    Invalid(String),

    /// Refused to overwrite an existing config without `force`.
    #[error("{path} already exists -- use --force to overwrite it")]
    AlreadyExists { path: PathBuf },

    /// A scope argument points outside the sync root.
    #[error("{path} points outside sync root {root}")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    /// A scope argument cannot be mapped back to a configured account/repo.
    #[error("cannot map {path} to a configured org or user: {reason}")]
    UnmappedPath { path: PathBuf, reason: String },
}

/// Errors raised while normalising a git remote URL.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("empty repository URL")]
    Empty,

    #[error("invalid repository URL {url:?}: {reason}")]
    Invalid { url: String, reason: String },
}

/// Convenience constructor for [`ConfigError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
