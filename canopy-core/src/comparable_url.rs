//! Comparable repository URLs.
//!
//! A comparable URL is `host/path` with the scheme, credentials, port and any
//! trailing `.git` removed, so that `https://host/org/repo.git`,
//! `ssh://git@host/org/repo` and `git@host:org/repo` all compare equal.
//! Local paths and `file://` URLs have no host and reduce to their path.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::UrlError;

/// Canonical `host/path` key for a git repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComparableUrl(String);

impl ComparableUrl {
    /// Normalise any URL form git accepts for a remote.
    pub fn parse(raw: &str) -> Result<Self, UrlError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(UrlError::Empty);
        }

        let (host, path) = if raw.contains("://") {
            let parsed = Url::parse(raw).map_err(|e| UrlError::Invalid {
                url: raw.to_string(),
                reason: e.to_string(),
            })?;
            let host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();
            (host, parsed.path().to_string())
        } else if let Some((host, path)) = split_scp_like(raw) {
            (host.to_ascii_lowercase(), path.to_string())
        } else {
            (String::new(), raw.to_string())
        };

        let segments = clean_segments(&path);
        if host.is_empty() && segments.is_empty() {
            return Err(UrlError::Invalid {
                url: raw.to_string(),
                reason: "no host or path".to_string(),
            });
        }

        let mut joined = host;
        for segment in segments {
            if !joined.is_empty() {
                joined.push('/');
            }
            joined.push_str(&segment);
        }
        Ok(Self(joined))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComparableUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// `[user@]host:path`, the scp-like syntax git accepts for ssh remotes.
///
/// Only recognised when no `/` precedes the first `:`.
fn split_scp_like(raw: &str) -> Option<(&str, &str)> {
    let colon = raw.find(':')?;
    if raw[..colon].contains('/') {
        return None;
    }
    let user_host = &raw[..colon];
    let host = user_host.rsplit('@').next().unwrap_or(user_host);
    if host.is_empty() {
        return None;
    }
    Some((host, &raw[colon + 1..]))
}

/// Split a path into clean segments and drop a trailing `.git`.
fn clean_segments(path: &str) -> Vec<String> {
    let mut segments: Vec<String> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other.to_string()),
        }
    }
    if let Some(last) = segments.last_mut() {
        if let Some(stripped) = last.strip_suffix(".git") {
            *last = stripped.to_string();
        }
        if last.is_empty() {
            segments.pop();
        }
    }
    segments
}
