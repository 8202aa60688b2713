//! Credential lookup through `git credential fill`.

use std::path::Path;

use crate::error::GitError;
use crate::repo::run_git;

/// A credential as reported by the configured git credential helpers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credential {
    pub protocol: String,
    pub host: String,
    pub username: String,
    pub password: String,
}

/// Ask git for the stored credential of `protocol://host`.
///
/// git may prompt on the terminal when no helper has a match.
pub fn fill_credential(protocol: &str, host: &str) -> Result<Credential, GitError> {
    let input = format!("protocol={protocol}\nhost={host}\n\n");
    let output = run_git(Path::new("."), &["credential", "fill"], Some(&input))?;
    Ok(parse_credential(&output))
}

fn parse_credential(output: &str) -> Credential {
    let mut cred = Credential::default();
    for line in output.lines().filter(|l| !l.is_empty()) {
        let (key, value) = line.split_once('=').unwrap_or((line, ""));
        match key {
            "protocol" => cred.protocol = value.to_string(),
            "host" => cred.host = value.to_string(),
            "username" => cred.username = value.to_string(),
            "password" => cred.password = value.to_string(),
            other => tracing::warn!(key = other, "unexpected credential key"),
        }
    }
    cred
}
