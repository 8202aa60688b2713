//! Wire types for the REST v3 repository and account endpoints.

use canopy_core::AccountKind;
use serde::{Deserialize, Serialize};

/// A repository as returned by `/repos/{owner}/{repo}` and the listing endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repo {
    pub name: String,
    pub full_name: String,
    pub owner: Account,
    pub clone_url: String,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub default_branch: String,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub is_template: bool,
    /// GitHub reports `null` when it could not detect a language.
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub topics: Vec<String>,
}

/// Owner of a repository: `type` is `"User"` or `"Organization"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub login: String,
    #[serde(rename = "type")]
    pub account_type: String,
}

impl Account {
    pub fn new(login: impl Into<String>, kind: AccountKind) -> Self {
        let account_type = match kind {
            AccountKind::Organization => "Organization",
            AccountKind::User => "User",
        };
        Self {
            login: login.into(),
            account_type: account_type.to_string(),
        }
    }

    /// Anything other than `"User"` is listed through the `/orgs` endpoint.
    pub fn kind(&self) -> AccountKind {
        if self.account_type == "User" {
            AccountKind::User
        } else {
            AccountKind::Organization
        }
    }
}
