//! GitHub REST v3 client over `ureq`.

use serde::de::DeserializeOwned;

use crate::error::GitHubError;
use crate::types::{Account, Repo};
use crate::RepoHost;

const USER_AGENT: &str = concat!("canopy/", env!("CARGO_PKG_VERSION"));

/// REST API root for `server`.
///
/// An enterprise server may carry its own scheme (`http://ghe.internal:8080`);
/// a bare host name means https.
pub fn api_root(server: &str) -> String {
    let server = server.trim_end_matches('/');
    if server == "github.com" {
        "https://api.github.com".to_string()
    } else if server.contains("://") {
        format!("{server}/api/v3")
    } else {
        format!("https://{server}/api/v3")
    }
}

/// Authenticated client for one server.
pub struct GitHubClient {
    agent: ureq::Agent,
    root: String,
    token: String,
}

impl GitHubClient {
    pub fn new(server: &str, token: impl Into<String>) -> Self {
        Self::with_api_root(api_root(server), token)
    }

    /// Client against an explicit API root, e.g. a local test server.
    pub fn with_api_root(root: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().user_agent(USER_AGENT).build(),
            root: root.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn get(&self, url: &str) -> Result<ureq::Response, GitHubError> {
        tracing::debug!(url, "GET");
        let result = self
            .agent
            .get(url)
            .set("Authorization", &format!("token {}", self.token))
            .set("Accept", "application/vnd.github.v3+json")
            .call();
        match result {
            Ok(resp) if resp.status() == 200 => Ok(resp),
            Ok(resp) => Err(GitHubError::Status {
                status: resp.status(),
                url: url.to_string(),
            }),
            Err(ureq::Error::Status(status, _)) => Err(GitHubError::Status {
                status,
                url: url.to_string(),
            }),
            Err(ureq::Error::Transport(t)) => Err(GitHubError::Transport {
                url: url.to_string(),
                source: Box::new(t),
            }),
        }
    }

    fn decode<T: DeserializeOwned>(resp: ureq::Response, url: &str) -> Result<T, GitHubError> {
        resp.into_json().map_err(|source| GitHubError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

impl RepoHost for GitHubClient {
    fn list_repos(&self, account: &Account) -> Result<Vec<Repo>, GitHubError> {
        let segment = match account.kind() {
            canopy_core::AccountKind::User => "users",
            canopy_core::AccountKind::Organization => "orgs",
        };
        let mut next = Some(format!(
            "{}/{segment}/{}/repos?type=all&per_page=100&sort=full_name",
            self.root, account.login
        ));

        let mut results = Vec::new();
        while let Some(url) = next.take() {
            let resp = self.get(&url)?;
            next = resp.header("Link").and_then(|h| rel_from_link_header(h, "next"));
            let page: Vec<Repo> = Self::decode(resp, &url)?;
            results.extend(page);
        }
        tracing::debug!(account = %account.login, count = results.len(), "listed repositories");
        Ok(results)
    }

    fn get_account(&self, name: &str) -> Result<Account, GitHubError> {
        let url = format!("{}/users/{name}", self.root);
        match self.get(&url) {
            Ok(resp) => Self::decode(resp, &url),
            Err(GitHubError::Status { status: 404, .. }) => {
                Err(GitHubError::AccountNotFound(name.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    fn get_repo(&self, full_name: &str) -> Result<Repo, GitHubError> {
        let url = format!("{}/repos/{full_name}", self.root);
        let resp = self.get(&url)?;
        Self::decode(resp, &url)
    }
}

/// URL for `rel="<rel>"` in an RFC 8288 `Link` header.
pub(crate) fn rel_from_link_header(header: &str, rel: &str) -> Option<String> {
    let wanted = format!("rel=\"{rel}\"");
    header.split(',').find_map(|link| {
        let mut parts = link.split(';').map(str::trim);
        let target = parts.next()?;
        parts
            .any(|p| p == wanted)
            .then(|| target.trim_matches(|c| c == '<' || c == '>').to_string())
    })
}
