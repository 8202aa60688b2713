//! Error types for canopy-github.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GitHubError {
    /// The server answered with a status other than 200.
    #[error("bad status code {status} from {url}")]
    Status { status: u16, url: String },

    #[error("failed to find account {0:?}")]
    AccountNotFound(String),

    /// Connection, TLS or DNS failure before any response arrived.
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: Box<ureq::Transport>,
    },

    /// The response body was not the JSON we expected.
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: std::io::Error,
    },
}
