// src/github/error.rs
// =============================================================================
// Error type for everything that talks to the GitHub REST API.
//
// The variants mirror how callers react to a fault:
// - QuotaExceeded: wait on the rate gate, then retry the same call
// - ReferenceNotFound: the branch/tag does not exist, treat as empty
// - everything else: a real failure the caller reports
// =============================================================================

use thiserror::Error;

/// Message fragment GitHub returns when a `ref` query names a missing branch.
pub const REF_NOT_FOUND_MESSAGE: &str = "No commit found for the ref";

#[derive(Debug, Error)]
pub enum GithubError {
    /// The API refused the call because the hourly quota is spent
    #[error("GitHub API rate limit exceeded")]
    QuotaExceeded,

    /// The requested branch or tag does not exist in this repository
    #[error("reference not found: {0}")]
    ReferenceNotFound(String),

    /// The rate gate polled `polls` times without the quota recovering
    #[error("gave up waiting for GitHub quota after {polls} poll(s)")]
    QuotaWaitExhausted { polls: u32 },

    /// The quota check made while waiting failed itself
    #[error("could not check GitHub quota: {0}")]
    QuotaCheck(Box<GithubError>),

    /// Any other non-success answer from the API
    #[error("GitHub API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response body from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        source: serde_json::Error,
    },

    #[error("access token is not a valid HTTP header value")]
    InvalidToken,

    #[error("invalid API URL: {0}")]
    Url(#[from] url::ParseError),
}

impl GithubError {
    /// True for faults that go away once the quota resets
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, GithubError::QuotaExceeded)
    }

    /// Faults of the rate gate itself. Scanning cannot go on without quota,
    /// so these abort the run instead of degrading to an empty listing.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            GithubError::QuotaWaitExhausted { .. } | GithubError::QuotaCheck(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, GithubError>;
