// src/github/mod.rs
// =============================================================================
// This module handles everything that talks to GitHub.
//
// - client:     typed calls to the REST API (repositories, contents, quota)
// - rate_limit: the process-wide gate that waits out quota exhaustion
// - error:      the GithubError taxonomy the callers branch on
// =============================================================================

mod client;
mod error;
mod rate_limit;

pub use client::{DirEntry, GithubClient, RemoteRepository, DEFAULT_API_URL};
pub use error::{GithubError, Result};
pub use rate_limit::{RateGate, DEFAULT_POLL_INTERVAL, DEFAULT_QUOTA_FLOOR};
