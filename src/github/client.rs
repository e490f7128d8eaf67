// src/github/client.rs
// =============================================================================
// A small typed wrapper over the parts of the GitHub REST API we need:
// - GET /rate_limit                          remaining core quota
// - GET /users/{account}/repos               an account's repositories
// - GET /repos/{owner}/{repo}/contents/...   a directory listing at a ref
// - the raw `download_url` of a file         manifest text
//
// Every non-success response goes through `classify_failure`, which turns
// it into one of the GithubError variants the callers know how to handle.
// =============================================================================

use super::error::{GithubError, Result, REF_NOT_FOUND_MESSAGE};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Repositories requested per page when listing an account
const REPOS_PER_PAGE: usize = 100;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A repository as returned by the account listing endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteRepository {
    pub name: String,
    /// "owner/name", used to address the contents endpoint
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub html_url: String,
    #[serde(default)]
    pub default_branch: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    #[serde(other)]
    Other,
}

/// One item of a directory listing
#[derive(Debug, Clone, Deserialize)]
pub struct DirEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Where the raw file content can be fetched (files only)
    #[serde(default)]
    pub download_url: Option<String>,
}

impl DirEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

// The contents endpoint answers with an array for directories and a
// single object when the path points at a file.
#[derive(Deserialize)]
#[serde(untagged)]
enum ContentsResponse {
    Listing(Vec<DirEntry>),
    Single(DirEntry),
}

#[derive(Deserialize)]
struct RateLimitResponse {
    resources: RateLimitResources,
}

#[derive(Deserialize)]
struct RateLimitResources {
    core: RateLimitBucket,
}

#[derive(Deserialize)]
struct RateLimitBucket {
    remaining: u64,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Clone)]
pub struct GithubClient {
    http: Client,
    base_url: Url,
}

impl GithubClient {
    /// Creates a client for `api_url`, authenticating with `token` when given.
    ///
    /// For a higher rate limit, provide a personal access token.
    pub fn new(api_url: &str, token: Option<&str>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));

        if let Some(token) = token.filter(|t| !t.is_empty()) {
            let mut value = HeaderValue::from_str(&format!("token {token}"))
                .map_err(|_| GithubError::InvalidToken)?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http = Client::builder()
            .user_agent(concat!("github-modules/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: Url::parse(api_url.trim_end_matches('/'))?,
        })
    }

    /// Remaining calls in the core quota
    pub async fn rate_limit_remaining(&self) -> Result<u64> {
        let url = self.endpoint(&["rate_limit"])?;
        let body: RateLimitResponse = self.get_json(url).await?;
        Ok(body.resources.core.remaining)
    }

    /// One page (1-based) of an account's repositories
    pub async fn account_repositories_page(
        &self,
        account: &str,
        page: usize,
    ) -> Result<Vec<RemoteRepository>> {
        let mut url = self.endpoint(&["users", account, "repos"])?;
        url.query_pairs_mut()
            .append_pair("per_page", &REPOS_PER_PAGE.to_string())
            .append_pair("page", &page.to_string());
        self.get_json(url).await
    }

    /// Number of repositories a full page holds; a shorter page is the last one
    pub fn page_size(&self) -> usize {
        REPOS_PER_PAGE
    }

    /// Lists `path` inside `full_name` at `reference` (empty = default branch)
    pub async fn list_path(
        &self,
        full_name: &str,
        path: &str,
        reference: &str,
    ) -> Result<Vec<DirEntry>> {
        let mut segments = vec!["repos"];
        segments.extend(full_name.split('/').filter(|s| !s.is_empty()));
        segments.push("contents");
        segments.extend(path.split('/').filter(|s| !s.is_empty() && *s != "."));

        let mut url = self.endpoint(&segments)?;
        if !reference.is_empty() {
            url.query_pairs_mut().append_pair("ref", reference);
        }

        match self.get_json::<ContentsResponse>(url).await? {
            ContentsResponse::Listing(entries) => Ok(entries),
            ContentsResponse::Single(entry) => Ok(vec![entry]),
        }
    }

    /// Downloads the raw text behind a file entry's `download_url`
    pub async fn fetch_raw(&self, download_url: &str) -> Result<String> {
        let response = self.http.get(download_url).send().await?;
        if !response.status().is_success() {
            return Err(classify_failure(response).await);
        }
        Ok(response.text().await?)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            // path_segments_mut percent-encodes each segment for us
            let mut path = url
                .path_segments_mut()
                .map_err(|_| GithubError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        tracing::trace!(%url, "GET");
        let response = self.http.get(url.clone()).send().await?;

        if !response.status().is_success() {
            return Err(classify_failure(response).await);
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|source| GithubError::Decode {
            endpoint: url.path().to_string(),
            source,
        })
    }
}

/// Maps a failed response onto the error variants callers branch on
async fn classify_failure(response: Response) -> GithubError {
    let status = response.status();
    let quota_spent = response
        .headers()
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim() == "0")
        .unwrap_or(false);

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&text)
        .map(|body| body.message)
        .unwrap_or(text);

    classify(status, quota_spent, message)
}

fn classify(status: StatusCode, quota_spent: bool, message: String) -> GithubError {
    let limited = matches!(status, StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS);
    if limited && (quota_spent || message.to_lowercase().contains("rate limit")) {
        return GithubError::QuotaExceeded;
    }

    if message.contains(REF_NOT_FOUND_MESSAGE) {
        return GithubError::ReferenceNotFound(message);
    }

    GithubError::Api {
        status: status.as_u16(),
        message,
    }
}
