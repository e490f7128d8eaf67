// src/scan/reader.rs
// =============================================================================
// Remote reads as the scanner sees them: every call goes through the rate
// gate, quota exhaustion is waited out and retried, and a missing branch is
// just an empty directory.
//
// Other failures come back as Err so the caller decides how loud to be;
// the scanners log them and carry on as if the listing were empty.
// =============================================================================

use crate::github::{DirEntry, GithubClient, GithubError, RateGate, RemoteRepository, Result};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct RemoteReader {
    client: GithubClient,
    gate: Arc<RateGate>,
}

impl RemoteReader {
    pub fn new(client: GithubClient, gate: Arc<RateGate>) -> Self {
        Self { client, gate }
    }

    pub fn gate(&self) -> &RateGate {
        &self.gate
    }

    /// Lists `path` of `full_name` at `reference`; a missing reference is `Ok(vec![])`
    pub async fn list_path(
        &self,
        full_name: &str,
        path: &str,
        reference: &str,
    ) -> Result<Vec<DirEntry>> {
        let result = self
            .gate
            .retry(|| self.client.list_path(full_name, path, reference))
            .await;

        match result {
            Err(GithubError::ReferenceNotFound(_)) => {
                tracing::trace!(full_name, reference, "reference not found");
                Ok(Vec::new())
            }
            other => other,
        }
    }

    /// Raw text of a file entry
    pub async fn fetch_text(&self, download_url: &str) -> Result<String> {
        self.gate.retry(|| self.client.fetch_raw(download_url)).await
    }

    /// Every repository of `account`, following pages until a short one
    pub async fn account_repositories(&self, account: &str) -> Result<Vec<RemoteRepository>> {
        let page_size = self.client.page_size();
        let mut repositories = Vec::new();
        let mut page = 1;

        loop {
            let batch = self
                .gate
                .retry(|| self.client.account_repositories_page(account, page))
                .await?;
            let len = batch.len();
            repositories.extend(batch);

            if len < page_size {
                break;
            }
            page += 1;
        }

        tracing::debug!(account, count = repositories.len(), "listed repositories");
        Ok(repositories)
    }
}
