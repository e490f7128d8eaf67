// src/scan/repository.rs
// =============================================================================
// Scans one repository at one reference for modules.
//
// Strategy:
// - list the top-level entries, keep directories other than `setup`
// - extract a module from each directory, a few at a time
// - only a repository with at least one module produces a record
// =============================================================================

use super::module::extract_module;
use super::reader::RemoteReader;
use crate::catalog::RepositoryRecord;
use crate::github::{RemoteRepository, Result};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::BTreeMap;

/// Top-level directory that never holds a module (setuptools wrappers)
pub const RESERVED_DIRECTORY: &str = "setup";

/// How many module directories of one repository are inspected at once
pub const DEFAULT_MODULE_CONCURRENCY: usize = 8;

#[derive(Debug, Clone)]
pub struct RepositoryScanner {
    reader: RemoteReader,
    concurrency: usize,
}

impl RepositoryScanner {
    pub fn new(reader: RemoteReader) -> Self {
        Self {
            reader,
            concurrency: DEFAULT_MODULE_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn reader(&self) -> &RemoteReader {
        &self.reader
    }

    /// Builds the record of `repo` at `reference`, or None when it holds no module
    pub async fn scan(&self, repo: &RemoteRepository, reference: &str) -> Result<Option<RepositoryRecord>> {
        let entries = match self.reader.list_path(&repo.full_name, ".", reference).await {
            Ok(entries) => entries,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::warn!(repository = %repo.full_name, error = %e, "could not list repository");
                Vec::new()
            }
        };

        let dirs: Vec<_> = entries
            .into_iter()
            .filter(|e| e.is_dir() && e.name != RESERVED_DIRECTORY)
            .collect();
        if dirs.is_empty() {
            return Ok(None);
        }

        let full_name = repo.full_name.as_str();
        let reader = &self.reader;

        // Results come back in completion order; keying by directory name
        // makes that order irrelevant.
        let modules: BTreeMap<_, _> = stream::iter(dirs.iter())
            .map(|dir| async move {
                extract_module(reader, full_name, reference, dir)
                    .await
                    .map(|module| module.map(|m| (m.name.clone(), m)))
            })
            .buffer_unordered(self.concurrency)
            .try_filter_map(|module| async move { Ok(module) })
            .try_collect()
            .await?;

        if modules.is_empty() {
            return Ok(None);
        }

        let description = repo.description.clone().unwrap_or_default();
        tracing::info!(
            "\"{}\";\"{}\";\"{}\";\"{}\"",
            repo.name,
            description,
            repo.html_url,
            repo.default_branch
        );

        Ok(Some(RepositoryRecord {
            name: repo.name.clone(),
            description,
            html_url: repo.html_url.clone(),
            default_branch: repo.default_branch.clone(),
            modules,
        }))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::github::{GithubClient, RateGate};
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Mounts a generous quota and returns a reader against `server`
    pub(crate) async fn reader_for(server: &MockServer) -> RemoteReader {
        Mock::given(method("GET"))
            .and(path("/rate_limit"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "resources": { "core": { "remaining": 5000 } }
            })))
            .mount(server)
            .await;

        let client = GithubClient::new(&server.uri(), None).unwrap();
        let gate = RateGate::new(client.clone()).with_interval(std::time::Duration::from_millis(5));
        RemoteReader::new(client, Arc::new(gate))
    }

    pub(crate) async fn mount_listing(server: &MockServer, api_path: &str, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(api_path))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    pub(crate) async fn mount_raw(server: &MockServer, raw_path: &str, text: &str) {
        Mock::given(method("GET"))
            .and(path(raw_path))
            .respond_with(ResponseTemplate::new(200).set_body_string(text))
            .mount(server)
            .await;
    }

    pub(crate) fn remote_repo(account: &str, name: &str) -> RemoteRepository {
        RemoteRepository {
            name: name.to_string(),
            full_name: format!("{account}/{name}"),
            description: Some(format!("{name} addons")),
            html_url: format!("https://github.com/{account}/{name}"),
            default_branch: "14.0".to_string(),
        }
    }

    /// A repository with one real module, one broken manifest, one plain
    /// directory, a setup directory and a file at the top level.
    pub(crate) async fn mount_web_repository(server: &MockServer, account: &str) {
        let base = format!("/repos/{account}/web/contents");
        let uri = server.uri();

        mount_listing(
            server,
            &base,
            serde_json::json!([
                { "name": "setup", "type": "dir" },
                { "name": "web_widget", "type": "dir" },
                { "name": "web_broken", "type": "dir" },
                { "name": "docs", "type": "dir" },
                { "name": "README.md", "type": "file", "download_url": format!("{uri}/raw/README.md") }
            ]),
        )
        .await;
        mount_listing(
            server,
            &format!("{base}/web_widget"),
            serde_json::json!([
                { "name": "__init__.py", "type": "file", "download_url": format!("{uri}/raw/init") },
                { "name": "__manifest__.py", "type": "file", "download_url": format!("{uri}/raw/{account}/web_widget") }
            ]),
        )
        .await;
        mount_listing(
            server,
            &format!("{base}/web_broken"),
            serde_json::json!([
                { "name": "__manifest__.py", "type": "file", "download_url": format!("{uri}/raw/{account}/web_broken") }
            ]),
        )
        .await;
        mount_listing(
            server,
            &format!("{base}/docs"),
            serde_json::json!([
                { "name": "index.rst", "type": "file", "download_url": format!("{uri}/raw/index") }
            ]),
        )
        .await;

        mount_raw(
            server,
            &format!("/raw/{account}/web_widget"),
            "# Copyright\n{\n    'name': 'Web Widget',\n    'summary': 'A widget',\n    'version': '14.0.1.0.0',\n    'author': 'OCA',\n    'category': 'Web',\n    'depends': ['web'],\n}\n",
        )
        .await;
        mount_raw(
            server,
            &format!("/raw/{account}/web_broken"),
            "{'name': 'Broken', 'data': get_files()}",
        )
        .await;
    }

    #[tokio::test]
    async fn test_scan_collects_only_real_modules() {
        let server = MockServer::start().await;
        let reader = reader_for(&server).await;
        mount_web_repository(&server, "OCA").await;

        let scanner = RepositoryScanner::new(reader);
        let record = scanner
            .scan(&remote_repo("OCA", "web"), "14.0")
            .await
            .unwrap()
            .expect("web holds a module");

        assert_eq!(record.name, "web");
        assert_eq!(record.description, "web addons");
        assert_eq!(record.html_url, "https://github.com/OCA/web");
        assert_eq!(record.modules.len(), 1);

        let module = &record.modules["web_widget"];
        assert_eq!(module.display_name, "Web Widget");
        assert_eq!(module.summary, "A widget");
        assert_eq!(module.version, "14.0.1.0.0");
        assert_eq!(module.author, "OCA");
        assert_eq!(module.category, "Web");

        // the reserved directory is never listed
        let requests = server.received_requests().await.unwrap();
        assert!(requests
            .iter()
            .all(|r| r.url.path() != "/repos/OCA/web/contents/setup"));
    }

    #[tokio::test]
    async fn test_scan_without_modules_produces_nothing() {
        let server = MockServer::start().await;
        let reader = reader_for(&server).await;

        mount_listing(
            &server,
            "/repos/OCA/docs/contents",
            serde_json::json!([{ "name": "guide", "type": "dir" }]),
        )
        .await;
        mount_listing(
            &server,
            "/repos/OCA/docs/contents/guide",
            serde_json::json!([{ "name": "index.md", "type": "file", "download_url": "http://unused" }]),
        )
        .await;

        let scanner = RepositoryScanner::new(reader).with_concurrency(1);
        assert_eq!(scanner.scan(&remote_repo("OCA", "docs"), "14.0").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_scan_only_setup_or_files_returns_early() {
        let server = MockServer::start().await;
        let reader = reader_for(&server).await;

        mount_listing(
            &server,
            "/repos/OCA/tools/contents",
            serde_json::json!([
                { "name": "setup", "type": "dir" },
                { "name": "README.md", "type": "file", "download_url": "http://unused" }
            ]),
        )
        .await;

        let scanner = RepositoryScanner::new(reader);
        assert_eq!(scanner.scan(&remote_repo("OCA", "tools"), "14.0").await.unwrap(), None);

        let requests = server.received_requests().await.unwrap();
        assert_eq!(
            requests
                .iter()
                .filter(|r| r.url.path().starts_with("/repos/"))
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_scan_missing_branch_produces_nothing() {
        let server = MockServer::start().await;
        let reader = reader_for(&server).await;

        Mock::given(method("GET"))
            .and(path("/repos/OCA/web/contents"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "message": "No commit found for the ref 10.0"
            })))
            .mount(&server)
            .await;

        let scanner = RepositoryScanner::new(reader);
        assert_eq!(scanner.scan(&remote_repo("OCA", "web"), "10.0").await.unwrap(), None);
    }
}
