// src/catalog/builder.rs
// =============================================================================
// Builds the full catalog for one version and writes it to the store.
//
// For each configured account, in order:
// 1. wait until the API quota is healthy
// 2. list every repository of the account
// 3. skip the localization repositories ("l10n-*") except l10n-france
// 4. scan the rest at the version's branch and keep those with modules
//
// A build always replaces the previous document of that version.
// =============================================================================

use super::store::{normalize_version, CatalogStore};
use super::{AccountCatalog, Catalog};
use crate::scan::RepositoryScanner;
use anyhow::{Context, Result};

/// Accounts scanned when none are configured
pub const DEFAULT_ACCOUNTS: [&str; 2] = ["OCA", "myrrkel"];

/// Versions rebuilt by `build_all`
pub const DEFAULT_VERSIONS: [&str; 5] = ["10.0", "11.0", "12.0", "13.0", "14.0"];

const LOCALIZATION_PREFIX: &str = "l10n";
const LOCALIZATION_KEPT: &str = "l10n-france";

/// True for repositories the builder never scans
pub fn is_excluded_repository(name: &str) -> bool {
    name.starts_with(LOCALIZATION_PREFIX) && name != LOCALIZATION_KEPT
}

#[derive(Debug)]
pub struct CatalogBuilder {
    scanner: RepositoryScanner,
    store: CatalogStore,
    accounts: Vec<String>,
}

impl CatalogBuilder {
    pub fn new(scanner: RepositoryScanner, store: CatalogStore, accounts: Vec<String>) -> Self {
        Self {
            scanner,
            store,
            accounts,
        }
    }

    /// Scans every account at `version` and saves the resulting catalog
    pub async fn build(&self, version: &str) -> Result<Catalog> {
        tracing::info!(version, accounts = ?self.accounts, "building catalog");
        let reader = self.scanner.reader();
        let mut catalog = Catalog::new();

        for account in &self.accounts {
            reader
                .gate()
                .await_quota()
                .await
                .context("waiting for GitHub quota")?;

            let remote_repos = reader
                .account_repositories(account)
                .await
                .with_context(|| format!("listing repositories of '{account}'"))?;

            let mut repositories = AccountCatalog::default();
            for repo in &remote_repos {
                if is_excluded_repository(&repo.name) {
                    tracing::debug!(repository = %repo.name, "skipping localization repository");
                    continue;
                }

                let record = self
                    .scanner
                    .scan(repo, version)
                    .await
                    .with_context(|| format!("scanning '{}'", repo.full_name))?;
                if let Some(record) = record {
                    repositories.repositories.insert(repo.name.clone(), record);
                }
            }

            tracing::info!(
                account = %account,
                scanned = remote_repos.len(),
                with_modules = repositories.repositories.len(),
                "account done"
            );
            catalog.insert(account.clone(), repositories);
        }

        let path = self
            .store
            .save_catalog(version, &catalog)
            .with_context(|| format!("saving catalog for version {}", normalize_version(version)))?;
        tracing::info!(path = %path.display(), "catalog written");

        Ok(catalog)
    }

    /// Rebuilds the catalog of every default version, one after the other
    pub async fn build_all(&self) -> Result<()> {
        self.build_versions(DEFAULT_VERSIONS.iter().copied()).await
    }

    pub async fn build_versions<'a>(&self, versions: impl IntoIterator<Item = &'a str>) -> Result<()> {
        for version in versions {
            self.build(version).await?;
        }
        Ok(())
    }
}
