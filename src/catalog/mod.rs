// src/catalog/mod.rs
// =============================================================================
// The catalog of modules discovered on GitHub, and the documents it is
// persisted as.
//
// Shape of a catalog document (one per version):
//
//     { "<account>": { "repositories": { "<repo>": RepositoryRecord } } }
//
// Every map is a BTreeMap so keys serialize in sorted order and saving the
// same catalog twice produces the same bytes.
// =============================================================================

mod builder;
mod store;

pub use builder::{CatalogBuilder, DEFAULT_ACCOUNTS};
pub use store::{normalize_version, CatalogStore, DocumentKind, DEFAULT_DATA_DIR};

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// One addon module, read from its manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRecord {
    /// Directory name, unique within its repository
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub category: String,
}

/// A repository holding at least one module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    pub html_url: String,
    #[serde(default)]
    pub default_branch: String,
    pub modules: BTreeMap<String, ModuleRecord>,
}

/// All repositories of one account that hold modules
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountCatalog {
    #[serde(default)]
    pub repositories: BTreeMap<String, RepositoryRecord>,
}

/// Account name -> its repositories, for a single version
pub type Catalog = BTreeMap<String, AccountCatalog>;

/// A repository the user wants mirrored locally
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionEntry {
    pub github_user: String,
    pub name: String,
    /// Clone URL; when missing it is looked up in the catalog
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Looks up the web URL of `account/repository` in a catalog
pub fn repository_url<'a>(catalog: &'a Catalog, account: &str, repository: &str) -> Option<&'a str> {
    catalog
        .get(account)?
        .repositories
        .get(repository)
        .map(|repo| repo.html_url.as_str())
}

// Documents written by older tools store a missing description as null
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
