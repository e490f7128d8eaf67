// src/mirror/mod.rs
// =============================================================================
// Keeps local clones of the selected repositories.
//
// Layout on disk:
//
//     github_addons/
//         OCA/
//             web/          <- git clone, checked out to the version
//         myrrkel/
//             ...
//
// A repository is cloned only when its directory is missing, and checked
// out on every pass. Git failures are collected in the report instead of
// stopping the pass.
// =============================================================================

mod git;

pub use git::{GitRunner, SystemGit};

use crate::catalog::{repository_url, Catalog, SelectionEntry};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_MIRROR_ROOT: &str = "github_addons";

#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("error while {action} '{}': {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("git {operation} in '{}' failed ({status}): {stderr}", path.display())]
    Git {
        operation: &'static str,
        path: PathBuf,
        status: String,
        stderr: String,
    },

    #[error("cannot derive a local directory for '{0}'")]
    InvalidTarget(String),
}

/// What one mirror pass did
#[derive(Debug, Default)]
pub struct MirrorReport {
    /// Local repositories present after the pass, in selection order
    pub paths: Vec<PathBuf>,
    /// Entries skipped because no clone URL could be found
    pub skipped: Vec<SelectionEntry>,
    pub failures: Vec<MirrorError>,
}

impl MirrorReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug)]
pub struct MirrorManager<G> {
    root: PathBuf,
    git: G,
}

impl<G: GitRunner> MirrorManager<G> {
    pub fn new(root: impl Into<PathBuf>, git: G) -> Self {
        Self {
            root: root.into(),
            git,
        }
    }

    #[cfg(test)]
    pub fn git(&self) -> &G {
        &self.git
    }

    /// Clones what is missing and checks every selected repository out to `version`
    pub async fn mirror(
        &self,
        version: &str,
        selection: &[SelectionEntry],
        catalog: &Catalog,
    ) -> Result<MirrorReport, MirrorError> {
        create_dir(&self.root)?;
        let mut report = MirrorReport::default();

        for entry in selection {
            let url = entry
                .url
                .as_deref()
                .filter(|url| !url.is_empty())
                .or_else(|| repository_url(catalog, &entry.github_user, &entry.name));

            let Some(url) = url else {
                tracing::debug!(account = %entry.github_user, repository = %entry.name, "no clone URL, skipping");
                report.skipped.push(entry.clone());
                continue;
            };

            if let Err(e) = self.mirror_one(&entry.github_user, url, version, &mut report).await {
                tracing::warn!(repository = %entry.name, error = %e, "mirror failed");
                report.failures.push(e);
            }
        }

        Ok(report)
    }

    async fn mirror_one(
        &self,
        account: &str,
        url: &str,
        version: &str,
        report: &mut MirrorReport,
    ) -> Result<(), MirrorError> {
        if !is_plain_component(account) {
            return Err(MirrorError::InvalidTarget(account.to_string()));
        }
        let repo_name = repo_dir_name(url).ok_or_else(|| MirrorError::InvalidTarget(url.to_string()))?;

        let account_dir = self.root.join(account);
        create_dir(&account_dir)?;

        let repo_dir = account_dir.join(&repo_name);
        if !repo_dir.is_dir() {
            self.git.clone_repo(url, &account_dir).await?;
        }

        if !repo_dir.is_dir() {
            return Ok(());
        }
        // The clone exists even when the checkout fails, so it stays on the path
        report.paths.push(repo_dir.clone());
        self.git.checkout(&repo_dir, version).await
    }
}

/// Local directory name for a clone URL: its last path segment without extension.
///
/// Example:
///   "https://github.com/OCA/web.git" -> "web"
pub fn repo_dir_name(url: &str) -> Option<String> {
    let last = url
        .trim_end_matches('/')
        .rsplit(['/', ':'])
        .next()
        .filter(|s| !s.is_empty())?;

    let stem = Path::new(last).file_stem()?.to_str()?;
    is_plain_component(stem).then(|| stem.to_string())
}

// A single, non-special path component
fn is_plain_component(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

fn create_dir(path: &Path) -> Result<(), MirrorError> {
    fs::create_dir_all(path).map_err(|source| MirrorError::Io {
        action: "creating directory",
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{AccountCatalog, RepositoryRecord};
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// Records commands; "clone" creates the target directory unless told to fail
    #[derive(Default)]
    struct RecordingGit {
        calls: Mutex<Vec<String>>,
        fail_clone: bool,
        fail_checkout: bool,
    }

    impl RecordingGit {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn count(&self, prefix: &str) -> usize {
            self.calls().iter().filter(|c| c.starts_with(prefix)).count()
        }
    }

    impl GitRunner for RecordingGit {
        async fn clone_repo(&self, url: &str, parent: &Path) -> Result<(), MirrorError> {
            self.calls.lock().unwrap().push(format!("clone {url}"));
            if self.fail_clone {
                return Err(MirrorError::Git {
                    operation: "clone",
                    path: parent.to_path_buf(),
                    status: "exit status: 128".to_string(),
                    stderr: "repository not found".to_string(),
                });
            }
            fs::create_dir_all(parent.join(repo_dir_name(url).unwrap())).unwrap();
            Ok(())
        }

        async fn checkout(&self, repo: &Path, version: &str) -> Result<(), MirrorError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("checkout {version} {}", repo.display()));
            if self.fail_checkout {
                return Err(MirrorError::Git {
                    operation: "checkout",
                    path: repo.to_path_buf(),
                    status: "exit status: 1".to_string(),
                    stderr: "pathspec did not match".to_string(),
                });
            }
            Ok(())
        }
    }

    fn catalog_with(account: &str, name: &str) -> Catalog {
        let record = RepositoryRecord {
            name: name.to_string(),
            description: String::new(),
            html_url: format!("https://github.com/{account}/{name}"),
            default_branch: "14.0".to_string(),
            modules: BTreeMap::new(),
        };
        let mut account_catalog = AccountCatalog::default();
        account_catalog.repositories.insert(name.to_string(), record);
        Catalog::from([(account.to_string(), account_catalog)])
    }

    fn entry(account: &str, name: &str, url: Option<&str>) -> SelectionEntry {
        SelectionEntry {
            github_user: account.to_string(),
            name: name.to_string(),
            url: url.map(str::to_string),
        }
    }

    #[test]
    fn test_repo_dir_name() {
        assert_eq!(repo_dir_name("https://github.com/OCA/web").as_deref(), Some("web"));
        assert_eq!(repo_dir_name("https://github.com/OCA/web.git").as_deref(), Some("web"));
        assert_eq!(repo_dir_name("https://github.com/OCA/web/").as_deref(), Some("web"));
        assert_eq!(repo_dir_name("git@github.com:me/tools.git").as_deref(), Some("tools"));
        assert_eq!(repo_dir_name(""), None);
    }

    #[tokio::test]
    async fn test_clone_is_idempotent_checkout_is_not() {
        let dir = tempfile::tempdir().unwrap();
        let manager = MirrorManager::new(dir.path().join("mirror"), RecordingGit::default());
        let catalog = catalog_with("OCA", "web");
        let selection = vec![entry("OCA", "web", None)];

        let first = manager.mirror("14", &selection, &catalog).await.unwrap();
        let second = manager.mirror("14", &selection, &catalog).await.unwrap();

        assert_eq!(manager.git.count("clone"), 1);
        assert_eq!(manager.git.count("checkout 14"), 2);

        let expected = dir.path().join("mirror").join("OCA").join("web");
        assert_eq!(first.paths, vec![expected.clone()]);
        assert_eq!(second.paths, vec![expected]);
        assert!(first.is_success() && second.is_success());
    }

    #[tokio::test]
    async fn test_entry_url_wins_over_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let manager = MirrorManager::new(dir.path(), RecordingGit::default());
        let catalog = catalog_with("OCA", "web");
        let selection = vec![entry("OCA", "web", Some("https://example.com/fork/web-fork.git"))];

        let report = manager.mirror("14", &selection, &catalog).await.unwrap();

        assert_eq!(
            manager.git.calls()[0],
            "clone https://example.com/fork/web-fork.git"
        );
        assert_eq!(report.paths, vec![dir.path().join("OCA").join("web-fork")]);
    }

    #[tokio::test]
    async fn test_unresolvable_entry_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("mirror");
        let manager = MirrorManager::new(&root, RecordingGit::default());
        let catalog = catalog_with("OCA", "web");
        let selection = vec![entry("someone", "unknown", None)];

        let report = manager.mirror("14", &selection, &catalog).await.unwrap();

        assert!(manager.git.calls().is_empty());
        assert!(report.paths.is_empty());
        assert_eq!(report.skipped, selection);
        assert!(report.is_success());
        assert!(!root.join("someone").exists());
    }

    #[tokio::test]
    async fn test_empty_selection_still_creates_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("mirror");
        let manager = MirrorManager::new(&root, RecordingGit::default());

        let report = manager.mirror("14", &[], &Catalog::new()).await.unwrap();

        assert!(root.is_dir());
        assert!(report.paths.is_empty());
        assert!(report.is_success());
        assert!(manager.git.calls().is_empty());
    }

    #[tokio::test]
    async fn test_clone_failure_is_reported_without_checkout() {
        let dir = tempfile::tempdir().unwrap();
        let git = RecordingGit {
            fail_clone: true,
            ..Default::default()
        };
        let manager = MirrorManager::new(dir.path(), git);
        let catalog = catalog_with("OCA", "web");
        let selection = vec![entry("OCA", "web", None), entry("OCA", "web", None)];

        let report = manager.mirror("14", &selection, &catalog).await.unwrap();

        assert_eq!(manager.git.count("clone"), 2);
        assert_eq!(manager.git.count("checkout"), 0);
        assert_eq!(report.failures.len(), 2);
        assert!(matches!(report.failures[0], MirrorError::Git { operation: "clone", .. }));
        assert!(report.paths.is_empty());
    }

    #[tokio::test]
    async fn test_checkout_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let git = RecordingGit {
            fail_checkout: true,
            ..Default::default()
        };
        let manager = MirrorManager::new(dir.path(), git);
        let catalog = catalog_with("OCA", "web");

        let report = manager
            .mirror("14", &[entry("OCA", "web", None)], &catalog)
            .await
            .unwrap();

        assert_eq!(report.failures.len(), 1);
        assert!(!report.is_success());
        assert_eq!(report.paths, vec![dir.path().join("OCA").join("web")]);
    }

    #[tokio::test]
    async fn test_account_with_path_separator_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let manager = MirrorManager::new(dir.path().join("mirror"), RecordingGit::default());
        let selection = vec![entry("../outside", "web", Some("https://github.com/x/web"))];

        let report = manager.mirror("14", &selection, &Catalog::new()).await.unwrap();

        assert!(matches!(report.failures[0], MirrorError::InvalidTarget(_)));
        assert!(manager.git.calls().is_empty());
    }
}
