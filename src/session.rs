// src/session.rs
// =============================================================================
// One working session for one version: the cached catalog, the user's
// selection, and the local paths mirrored so far.
//
// Everything lives on the instance. Two sessions for two versions never
// share state.
// =============================================================================

use crate::catalog::{normalize_version, Catalog, CatalogStore, SelectionEntry};
use crate::mirror::{GitRunner, MirrorError, MirrorManager, MirrorReport};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Session {
    /// Version as given, e.g. "14.0"
    pub version: String,
    pub catalog: Catalog,
    pub selection: Vec<SelectionEntry>,
    /// Mirrored repositories, usable as a module search path
    pub addons_paths: Vec<PathBuf>,
}

impl Session {
    /// Loads the catalog and selection documents of `version`
    pub fn open(store: &CatalogStore, version: &str) -> Self {
        let catalog = store.load_catalog(version);
        let selection = store.load_selection(version);
        tracing::debug!(
            version,
            accounts = catalog.len(),
            selected = selection.len(),
            "session opened"
        );

        Self {
            version: version.to_string(),
            catalog,
            selection,
            addons_paths: Vec::new(),
        }
    }

    /// "14.0" -> "14": the document suffix and the checkout target
    pub fn normalized_version(&self) -> &str {
        normalize_version(&self.version)
    }

    /// Mirrors the selection and remembers the resulting local paths
    pub async fn mirror<G: GitRunner>(&mut self, manager: &MirrorManager<G>) -> Result<MirrorReport, MirrorError> {
        let report = manager
            .mirror(self.normalized_version(), &self.selection, &self.catalog)
            .await?;
        self.addons_paths.extend(report.paths.iter().cloned());
        Ok(report)
    }
}
