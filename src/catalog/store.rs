// src/catalog/store.rs
// =============================================================================
// Reads and writes the versioned JSON documents under the data directory.
//
//     data/github_modules_14.json   catalog for version "14.0"
//     data/repositories_14.json     selection list for version "14.0"
//
// Loading never fails: a missing or broken document is the same as an
// empty one. Saving rewrites the whole document through a temporary file
// and a rename, with sorted keys and 4-space indentation.
// =============================================================================

use super::{Catalog, SelectionEntry};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_DATA_DIR: &str = "./data";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("error while {action} '{}': {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not serialize document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Which document of a version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// The discovered module catalog
    Catalog,
    /// The user's list of repositories to mirror
    Selection,
}

impl DocumentKind {
    pub fn file_stem(self) -> &'static str {
        match self {
            DocumentKind::Catalog => "github_modules",
            DocumentKind::Selection => "repositories",
        }
    }
}

/// "14.0" -> "14". Strips every trailing ".0", so it is idempotent.
pub fn normalize_version(version: &str) -> &str {
    let mut normalized = version;
    while let Some(stripped) = normalized.strip_suffix(".0") {
        normalized = stripped;
    }
    normalized
}

#[derive(Debug, Clone)]
pub struct CatalogStore {
    data_dir: PathBuf,
}

impl CatalogStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// `{data_dir}/{kind}_{normalized version}.json`, or `{kind}.json` without a version
    pub fn path(&self, kind: DocumentKind, version: &str) -> PathBuf {
        let version = normalize_version(version);
        let file_name = if version.is_empty() {
            format!("{}.json", kind.file_stem())
        } else {
            format!("{}_{}.json", kind.file_stem(), version)
        };
        self.data_dir.join(file_name)
    }

    /// Loads a document, falling back to `T::default()` when it is absent or unreadable
    pub fn load<T>(&self, kind: DocumentKind, version: &str) -> T
    where
        T: DeserializeOwned + Default,
    {
        let path = self.path(kind, version);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "document not readable, using empty default");
                return T::default();
            }
        };

        match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "document is not valid, using empty default");
                T::default()
            }
        }
    }

    /// Replaces the whole document with `value`
    pub fn save<T>(&self, kind: DocumentKind, version: &str, value: &T) -> Result<PathBuf, StoreError>
    where
        T: Serialize + ?Sized,
    {
        let path = self.path(kind, version);
        let bytes = to_document_bytes(value)?;

        fs::create_dir_all(&self.data_dir).map_err(|source| StoreError::Io {
            action: "creating data directory",
            path: self.data_dir.clone(),
            source,
        })?;

        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, &bytes).map_err(|source| StoreError::Io {
            action: "writing",
            path: tmp_path.clone(),
            source,
        })?;
        fs::rename(&tmp_path, &path).map_err(|source| StoreError::Io {
            action: "replacing",
            path: path.clone(),
            source,
        })?;

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "document saved");
        Ok(path)
    }

    pub fn load_catalog(&self, version: &str) -> Catalog {
        self.load(DocumentKind::Catalog, version)
    }

    pub fn save_catalog(&self, version: &str, catalog: &Catalog) -> Result<PathBuf, StoreError> {
        self.save(DocumentKind::Catalog, version, catalog)
    }

    pub fn load_selection(&self, version: &str) -> Vec<SelectionEntry> {
        self.load(DocumentKind::Selection, version)
    }

    #[cfg(test)]
    pub fn save_selection(&self, version: &str, selection: &[SelectionEntry]) -> Result<PathBuf, StoreError> {
        self.save(DocumentKind::Selection, version, selection)
    }
}

/// Pretty JSON, 4-space indent, every object's keys sorted, trailing newline
fn to_document_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, StoreError> {
    // Going through Value sorts struct fields as well as map keys
    let value = serde_json::to_value(value)?;

    let mut bytes = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut bytes, formatter);
    value.serialize(&mut serializer)?;
    bytes.push(b'\n');
    Ok(bytes)
}
