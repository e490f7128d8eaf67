// src/scan/mod.rs
// =============================================================================
// Discovers modules inside remote repositories.
//
// - reader:     rate-gated remote reads (listings, raw files, repositories)
// - manifest:   the restricted `__manifest__.py` literal parser
// - module:     one directory -> one ModuleRecord
// - repository: one repository -> one RepositoryRecord
// =============================================================================

mod manifest;
mod module;
mod reader;
mod repository;

pub use reader::RemoteReader;
pub use repository::{RepositoryScanner, DEFAULT_MODULE_CONCURRENCY};

#[cfg(test)]
pub(crate) use repository::tests;
