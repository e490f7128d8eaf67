// src/scan/module.rs
// =============================================================================
// Turns one top-level directory of a repository into a ModuleRecord.
//
// A directory is a module when it holds a `__manifest__.py`. The manifest
// is downloaded, its comment lines dropped, and the remaining dictionary
// literal parsed (see manifest.rs). Anything that goes wrong on the way
// means "not a module" and is only logged.
// =============================================================================

use super::manifest::{parse_manifest, strip_comments, Manifest};
use super::reader::RemoteReader;
use crate::catalog::ModuleRecord;
use crate::github::{DirEntry, Result};

pub const MANIFEST_FILE: &str = "__manifest__.py";

/// Extracts the module living in `dir`, if any.
///
/// Only faults of the rate gate are returned as errors; every other
/// failure yields `Ok(None)`.
pub async fn extract_module(
    reader: &RemoteReader,
    full_name: &str,
    reference: &str,
    dir: &DirEntry,
) -> Result<Option<ModuleRecord>> {
    let files = match reader.list_path(full_name, &format!("./{}", dir.name), reference).await {
        Ok(files) => files,
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            tracing::warn!(repository = full_name, directory = %dir.name, error = %e, "could not list directory");
            return Ok(None);
        }
    };

    let Some(manifest_entry) = files.iter().find(|f| f.is_file() && f.name == MANIFEST_FILE) else {
        return Ok(None);
    };

    let Some(download_url) = manifest_entry.download_url.as_deref() else {
        tracing::debug!(repository = full_name, directory = %dir.name, "manifest has no download url");
        return Ok(None);
    };

    let text = match reader.fetch_text(download_url).await {
        Ok(text) => text,
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            tracing::warn!(repository = full_name, directory = %dir.name, error = %e, "could not download manifest");
            return Ok(None);
        }
    };

    match parse_manifest(&strip_comments(&text)) {
        Ok(manifest) => Ok(Some(module_record(&dir.name, &manifest))),
        Err(e) => {
            tracing::debug!(repository = full_name, directory = %dir.name, error = %e, "manifest is not a plain literal, skipping");
            Ok(None)
        }
    }
}

/// Maps the known manifest keys onto a record named after its directory
pub fn module_record(directory: &str, manifest: &Manifest) -> ModuleRecord {
    ModuleRecord {
        name: directory.to_string(),
        display_name: manifest.text("name"),
        summary: manifest.text("summary"),
        version: manifest.text("version"),
        author: manifest.text("author"),
        category: manifest.text("category"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::tests::{mount_listing, mount_raw, reader_for};
    use wiremock::MockServer;

    #[test]
    fn test_module_record_defaults_missing_keys() {
        let manifest = parse_manifest("{'name': 'Partner Tags', 'version': '14.0.1.0.0'}").unwrap();
        let record = module_record("partner_tags", &manifest);

        assert_eq!(record.name, "partner_tags");
        assert_eq!(record.display_name, "Partner Tags");
        assert_eq!(record.version, "14.0.1.0.0");
        assert_eq!(record.summary, "");
        assert_eq!(record.author, "");
        assert_eq!(record.category, "");
    }

    #[test]
    fn test_module_record_renders_lists() {
        let manifest = parse_manifest("{'author': ['Alice', 'Bob']}").unwrap();
        assert_eq!(module_record("m", &manifest).author, "Alice, Bob");
    }

    #[tokio::test]
    async fn test_deeply_nested_manifest_is_not_a_module() {
        let server = MockServer::start().await;
        let reader = reader_for(&server).await;
        let uri = server.uri();

        mount_listing(
            &server,
            "/repos/OCA/web/contents/web_deep",
            serde_json::json!([
                { "name": "__manifest__.py", "type": "file", "download_url": format!("{uri}/raw/web_deep") }
            ]),
        )
        .await;
        let text = format!("{{'name': 'Deep', 'data': {}{}}}", "[".repeat(100_000), "]".repeat(100_000));
        mount_raw(&server, "/raw/web_deep", &text).await;

        let dir: DirEntry = serde_json::from_value(serde_json::json!({ "name": "web_deep", "type": "dir" })).unwrap();
        let module = extract_module(&reader, "OCA/web", "14.0", &dir).await.unwrap();
        assert_eq!(module, None);
    }
}
