//! Page and file mappings: what the run resolved each identifier to.
//!
//! Both maps are append-only during traversal and serialized verbatim at the
//! end of the run. The alias convention recorded here (`fichiers/<id>`
//! resolving to the titled file) is what lets rewritten links work without
//! consulting the mappings at browse time. Field names in the JSON output
//! match the mapping format the mirror has always shipped, so existing
//! tooling keeps working.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::MirrorError;

/// One saved directory page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    /// Local filename (`docs_rep_<id>.html`).
    #[serde(rename = "fichier")]
    pub local_file: String,
    /// Display label of the link that reached this directory.
    #[serde(rename = "nom_complet")]
    pub label: String,
    /// Canonical remote reference (`docs?rep=<id>`).
    #[serde(rename = "url_originale")]
    pub remote_ref: String,
    /// Text of the clicked link.
    #[serde(rename = "texte_clique")]
    pub link_text: String,
}

/// One resolved file download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Resolved local filename under `fichiers/`.
    #[serde(rename = "fichier_reel")]
    pub local_file: String,
    /// Alias entry name (the raw file identifier).
    #[serde(rename = "lien_symbolique")]
    pub alias: String,
    /// Human title as displayed on the portal.
    #[serde(rename = "titre")]
    pub title: String,
    /// Display label of the owning directory.
    #[serde(rename = "repository")]
    pub directory: String,
    /// Human-readable size string.
    #[serde(rename = "taille")]
    pub size_human: String,
    /// Exact size in bytes.
    #[serde(rename = "octets")]
    pub size_bytes: u64,
}

/// A download that did not produce a file; listed in the final report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDownload {
    pub id: String,
    pub title: String,
    pub reason: String,
}

/// Accumulated mirror state: mappings plus the failure list.
///
/// `BTreeMap` keys keep the serialized output deterministic.
#[derive(Debug, Default)]
pub struct MirrorState {
    pub pages: BTreeMap<String, PageRecord>,
    pub files: BTreeMap<String, FileRecord>,
    pub failures: Vec<FailedDownload>,
}

impl MirrorState {
    /// Serializes both mappings into the mirror root.
    pub fn save(&self, output_dir: &Path) -> Result<(), MirrorError> {
        write_json(&output_dir.join("mapping_pages.json"), &self.pages)?;
        write_json(&output_dir.join("mapping_fichiers.json"), &self.files)?;
        info!(
            pages = self.pages.len(),
            files = self.files.len(),
            "mappings saved"
        );
        Ok(())
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), MirrorError> {
    let body = serde_json::to_string_pretty(value)
        .map_err(|source| MirrorError::io(path.to_path_buf(), source.into()))?;
    fs::write(path, body).map_err(|source| MirrorError::io(path.to_path_buf(), source))
}
