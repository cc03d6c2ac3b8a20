//! Save-archive manifest extraction.
//!
//! A save archive (`docker save`, `podman save`) holds a top-level
//! `manifest.json` naming the image's layer blobs, bottom layer first,
//! plus the blobs themselves somewhere in the same archive:
//!
//! ```text
//! manifest.json                 [{"Config": ..., "RepoTags": [...], "Layers": [...]}]
//! <layer-id>/layer.tar          classic layout
//! blobs/sha256/<digest>         OCI layout written by newer engines
//! ```

use std::io::Read;

use serde::Deserialize;
use splat_core::error::{Result, SplatError};
use splat_core::StagingMode;

use crate::archive::{normalize_name, ArchiveReader, EntryKind};
use crate::staging::BlobStore;

/// Name of the manifest entry at the top of a save archive.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Ordered layer list of a save archive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    layers: Vec<String>,
    repo_tags: Vec<String>,
}

/// One image record of `manifest.json`. Only the layer list is required.
#[derive(Debug, Deserialize)]
struct ManifestRecord {
    #[serde(rename = "Layers", alias = "layers")]
    layers: Vec<String>,

    #[serde(rename = "RepoTags", alias = "repoTags", default)]
    repo_tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ManifestDocument {
    Records(Vec<ManifestRecord>),
    Single(ManifestRecord),
}

impl Manifest {
    /// Parse the content of a `manifest.json` entry.
    ///
    /// Accepts the docker shape (an array of image records) as well as a
    /// single record. Layer lists of several records are concatenated in
    /// record order.
    pub fn parse(content: &[u8]) -> Result<Self> {
        let document: ManifestDocument = serde_json::from_slice(content).map_err(|e| {
            SplatError::CorruptManifest(format!("Failed to parse {}: {}", MANIFEST_FILE, e))
        })?;

        let records = match document {
            ManifestDocument::Records(records) => records,
            ManifestDocument::Single(record) => vec![record],
        };

        let mut manifest = Manifest::default();
        for record in records {
            manifest
                .layers
                .extend(record.layers.iter().map(|layer| normalize_name(layer)));
            manifest
                .repo_tags
                .extend(record.repo_tags.unwrap_or_default());
        }

        Ok(manifest)
    }

    /// Layer blob ids in stacking order, bottom layer first.
    pub fn layers(&self) -> &[String] {
        &self.layers
    }

    pub fn repo_tags(&self) -> &[String] {
        &self.repo_tags
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

/// Whether an outer-archive entry may be a layer blob.
///
/// Classic saves name layers `<id>/layer.tar`, so any path containing
/// `.tar` qualifies, at any depth. OCI-layout saves keep layers under
/// `blobs/` without an extension.
pub fn is_layer_candidate(name: &str) -> bool {
    name.contains(".tar") || name.starts_with("blobs/")
}

/// Manifest and collected layer blobs of one save archive.
#[derive(Debug)]
pub struct ExtractedImage {
    pub manifest: Manifest,
    pub blobs: BlobStore,
}

impl ExtractedImage {
    /// Check that every layer named by the manifest has a blob.
    pub fn verify(&self) -> Result<()> {
        match self
            .manifest
            .layers()
            .iter()
            .find(|layer| !self.blobs.contains(layer))
        {
            Some(layer) => Err(SplatError::InconsistentManifest {
                layer_id: layer.clone(),
            }),
            None => Ok(()),
        }
    }
}

/// Single-pass scanner over a save archive.
#[derive(Debug, Clone)]
pub struct ManifestExtractor {
    staging: StagingMode,
    require_manifest: bool,
}

impl ManifestExtractor {
    /// Create an extractor that stages blobs with `staging` and requires a manifest.
    pub fn new(staging: StagingMode) -> Self {
        Self {
            staging,
            require_manifest: true,
        }
    }

    /// Whether an archive without `manifest.json` is an error (default) or
    /// an image with zero layers.
    pub fn require_manifest(mut self, required: bool) -> Self {
        self.require_manifest = required;
        self
    }

    /// Scan the save archive once, parsing the manifest and collecting
    /// every candidate layer blob. Other entries are skipped.
    pub fn extract<R: Read>(&self, mut archive: ArchiveReader<R>) -> Result<ExtractedImage> {
        let mut manifest: Option<Manifest> = None;
        let mut blobs = BlobStore::new(self.staging)?;

        archive.for_each_entry(|entry| {
            let name = normalize_name(&entry.path().to_string_lossy());

            if name == MANIFEST_FILE {
                let mut content = Vec::new();
                entry.read_to_end(&mut content).map_err(|e| {
                    SplatError::CorruptArchive(format!("Failed to read {}: {}", MANIFEST_FILE, e))
                })?;

                let parsed = Manifest::parse(&content)?;
                tracing::debug!(
                    layers = parsed.layers().len(),
                    tags = ?parsed.repo_tags(),
                    "Parsed manifest"
                );
                if manifest.replace(parsed).is_some() {
                    tracing::warn!("Archive holds more than one manifest, using the last one");
                }
            } else if entry.kind() == &EntryKind::Regular && is_layer_candidate(&name) {
                let size = blobs.insert(&name, &mut *entry)?;
                tracing::debug!(blob = %name, size, "Collected layer blob");
            }

            Ok(())
        })?;

        let manifest = match manifest {
            Some(manifest) => manifest,
            None if self.require_manifest => return Err(SplatError::MissingManifest),
            None => {
                tracing::warn!("No {} found in image archive, nothing to apply", MANIFEST_FILE);
                Manifest::default()
            }
        };

        Ok(ExtractedImage { manifest, blobs })
    }
}
