//! End-to-end image materialization.
//!
//! Obtains the save archive (pulling the image when the source does not have
//! it), collects the manifest and layer blobs, checks the manifest against
//! the blobs, then applies every layer onto the destination in manifest
//! order. Nothing is written to the destination before the manifest checks
//! out.

use std::io::Read;
use std::path::{Path, PathBuf};

use splat_core::error::{Result, SplatError};
use splat_core::SplatConfig;

use crate::archive::{decompress, ArchiveReader};
use crate::layer::{ApplyStats, LayerApplier};
use crate::manifest::ManifestExtractor;
use crate::source::{source_from_config, ImageSource};

/// Progress of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Idle,
    ImageObtained,
    ManifestParsed { layers: usize },
    /// `index` is zero-based
    ApplyingLayer { index: usize, total: usize },
    Done,
    Failed,
}

/// Outcome of applying one layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerReport {
    /// Layer id as listed in the manifest
    pub id: String,
    /// Size of the layer blob as stored in the archive
    pub bytes: u64,
    pub stats: ApplyStats,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub reference: String,
    pub destination: PathBuf,
    pub layers: Vec<LayerReport>,
}

impl RunSummary {
    pub fn files_written(&self) -> usize {
        self.layers.iter().map(|layer| layer.stats.files).sum()
    }

    pub fn bytes_written(&self) -> u64 {
        self.layers.iter().map(|layer| layer.stats.bytes).sum()
    }

    pub fn whiteouts(&self) -> usize {
        self.layers.iter().map(|layer| layer.stats.whiteouts).sum()
    }

    pub fn skipped(&self) -> usize {
        self.layers.iter().map(|layer| layer.stats.skipped).sum()
    }
}

/// Drives one image from source to destination.
pub struct Orchestrator {
    config: SplatConfig,
    source: Box<dyn ImageSource>,
    state: RunState,
}

impl Orchestrator {
    pub fn new(config: SplatConfig, source: Box<dyn ImageSource>) -> Self {
        Self {
            config,
            source,
            state: RunState::Idle,
        }
    }

    /// Build an orchestrator with the image source the configuration selects.
    pub fn from_config(config: SplatConfig) -> Self {
        let source = source_from_config(&config.source);
        Self::new(config, source)
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn config(&self) -> &SplatConfig {
        &self.config
    }

    /// Materialize `reference` into `destination`.
    ///
    /// Any failure leaves the orchestrator in [`RunState::Failed`]. Layers
    /// applied before the failure stay on disk.
    pub fn run(&mut self, reference: &str, destination: &Path) -> Result<RunSummary> {
        self.state = RunState::Idle;
        let result = self.run_steps(reference, destination);
        if let Err(e) = &result {
            tracing::debug!(reference, error = %e, "Run failed");
            self.state = RunState::Failed;
        }
        result
    }

    fn run_steps(&mut self, reference: &str, destination: &Path) -> Result<RunSummary> {
        if reference.trim().is_empty() {
            return Err(SplatError::Usage(
                "an image reference is required".to_string(),
            ));
        }
        if destination.as_os_str().is_empty() {
            return Err(SplatError::Usage(
                "a destination directory is required".to_string(),
            ));
        }

        let stream = self.obtain(reference)?;
        self.state = RunState::ImageObtained;
        tracing::debug!(reference, source = %self.source.describe(), "Image obtained");

        let image = ManifestExtractor::new(self.config.staging)
            .require_manifest(self.config.require_manifest)
            .extract(ArchiveReader::new(decompress(stream)?))?;
        image.verify()?;

        let total = image.manifest.layers().len();
        self.state = RunState::ManifestParsed { layers: total };
        tracing::info!(
            reference,
            layers = total,
            blobs = image.blobs.len(),
            "Manifest parsed"
        );

        std::fs::create_dir_all(destination).map_err(|e| SplatError::fs(destination, e))?;
        let applier = LayerApplier::new(destination);

        let mut layers = Vec::with_capacity(total);
        for (index, id) in image.manifest.layers().iter().enumerate() {
            self.state = RunState::ApplyingLayer { index, total };
            tracing::info!(layer = %id, index = index + 1, total, "Applying layer");

            let blob = decompress(image.blobs.open(id)?)?;
            let stats = applier.apply(blob)?;
            tracing::debug!(
                layer = %id,
                files = stats.files,
                whiteouts = stats.whiteouts,
                skipped = stats.skipped,
                "Layer applied"
            );

            layers.push(LayerReport {
                id: id.clone(),
                bytes: image.blobs.size_of(id).unwrap_or_default(),
                stats,
            });
        }

        self.state = RunState::Done;
        tracing::info!(
            reference,
            destination = %destination.display(),
            layers = layers.len(),
            "Image materialized"
        );

        Ok(RunSummary {
            reference: reference.to_string(),
            destination: destination.to_path_buf(),
            layers,
        })
    }

    /// Open the save archive, pulling once if the source does not have it.
    fn obtain(&self, reference: &str) -> Result<Box<dyn Read + Send>> {
        let unavailable = |e: SplatError| SplatError::ImageUnavailable {
            reference: reference.to_string(),
            message: e.to_string(),
        };

        match self.source.open(reference) {
            Ok(stream) => Ok(stream),
            Err(SplatError::ImageNotFound { .. }) => {
                tracing::info!(
                    reference,
                    source = %self.source.describe(),
                    "Image not found, attempting to pull it"
                );
                self.source.pull(reference).map_err(unavailable)?;
                self.source.open(reference).map_err(unavailable)
            }
            Err(e) => Err(unavailable(e)),
        }
    }
}
