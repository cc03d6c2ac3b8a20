//! Splat Runtime - layer composition engine.
//!
//! Turns a container image save archive into a filesystem tree:
//!
//! ```text
//! ImageSource ──► save archive ──► ManifestExtractor ──► (Manifest, BlobStore)
//!                                                              │
//!             destination ◄── LayerApplier ◄── ArchiveReader ◄─┘ (per layer, in order)
//! ```
//!
//! The [`Orchestrator`] drives the whole pipeline.

pub mod archive;
pub mod layer;
pub mod manifest;
pub mod orchestrator;
pub mod source;
pub mod staging;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export common types
pub use archive::{decompress, ArchiveEntry, ArchiveReader, EntryKind};
pub use layer::{ApplyStats, LayerApplier, OPAQUE_WHITEOUT, WHITEOUT_PREFIX};
pub use manifest::{ExtractedImage, Manifest, ManifestExtractor, MANIFEST_FILE};
pub use orchestrator::{LayerReport, Orchestrator, RunState, RunSummary};
pub use source::{source_from_config, ArchiveFileSource, EngineSource, ImageSource};
pub use staging::BlobStore;

/// Splat Runtime version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
