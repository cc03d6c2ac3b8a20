use std::path::{Path, PathBuf};

use thiserror::Error;

/// Splat error types
#[derive(Error, Debug)]
pub enum SplatError {
    /// Invalid invocation (missing image reference or destination)
    #[error("Usage error: {0}")]
    Usage(String),

    /// Image is not resolvable from the local image source
    #[error("Image not found: {reference}")]
    ImageNotFound { reference: String },

    /// Remote fetch of an image failed
    #[error("Pull failed: {reference} - {message}")]
    PullFailed { reference: String, message: String },

    /// Image could not be obtained, even after a pull attempt
    #[error("Image unavailable: {reference} - {message}")]
    ImageUnavailable { reference: String, message: String },

    /// Malformed tar stream
    #[error("Corrupt archive: {0}")]
    CorruptArchive(String),

    /// Save archive has no manifest entry
    #[error("Missing manifest: no manifest.json found in image archive")]
    MissingManifest,

    /// Manifest entry could not be parsed
    #[error("Corrupt manifest: {0}")]
    CorruptManifest(String),

    /// Manifest references a layer that the archive does not contain
    #[error("Inconsistent manifest: layer {layer_id} not found in image archive")]
    InconsistentManifest { layer_id: String },

    /// Create/write/remove failure while applying a layer
    #[error("Filesystem error at {}: {source}", path.display())]
    FileSystemError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl SplatError {
    /// Wrap an I/O failure that happened at `path` in the destination tree.
    pub fn fs(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        SplatError::FileSystemError {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

/// Result type alias for splat operations
pub type Result<T> = std::result::Result<T, SplatError>;
