//! Where save archives come from.
//!
//! An [`ImageSource`] turns an image reference into a readable save archive
//! stream, and can fetch images it does not have yet.

mod archive_file;
mod engine;

pub use archive_file::ArchiveFileSource;
pub use engine::EngineSource;

use std::io::Read;

use splat_core::error::Result;
use splat_core::{SourceConfig, SourceKind};

/// Provider of image save archives.
pub trait ImageSource {
    /// Human-readable name used in logs.
    fn describe(&self) -> String;

    /// Open the save archive for `reference`.
    ///
    /// Fails with `ImageNotFound` when the image is not available locally.
    fn open(&self, reference: &str) -> Result<Box<dyn Read + Send>>;

    /// Fetch `reference` so a following `open` can find it.
    ///
    /// Fails with `PullFailed`.
    fn pull(&self, reference: &str) -> Result<()>;
}

/// Build the image source selected by the configuration.
pub fn source_from_config(config: &SourceConfig) -> Box<dyn ImageSource> {
    match config.kind {
        SourceKind::Engine => Box::new(
            EngineSource::new(config.engine.clone()).with_args(config.engine_args.clone()),
        ),
        SourceKind::Archive => Box::new(ArchiveFileSource::new()),
    }
}
