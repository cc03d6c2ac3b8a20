//! Save archives already written to disk (`docker save -o image.tar`).

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use splat_core::error::{Result, SplatError};

use super::ImageSource;

/// Treats the image reference as the path of a save archive.
#[derive(Debug, Clone, Default)]
pub struct ArchiveFileSource;

impl ArchiveFileSource {
    pub fn new() -> Self {
        Self
    }
}

impl ImageSource for ArchiveFileSource {
    fn describe(&self) -> String {
        "archive file".to_string()
    }

    fn open(&self, reference: &str) -> Result<Box<dyn Read + Send>> {
        let path = Path::new(reference);
        let not_found = || SplatError::ImageNotFound {
            reference: reference.to_string(),
        };

        let meta = match std::fs::metadata(path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(not_found()),
            Err(e) => return Err(SplatError::fs(path, e)),
        };
        if meta.is_dir() {
            return Err(SplatError::Other(format!(
                "{} is a directory, not an image archive",
                path.display()
            )));
        }

        tracing::debug!(path = %path.display(), size = meta.len(), "Opening image archive");
        let file = File::open(path).map_err(|e| SplatError::fs(path, e))?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn pull(&self, reference: &str) -> Result<()> {
        Err(SplatError::PullFailed {
            reference: reference.to_string(),
            message: "archive sources cannot pull images".to_string(),
        })
    }
}
