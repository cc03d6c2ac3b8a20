//! Holding area for layer blobs between scanning and applying.
//!
//! The save archive lists its manifest and layer blobs in no guaranteed
//! order, so every candidate blob is collected before anything is applied.
//! Blobs live either in memory or, for large images, in a private
//! temporary directory that is removed when the store is dropped.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use splat_core::error::{Result, SplatError};
use splat_core::StagingMode;
use tempfile::TempDir;

enum Storage {
    Memory(HashMap<String, Vec<u8>>),
    Disk {
        dir: TempDir,
        files: HashMap<String, PathBuf>,
        next_file: usize,
    },
}

/// Layer blobs keyed by their path inside the save archive.
pub struct BlobStore {
    storage: Storage,
    sizes: HashMap<String, u64>,
}

impl BlobStore {
    /// Create an empty store using the given staging strategy.
    pub fn new(mode: StagingMode) -> Result<Self> {
        let storage = match mode {
            StagingMode::Memory => Storage::Memory(HashMap::new()),
            StagingMode::Disk => {
                let dir = tempfile::Builder::new()
                    .prefix("splat-blobs-")
                    .tempdir()
                    .map_err(|e| SplatError::fs(std::env::temp_dir(), e))?;
                tracing::debug!(dir = %dir.path().display(), "Staging layer blobs on disk");
                Storage::Disk {
                    dir,
                    files: HashMap::new(),
                    next_file: 0,
                }
            }
        };

        Ok(Self {
            storage,
            sizes: HashMap::new(),
        })
    }

    pub fn mode(&self) -> StagingMode {
        match self.storage {
            Storage::Memory(_) => StagingMode::Memory,
            Storage::Disk { .. } => StagingMode::Disk,
        }
    }

    /// Copy a blob out of `reader` under `id`, replacing any previous blob
    /// with the same id. Returns the number of bytes stored.
    pub fn insert<R: Read>(&mut self, id: &str, mut reader: R) -> Result<u64> {
        let size = match &mut self.storage {
            Storage::Memory(blobs) => {
                let mut bytes = Vec::new();
                reader
                    .read_to_end(&mut bytes)
                    .map_err(|e| read_error(id, e))?;
                let size = bytes.len() as u64;
                blobs.insert(id.to_string(), bytes);
                size
            }
            Storage::Disk {
                dir,
                files,
                next_file,
            } => {
                let path = dir.path().join(format!("blob-{}", next_file));
                *next_file += 1;
                let mut file = File::create(&path).map_err(|e| SplatError::fs(&path, e))?;
                let size = match spill(id, &path, &mut reader, &mut file) {
                    Ok(size) => size,
                    Err(e) => {
                        drop(file);
                        let _ = std::fs::remove_file(&path);
                        return Err(e);
                    }
                };
                if let Some(previous) = files.insert(id.to_string(), path) {
                    let _ = std::fs::remove_file(previous);
                }
                size
            }
        };

        self.sizes.insert(id.to_string(), size);
        Ok(size)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sizes.contains_key(id)
    }

    /// Size in bytes of the blob stored under `id`.
    pub fn size_of(&self, id: &str) -> Option<u64> {
        self.sizes.get(id).copied()
    }

    /// Open the blob stored under `id` for reading.
    ///
    /// A blob can be opened any number of times; manifests may reference
    /// the same blob for several layers.
    pub fn open(&self, id: &str) -> Result<Box<dyn Read + '_>> {
        let missing = || SplatError::InconsistentManifest {
            layer_id: id.to_string(),
        };

        match &self.storage {
            Storage::Memory(blobs) => {
                let bytes = blobs.get(id).ok_or_else(missing)?;
                Ok(Box::new(bytes.as_slice()))
            }
            Storage::Disk { files, .. } => {
                let path = files.get(id).ok_or_else(missing)?;
                let file = File::open(path).map_err(|e| SplatError::fs(path, e))?;
                Ok(Box::new(BufReader::new(file)))
            }
        }
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.sizes.values().sum()
    }
}

/// A failed read of the source archive, as opposed to a staging write failure.
fn read_error(id: &str, e: io::Error) -> SplatError {
    SplatError::CorruptArchive(format!("Failed to read layer blob {}: {}", id, e))
}

/// Copy `reader` into the staging file at `path`.
///
/// Read failures come from the save archive and map to `CorruptArchive`;
/// write failures are staging I/O at `path`.
fn spill<R: Read, W: Write>(id: &str, path: &Path, reader: &mut R, writer: &mut W) -> Result<u64> {
    let mut buf = vec![0u8; 64 * 1024];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(read_error(id, e)),
        };
        writer
            .write_all(&buf[..n])
            .map_err(|e| SplatError::fs(path, e))?;
        total += n as u64;
    }
    writer.flush().map_err(|e| SplatError::fs(path, e))?;
    Ok(total)
}

impl std::fmt::Debug for BlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobStore")
            .field("mode", &self.mode())
            .field("blobs", &self.len())
            .field("bytes", &self.total_bytes())
            .finish()
    }
}
