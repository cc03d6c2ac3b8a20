//! Forward-only tar archive reading.
//!
//! The same reader is used for the outer save archive and for every
//! layer archive inside it. Entries are visited in archive order and each
//! entry's content is only readable until the next entry is requested.

use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use splat_core::error::{Result, SplatError};
use tar::EntryType;

/// Leading bytes of a gzip stream.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Kind of a tar record, as far as layer application is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    Regular,
    /// Symbolic link with its target, kept verbatim
    Symlink(PathBuf),
    /// Hard link with its target path inside the archive
    HardLink(PathBuf),
    /// Device nodes, fifos and anything else, with the raw type flag
    Unsupported(u8),
}

/// One record of a tar stream.
pub struct ArchiveEntry<'a, R: 'a + Read> {
    inner: tar::Entry<'a, R>,
    path: PathBuf,
    kind: EntryKind,
    mode: u32,
}

impl<'a, R: 'a + Read> ArchiveEntry<'a, R> {
    fn from_tar(inner: tar::Entry<'a, R>) -> Result<Self> {
        let path = inner
            .path()
            .map_err(|e| SplatError::CorruptArchive(format!("Invalid entry path: {}", e)))?
            .into_owned();

        let header = inner.header();
        let mode = header.mode().map_err(|e| {
            SplatError::CorruptArchive(format!(
                "Invalid mode for entry {}: {}",
                path.display(),
                e
            ))
        })? & 0o7777;

        let kind = match header.entry_type() {
            EntryType::Directory => EntryKind::Directory,
            // Old v7 archives mark directories with a trailing slash only.
            EntryType::Regular | EntryType::Continuous
                if header.as_ustar().is_none() && inner.path_bytes().ends_with(b"/") =>
            {
                EntryKind::Directory
            }
            EntryType::Regular | EntryType::Continuous => EntryKind::Regular,
            entry_type @ (EntryType::Symlink | EntryType::Link) => {
                let target = inner
                    .link_name()
                    .map_err(|e| {
                        SplatError::CorruptArchive(format!(
                            "Invalid link target for {}: {}",
                            path.display(),
                            e
                        ))
                    })?
                    .ok_or_else(|| {
                        SplatError::CorruptArchive(format!(
                            "Link entry {} has no target",
                            path.display()
                        ))
                    })?
                    .into_owned();

                if entry_type == EntryType::Symlink {
                    EntryKind::Symlink(target)
                } else {
                    EntryKind::HardLink(target)
                }
            }
            other => EntryKind::Unsupported(other.as_byte()),
        };

        Ok(Self {
            inner,
            path,
            kind,
            mode,
        })
    }

    /// Path of the entry as recorded in the archive.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> &EntryKind {
        &self.kind
    }

    /// Permission bits (including setuid/setgid/sticky).
    pub fn mode(&self) -> u32 {
        self.mode
    }

    /// Size of the entry's content in bytes.
    pub fn size(&self) -> u64 {
        self.inner.size()
    }
}

impl<'a, R: 'a + Read> Read for ArchiveEntry<'a, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

/// Streaming tar reader.
pub struct ArchiveReader<R: Read> {
    archive: tar::Archive<R>,
}

impl<R: Read> ArchiveReader<R> {
    /// Wrap a byte source positioned at the start of a tar stream.
    pub fn new(reader: R) -> Self {
        Self {
            archive: tar::Archive::new(reader),
        }
    }

    /// Visit every entry in archive order.
    ///
    /// End of stream ends the visit. A malformed header stops the visit with
    /// `CorruptArchive`; errors returned by `visit` are passed through as-is.
    pub fn for_each_entry<F>(&mut self, mut visit: F) -> Result<()>
    where
        F: FnMut(&mut ArchiveEntry<'_, R>) -> Result<()>,
    {
        let entries = self
            .archive
            .entries()
            .map_err(|e| SplatError::CorruptArchive(format!("Failed to read archive: {}", e)))?;

        for entry in entries {
            let entry = entry.map_err(|e| {
                SplatError::CorruptArchive(format!("Failed to read archive entry: {}", e))
            })?;
            let mut entry = ArchiveEntry::from_tar(entry)?;
            visit(&mut entry)?;
        }

        Ok(())
    }
}

/// Wrap `reader` in a gzip decoder when the stream starts with the gzip magic.
///
/// Plain tar streams pass through untouched.
pub fn decompress<'a, R: Read + 'a>(mut reader: R) -> Result<Box<dyn Read + 'a>> {
    let mut head = [0u8; 2];
    let mut filled = 0;
    while filled < head.len() {
        match reader.read(&mut head[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(SplatError::CorruptArchive(format!(
                    "Failed to read archive header: {}",
                    e
                )))
            }
        }
    }

    let stream = io::Cursor::new(head[..filled].to_vec()).chain(reader);
    if head[..filled] == GZIP_MAGIC {
        Ok(Box::new(GzDecoder::new(stream)))
    } else {
        Ok(Box::new(stream))
    }
}

/// Normalize an archive path to a path relative to the extraction root.
///
/// Leading `/` and `./` are dropped. Returns `None` for paths that climb
/// out of the root with `..`.
pub fn normalize_entry_path(path: &Path) -> Option<PathBuf> {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            Component::ParentDir => return None,
        }
    }
    Some(normalized)
}

/// Normalize an entry name or manifest reference for lookups
/// (`./abc/layer.tar` and `abc/layer.tar` name the same blob).
pub fn normalize_name(name: &str) -> String {
    let mut name = name;
    loop {
        if let Some(rest) = name.strip_prefix("./") {
            name = rest;
        } else if let Some(rest) = name.strip_prefix('/') {
            name = rest;
        } else {
            return name.to_string();
        }
    }
}
