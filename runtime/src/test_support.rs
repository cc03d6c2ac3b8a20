//! Builders for synthetic layer tars and save archives used by the unit tests.

use std::io::Write;

use tar::{EntryType, Header};

/// Fluent wrapper over `tar::Builder` writing into memory.
pub(crate) struct TarBuilder {
    builder: tar::Builder<Vec<u8>>,
}

impl TarBuilder {
    pub(crate) fn new() -> Self {
        Self {
            builder: tar::Builder::new(Vec::new()),
        }
    }

    pub(crate) fn dir(mut self, path: &str) -> Self {
        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Directory);
        header.set_mode(0o755);
        header.set_size(0);
        self.builder
            .append_data(&mut header, path, std::io::empty())
            .unwrap();
        self
    }

    pub(crate) fn file(self, path: &str, content: &[u8]) -> Self {
        self.file_with_mode(path, content, 0o644)
    }

    pub(crate) fn file_with_mode(mut self, path: &str, content: &[u8], mode: u32) -> Self {
        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Regular);
        header.set_mode(mode);
        header.set_size(content.len() as u64);
        self.builder.append_data(&mut header, path, content).unwrap();
        self
    }

    /// Whiteout marker for `name` inside `dir` (`dir/.wh.name`).
    pub(crate) fn whiteout(self, dir: &str, name: &str) -> Self {
        let path = if dir.is_empty() {
            format!(".wh.{name}")
        } else {
            format!("{dir}/.wh.{name}")
        };
        self.file(&path, b"")
    }

    /// Opaque marker for `dir`.
    pub(crate) fn opaque(self, dir: &str) -> Self {
        self.file(&format!("{dir}/.wh..wh..opq"), b"")
    }

    pub(crate) fn symlink(self, path: &str, target: &str) -> Self {
        self.link(EntryType::Symlink, path, target)
    }

    pub(crate) fn hardlink(self, path: &str, target: &str) -> Self {
        self.link(EntryType::Link, path, target)
    }

    fn link(mut self, kind: EntryType, path: &str, target: &str) -> Self {
        let mut header = Header::new_gnu();
        header.set_entry_type(kind);
        header.set_mode(0o777);
        header.set_size(0);
        header.set_link_name(target).unwrap();
        self.builder
            .append_data(&mut header, path, std::io::empty())
            .unwrap();
        self
    }

    pub(crate) fn fifo(mut self, path: &str) -> Self {
        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Fifo);
        header.set_mode(0o644);
        header.set_size(0);
        self.builder
            .append_data(&mut header, path, std::io::empty())
            .unwrap();
        self
    }

    /// Entry with a name written byte-for-byte, bypassing the path checks
    /// `tar::Builder` applies (needed for `..` and absolute names).
    pub(crate) fn raw_file(mut self, name: &str, content: &[u8]) -> Self {
        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Regular);
        header.set_mode(0o644);
        header.set_size(content.len() as u64);
        let bytes = name.as_bytes();
        header.as_old_mut().name[..bytes.len()].copy_from_slice(bytes);
        header.set_cksum();
        self.builder.append(&header, content).unwrap();
        self
    }

    pub(crate) fn finish(self) -> Vec<u8> {
        self.builder.into_inner().unwrap()
    }
}

/// Docker-style `manifest.json` for a single image.
pub(crate) fn manifest_json(layers: &[&str]) -> String {
    serde_json::json!([{
        "Config": "config.json",
        "RepoTags": ["splat/test:latest"],
        "Layers": layers,
    }])
    .to_string()
}

/// Save archive holding an optional manifest followed by the given layer blobs.
pub(crate) fn save_archive(manifest: Option<&str>, blobs: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut builder = TarBuilder::new();
    if let Some(manifest) = manifest {
        builder = builder.file("manifest.json", manifest.as_bytes());
    }
    for (name, bytes) in blobs {
        builder = builder.file(name, bytes);
    }
    builder.finish()
}

pub(crate) fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(bytes).unwrap();
    encoder.finish().unwrap()
}
