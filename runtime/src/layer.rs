//! Layer application.
//!
//! Applies one layer tar onto a destination tree, entry by entry, with
//! OCI whiteout semantics:
//!
//! - `dir/.wh.<name>` removes `dir/<name>` left by a lower layer.
//! - `dir/.wh..wh..opq` marks `dir` opaque: lower-layer contents go away.
//!
//! Directories are created as needed, regular files are written through,
//! links are recreated. Device nodes and fifos are skipped.

use std::collections::HashSet;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use splat_core::error::{Result, SplatError};

use crate::archive::{normalize_entry_path, ArchiveEntry, ArchiveReader, EntryKind};

/// Base-name prefix marking a deleted path.
pub const WHITEOUT_PREFIX: &str = ".wh.";

/// Base name marking its directory as opaque.
pub const OPAQUE_WHITEOUT: &str = ".wh..wh..opq";

/// Counters for one layer application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyStats {
    pub directories: usize,
    pub files: usize,
    pub symlinks: usize,
    pub hardlinks: usize,
    pub whiteouts: usize,
    /// Entries not applied (unsupported kinds, unsafe paths)
    pub skipped: usize,
    /// Regular-file bytes written
    pub bytes: u64,
}

/// Bookkeeping for one layer application.
#[derive(Default)]
struct LayerState {
    stats: ApplyStats,
    /// Paths this layer wrote, with their ancestors; an opaque marker in the
    /// same layer keeps them
    written: HashSet<PathBuf>,
    /// Paths this layer declared but did not create
    skipped: HashSet<PathBuf>,
}

impl LayerState {
    fn record_written(&mut self, relative: &Path) {
        self.skipped.remove(relative);
        for ancestor in relative.ancestors() {
            if ancestor.as_os_str().is_empty() || !self.written.insert(ancestor.to_path_buf()) {
                break;
            }
        }
    }

    fn record_skipped(&mut self, relative: PathBuf) {
        self.stats.skipped += 1;
        self.skipped.insert(relative);
    }
}

/// Applies layer archives onto a destination root.
#[derive(Debug, Clone)]
pub struct LayerApplier {
    root: PathBuf,
}

impl LayerApplier {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Apply every entry of the layer tar in `reader`, in archive order.
    ///
    /// The first failure aborts the layer; entries applied before it stay
    /// on disk.
    pub fn apply<R: Read>(&self, reader: R) -> Result<ApplyStats> {
        let mut state = LayerState::default();

        ArchiveReader::new(reader).for_each_entry(|entry| self.apply_entry(entry, &mut state))?;

        Ok(state.stats)
    }

    fn apply_entry<R: Read>(
        &self,
        entry: &mut ArchiveEntry<'_, R>,
        state: &mut LayerState,
    ) -> Result<()> {
        let relative = match normalize_entry_path(entry.path()) {
            Some(relative) if relative.as_os_str().is_empty() => {
                // The root entry ("./") of the layer.
                return Ok(());
            }
            Some(relative) => relative,
            None => {
                tracing::warn!(
                    path = %entry.path().display(),
                    "Skipping entry that escapes the destination"
                );
                state.stats.skipped += 1;
                return Ok(());
            }
        };

        if self.has_symlinked_parent(&relative)? {
            tracing::warn!(
                path = %relative.display(),
                "Skipping entry below a symlink"
            );
            state.record_skipped(relative);
            return Ok(());
        }

        let name = relative
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default();

        if name == OPAQUE_WHITEOUT {
            let dir = relative.parent().unwrap_or_else(|| Path::new(""));
            self.clear_opaque_dir(dir, &state.written)?;
            state.stats.whiteouts += 1;
            return Ok(());
        }

        if let Some(target) = name.strip_prefix(WHITEOUT_PREFIX) {
            if target.is_empty() {
                tracing::warn!(path = %relative.display(), "Ignoring whiteout without a target");
                state.stats.skipped += 1;
                return Ok(());
            }
            self.remove_whiteout_target(&relative.with_file_name(target))?;
            state.stats.whiteouts += 1;
            return Ok(());
        }

        let path = self.root.join(&relative);
        match entry.kind().clone() {
            EntryKind::Directory => {
                self.ensure_dir(&path)?;
                state.stats.directories += 1;
            }
            EntryKind::Regular => {
                state.stats.bytes += self.write_file(&path, entry)?;
                state.stats.files += 1;
            }
            EntryKind::Symlink(target) => {
                if !self.create_symlink(&path, &target)? {
                    state.record_skipped(relative);
                    return Ok(());
                }
                state.stats.symlinks += 1;
            }
            EntryKind::HardLink(target) => {
                if !self.create_hardlink(&path, &target, &state.skipped)? {
                    state.record_skipped(relative);
                    return Ok(());
                }
                state.stats.hardlinks += 1;
            }
            EntryKind::Unsupported(flag) => {
                tracing::debug!(
                    path = %relative.display(),
                    type_flag = %char::from(flag),
                    "Skipping unsupported entry type"
                );
                state.record_skipped(relative);
                return Ok(());
            }
        }

        state.record_written(&relative);
        Ok(())
    }

    /// Whether any existing ancestor of `relative` below the root is a symlink.
    ///
    /// Writing or deleting through such a path could reach outside the root.
    fn has_symlinked_parent(&self, relative: &Path) -> Result<bool> {
        let Some(parent) = relative.parent() else {
            return Ok(false);
        };

        let mut current = self.root.clone();
        for component in parent.components() {
            current.push(component);
            match fs::symlink_metadata(&current) {
                Ok(meta) if meta.file_type().is_symlink() => return Ok(true),
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
                Err(e) => return Err(SplatError::fs(&current, e)),
            }
        }

        Ok(false)
    }

    fn remove_whiteout_target(&self, relative: &Path) -> Result<()> {
        let target = self.root.join(relative);
        tracing::debug!(path = %target.display(), "Whiteout detected, removing");

        let meta = match fs::symlink_metadata(&target) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::warn!(path = %target.display(), "Could not find whiteout target");
                return Ok(());
            }
            Err(e) => return Err(SplatError::fs(&target, e)),
        };

        remove_path(&target, &meta).map_err(|e| SplatError::fs(&target, e))
    }

    fn clear_opaque_dir(&self, relative_dir: &Path, written: &HashSet<PathBuf>) -> Result<()> {
        tracing::debug!(
            dir = %self.root.join(relative_dir).display(),
            "Opaque directory, clearing lower layers"
        );
        self.clear_lower_entries(relative_dir, written)
    }

    /// Remove everything under `relative_dir` this layer did not write.
    /// Directories the layer wrote are kept and cleared recursively.
    fn clear_lower_entries(&self, relative_dir: &Path, written: &HashSet<PathBuf>) -> Result<()> {
        let dir = self.root.join(relative_dir);
        let children = match fs::read_dir(&dir) {
            Ok(children) => children,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(SplatError::fs(&dir, e)),
        };

        for child in children {
            let child = child.map_err(|e| SplatError::fs(&dir, e))?;
            let relative = relative_dir.join(child.file_name());
            let path = child.path();
            let meta = fs::symlink_metadata(&path).map_err(|e| SplatError::fs(&path, e))?;

            if written.contains(&relative) {
                if meta.is_dir() {
                    self.clear_lower_entries(&relative, written)?;
                }
                continue;
            }

            remove_path(&path, &meta).map_err(|e| SplatError::fs(&path, e))?;
        }

        Ok(())
    }

    /// Make sure `path` is a directory. Existing directories are left alone.
    fn ensure_dir(&self, path: &Path) -> Result<()> {
        match fs::symlink_metadata(path) {
            Ok(meta) if meta.is_dir() => return Ok(()),
            Ok(meta) => remove_path(path, &meta).map_err(|e| SplatError::fs(path, e))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(SplatError::fs(path, e)),
        }

        tracing::debug!(path = %path.display(), "Creating directory");
        create_dir_all(path)
    }

    /// Write a regular file with the entry's permission bits and content.
    fn write_file<R: Read>(&self, path: &Path, entry: &mut ArchiveEntry<'_, R>) -> Result<u64> {
        self.prepare_path(path)?;

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(entry.mode());
        }

        tracing::debug!(path = %path.display(), size = entry.size(), "Creating file");
        let mut file = options.open(path).map_err(|e| SplatError::fs(path, e))?;
        let copied = io::copy(entry, &mut file).map_err(|e| SplatError::fs(path, e))?;
        // Closed per file, not at the end of the layer.
        drop(file);

        Ok(copied)
    }

    #[cfg(unix)]
    fn create_symlink(&self, path: &Path, target: &Path) -> Result<bool> {
        self.prepare_path(path)?;
        tracing::debug!(
            path = %path.display(),
            target = %target.display(),
            "Creating symlink"
        );
        std::os::unix::fs::symlink(target, path).map_err(|e| SplatError::fs(path, e))?;
        Ok(true)
    }

    #[cfg(not(unix))]
    fn create_symlink(&self, path: &Path, target: &Path) -> Result<bool> {
        tracing::warn!(
            path = %path.display(),
            target = %target.display(),
            "Symlinks are not supported on this platform, skipping"
        );
        Ok(false)
    }

    fn create_hardlink(
        &self,
        path: &Path,
        target: &Path,
        skipped: &HashSet<PathBuf>,
    ) -> Result<bool> {
        let relative_target = match normalize_entry_path(target) {
            Some(relative) if !relative.as_os_str().is_empty() => relative,
            _ => {
                tracing::warn!(
                    path = %path.display(),
                    target = %target.display(),
                    "Skipping hard link with a target outside the destination"
                );
                return Ok(false);
            }
        };

        if skipped.contains(&relative_target) {
            tracing::debug!(
                path = %path.display(),
                target = %relative_target.display(),
                "Skipping hard link to a skipped entry"
            );
            return Ok(false);
        }

        if self.has_symlinked_parent(&relative_target)? {
            tracing::warn!(
                path = %path.display(),
                target = %relative_target.display(),
                "Skipping hard link to a target below a symlink"
            );
            return Ok(false);
        }

        let source = self.root.join(&relative_target);
        if source == path {
            return Ok(true);
        }

        self.prepare_path(path)?;
        tracing::debug!(
            path = %path.display(),
            target = %source.display(),
            "Creating hard link"
        );
        fs::hard_link(&source, path).map_err(|e| SplatError::fs(path, e))?;
        Ok(true)
    }

    /// Create missing parents of `path` and clear whatever currently sits at `path`.
    fn prepare_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            create_dir_all(parent)?;
        }

        match fs::symlink_metadata(path) {
            Ok(meta) => remove_path(path, &meta).map_err(|e| SplatError::fs(path, e)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SplatError::fs(path, e)),
        }
    }
}

/// Remove a directory with its subtree, or a single non-directory.
/// Symlinks are removed, never followed.
fn remove_path(path: &Path, meta: &fs::Metadata) -> io::Result<()> {
    if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

fn create_dir_all(path: &Path) -> Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }
    builder.create(path).map_err(|e| SplatError::fs(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{gzip, TarBuilder};
    use tempfile::TempDir;

    fn apply(root: &Path, layer: Vec<u8>) -> ApplyStats {
        LayerApplier::new(root).apply(&layer[..]).unwrap()
    }

    #[test]
    fn test_apply_creates_directories_and_files() {
        let tmp = TempDir::new().unwrap();
        let layer = TarBuilder::new()
            .dir("etc")
            .file("etc/hostname", b"splat\n")
            .dir("var/lib/app")
            .finish();

        let stats = apply(tmp.path(), layer);

        assert!(tmp.path().join("var/lib/app").is_dir());
        assert_eq!(
            fs::read_to_string(tmp.path().join("etc/hostname")).unwrap(),
            "splat\n"
        );
        assert_eq!(stats.directories, 2);
        assert_eq!(stats.files, 1);
        assert_eq!(stats.bytes, 6);
    }

    #[test]
    fn test_file_without_directory_entry_creates_parents() {
        let tmp = TempDir::new().unwrap();
        apply(
            tmp.path(),
            TarBuilder::new().file("usr/share/doc/README", b"doc").finish(),
        );
        assert_eq!(
            fs::read(tmp.path().join("usr/share/doc/README")).unwrap(),
            b"doc"
        );
    }

    #[test]
    fn test_directory_entry_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let layer = TarBuilder::new()
            .dir("data")
            .file("data/keep.txt", b"keep")
            .finish();
        apply(tmp.path(), layer);

        // Same directory again must not disturb its contents.
        apply(tmp.path(), TarBuilder::new().dir("data").finish());

        assert!(tmp.path().join("data").is_dir());
        assert_eq!(
            fs::read(tmp.path().join("data/keep.txt")).unwrap(),
            b"keep"
        );
    }

    #[test]
    fn test_regular_file_overwrites_not_appends() {
        let tmp = TempDir::new().unwrap();
        let layer = || {
            TarBuilder::new()
                .file("config.txt", b"short")
                .finish()
        };
        apply(
            tmp.path(),
            TarBuilder::new()
                .file("config.txt", b"a much longer previous version")
                .finish(),
        );
        apply(tmp.path(), layer());
        apply(tmp.path(), layer());

        assert_eq!(fs::read(tmp.path().join("config.txt")).unwrap(), b"short");
    }

    #[cfg(unix)]
    #[test]
    fn test_regular_file_permission_bits() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        apply(
            tmp.path(),
            TarBuilder::new()
                .file_with_mode("bin/tool", b"#!/bin/sh\n", 0o755)
                .file_with_mode("etc/secret", b"s", 0o600)
                .finish(),
        );

        let mode = |p: &str| {
            fs::metadata(tmp.path().join(p))
                .unwrap()
                .permissions()
                .mode()
                & 0o777
        };
        assert_eq!(mode("bin/tool"), 0o755);
        assert_eq!(mode("etc/secret"), 0o600);
    }

    #[test]
    fn test_whiteout_removes_file() {
        let tmp = TempDir::new().unwrap();
        apply(
            tmp.path(),
            TarBuilder::new()
                .dir("a")
                .file("a/b.txt", b"b")
                .file("a/c.txt", b"c")
                .finish(),
        );

        let stats = apply(tmp.path(), TarBuilder::new().whiteout("a", "b.txt").finish());

        assert!(!tmp.path().join("a/b.txt").exists());
        assert!(tmp.path().join("a/c.txt").exists());
        assert!(!tmp.path().join("a/.wh.b.txt").exists());
        assert_eq!(stats.whiteouts, 1);
        assert_eq!(stats.files, 0);
    }

    #[test]
    fn test_whiteout_removes_directory_subtree() {
        let tmp = TempDir::new().unwrap();
        apply(
            tmp.path(),
            TarBuilder::new()
                .dir("opt/app/lib")
                .file("opt/app/lib/x.so", b"x")
                .file("opt/other", b"o")
                .finish(),
        );

        apply(tmp.path(), TarBuilder::new().whiteout("opt", "app").finish());

        assert!(!tmp.path().join("opt/app").exists());
        assert!(tmp.path().join("opt/other").exists());
    }

    #[test]
    fn test_whiteout_of_absent_path_is_noop() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("unrelated"), "u").unwrap();

        let stats = apply(
            tmp.path(),
            TarBuilder::new().whiteout("nowhere", "ghost").finish(),
        );

        assert_eq!(stats.whiteouts, 1);
        assert!(tmp.path().join("unrelated").exists());
        assert!(!tmp.path().join("nowhere").exists());
    }

    #[test]
    fn test_whiteout_keeps_emptied_parent() {
        let tmp = TempDir::new().unwrap();
        apply(
            tmp.path(),
            TarBuilder::new().dir("a").file("a/b.txt", b"b").finish(),
        );
        apply(tmp.path(), TarBuilder::new().whiteout("a", "b.txt").finish());

        assert!(!tmp.path().join("a/b.txt").exists());
        assert!(tmp.path().join("a").is_dir());
        assert_eq!(fs::read_dir(tmp.path().join("a")).unwrap().count(), 0);
    }

    #[test]
    fn test_opaque_whiteout_clears_lower_layers_only() {
        let tmp = TempDir::new().unwrap();
        apply(
            tmp.path(),
            TarBuilder::new()
                .dir("etc/conf.d")
                .file("etc/conf.d/old.conf", b"old")
                .dir("etc/conf.d/legacy")
                .file("etc/conf.d/legacy/x", b"x")
                .finish(),
        );

        apply(
            tmp.path(),
            TarBuilder::new()
                .dir("etc/conf.d")
                .file("etc/conf.d/new.conf", b"new")
                .opaque("etc/conf.d")
                .finish(),
        );

        let conf = tmp.path().join("etc/conf.d");
        assert!(conf.is_dir());
        assert!(conf.join("new.conf").exists());
        assert!(!conf.join("old.conf").exists());
        assert!(!conf.join("legacy").exists());
        assert!(!conf.join(OPAQUE_WHITEOUT).exists());
    }

    #[test]
    fn test_opaque_whiteout_clears_redeclared_subdirectory() {
        let tmp = TempDir::new().unwrap();
        apply(
            tmp.path(),
            TarBuilder::new()
                .dir("etc/conf.d/sub")
                .file("etc/conf.d/sub/old", b"old")
                .finish(),
        );

        apply(
            tmp.path(),
            TarBuilder::new()
                .dir("etc/conf.d")
                .dir("etc/conf.d/sub")
                .file("etc/conf.d/sub/new", b"new")
                .opaque("etc/conf.d")
                .finish(),
        );

        let sub = tmp.path().join("etc/conf.d/sub");
        assert!(sub.is_dir());
        assert!(!sub.join("old").exists());
        assert_eq!(fs::read(sub.join("new")).unwrap(), b"new");
    }

    #[test]
    fn test_opaque_whiteout_keeps_implicit_parents_of_new_files() {
        let tmp = TempDir::new().unwrap();
        apply(
            tmp.path(),
            TarBuilder::new()
                .file("opt/app/lib/old.so", b"old")
                .file("opt/app/stale", b"stale")
                .finish(),
        );

        apply(
            tmp.path(),
            TarBuilder::new()
                .file("opt/app/lib/new.so", b"new")
                .opaque("opt/app")
                .finish(),
        );

        let app = tmp.path().join("opt/app");
        assert!(app.join("lib/new.so").exists());
        assert!(!app.join("lib/old.so").exists());
        assert!(!app.join("stale").exists());
    }

    #[test]
    fn test_untouched_destination_files_survive() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("home")).unwrap();
        fs::write(tmp.path().join("home/notes.txt"), "mine").unwrap();
        fs::write(tmp.path().join("top.txt"), "top").unwrap();

        apply(
            tmp.path(),
            TarBuilder::new()
                .dir("home")
                .dir("srv")
                .file("srv/index.html", b"<html/>")
                .finish(),
        );

        assert_eq!(
            fs::read_to_string(tmp.path().join("home/notes.txt")).unwrap(),
            "mine"
        );
        assert_eq!(fs::read_to_string(tmp.path().join("top.txt")).unwrap(), "top");
        assert!(tmp.path().join("srv/index.html").exists());
    }

    #[test]
    fn test_escaping_paths_are_skipped() {
        let outer = TempDir::new().unwrap();
        let root = outer.path().join("root");
        fs::create_dir(&root).unwrap();

        let stats = apply(
            &root,
            TarBuilder::new()
                .raw_file("../escaped.txt", b"nope")
                .raw_file("/abs.txt", b"rooted")
                .finish(),
        );

        assert!(!outer.path().join("escaped.txt").exists());
        assert_eq!(stats.skipped, 1);
        // Absolute names land inside the root.
        assert_eq!(fs::read(root.join("abs.txt")).unwrap(), b"rooted");
    }

    #[test]
    fn test_unsupported_entries_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let stats = apply(
            tmp.path(),
            TarBuilder::new().fifo("run/initctl").file("ok", b"1").finish(),
        );

        assert_eq!(stats.skipped, 1);
        assert!(!tmp.path().join("run/initctl").exists());
        assert!(tmp.path().join("ok").exists());
    }

    #[test]
    fn test_hardlink_shares_content() {
        let tmp = TempDir::new().unwrap();
        let stats = apply(
            tmp.path(),
            TarBuilder::new()
                .file("usr/bin/python3.12", b"py")
                .hardlink("usr/bin/python3", "usr/bin/python3.12")
                .finish(),
        );

        assert_eq!(stats.hardlinks, 1);
        assert_eq!(fs::read(tmp.path().join("usr/bin/python3")).unwrap(), b"py");
    }

    #[test]
    fn test_hardlink_to_missing_target_fails() {
        let tmp = TempDir::new().unwrap();
        let layer = TarBuilder::new().hardlink("b", "missing").finish();
        let result = LayerApplier::new(tmp.path()).apply(&layer[..]);
        assert!(matches!(result, Err(SplatError::FileSystemError { .. })));
    }

    #[test]
    fn test_hardlink_to_skipped_entry_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let stats = apply(
            tmp.path(),
            TarBuilder::new()
                .fifo("run/ctl")
                .hardlink("run/ctl2", "run/ctl")
                .file("after", b"after")
                .finish(),
        );

        assert_eq!(stats.skipped, 2);
        assert_eq!(stats.hardlinks, 0);
        assert!(!tmp.path().join("run/ctl2").exists());
        assert_eq!(fs::read(tmp.path().join("after")).unwrap(), b"after");
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_created_verbatim() {
        let tmp = TempDir::new().unwrap();
        let stats = apply(
            tmp.path(),
            TarBuilder::new()
                .dir("etc")
                .symlink("etc/localtime", "/usr/share/zoneinfo/UTC")
                .finish(),
        );

        assert_eq!(stats.symlinks, 1);
        assert_eq!(
            fs::read_link(tmp.path().join("etc/localtime")).unwrap(),
            PathBuf::from("/usr/share/zoneinfo/UTC")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_writes_below_symlink_are_skipped() {
        let outer = TempDir::new().unwrap();
        let root = outer.path().join("root");
        let outside = outer.path().join("outside");
        fs::create_dir(&root).unwrap();
        fs::create_dir(&outside).unwrap();
        fs::write(outside.join("victim"), "safe").unwrap();

        let stats = apply(
            &root,
            TarBuilder::new()
                .symlink("evil", outside.to_str().unwrap())
                .file("evil/planted", b"bad")
                .whiteout("evil", "victim")
                .finish(),
        );

        assert_eq!(stats.skipped, 2);
        assert!(!outside.join("planted").exists());
        assert_eq!(fs::read_to_string(outside.join("victim")).unwrap(), "safe");
    }

    #[cfg(unix)]
    #[test]
    fn test_file_replaces_symlink_instead_of_following_it() {
        let outer = TempDir::new().unwrap();
        let root = outer.path().join("root");
        fs::create_dir(&root).unwrap();
        let outside = outer.path().join("target.txt");
        fs::write(&outside, "untouched").unwrap();

        apply(
            &root,
            TarBuilder::new()
                .symlink("link.txt", outside.to_str().unwrap())
                .finish(),
        );
        apply(&root, TarBuilder::new().file("link.txt", b"real").finish());

        assert!(!fs::symlink_metadata(root.join("link.txt"))
            .unwrap()
            .file_type()
            .is_symlink());
        assert_eq!(fs::read(root.join("link.txt")).unwrap(), b"real");
        assert_eq!(fs::read_to_string(&outside).unwrap(), "untouched");
    }

    #[test]
    fn test_directory_replaces_file() {
        let tmp = TempDir::new().unwrap();
        apply(tmp.path(), TarBuilder::new().file("thing", b"file").finish());
        apply(
            tmp.path(),
            TarBuilder::new().dir("thing").file("thing/inner", b"i").finish(),
        );
        assert!(tmp.path().join("thing").is_dir());
        assert!(tmp.path().join("thing/inner").exists());
    }

    #[test]
    fn test_corrupt_layer_fails() {
        let tmp = TempDir::new().unwrap();
        let result = LayerApplier::new(tmp.path()).apply(&[b'Z'; 512][..]);
        assert!(matches!(result, Err(SplatError::CorruptArchive(_))));
    }

    #[test]
    fn test_gzip_layer_through_decompress() {
        let tmp = TempDir::new().unwrap();
        let layer = gzip(&TarBuilder::new().file("z.txt", b"zipped").finish());
        let reader = crate::archive::decompress(&layer[..]).unwrap();
        LayerApplier::new(tmp.path()).apply(reader).unwrap();
        assert_eq!(fs::read(tmp.path().join("z.txt")).unwrap(), b"zipped");
    }
}
