//! # Archive Writer
//!
//! Packs one source file into a single-entry tar stream wrapped in zlib
//! (DEFLATE) framing and stores it as `{root}/{key}-{purpose}.tar.gz`.
//!
//! ## Write protocol
//!
//! 1. Open the source and read its size and mode.
//! 2. Take the per-archive write lock.
//! 3. Stream into `tmp/{name}.{uuid}.partial`, closing the tar writer
//!    before the compressor so the tar trailer is compressed too.
//! 4. `fsync` and rename over the destination. Readers see either the old
//!    archive or the new one, never a torn write.
//! 5. Run the caller's commit hook, still under the lock.
//! 6. Release the lock and delete the source.
//!
//! A failure at any step removes the partial file. The source file is
//! removed on every exit path once this module has opened it: the writer
//! owns it from that point on.

use std::fs::{self, File, Metadata, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use plateau_core::{AssetKey, Purpose};
use tar::{EntryType, Header};
use uuid::Uuid;

use crate::error::ArchiveError;
use crate::store::{ArchiveStore, PARTIAL_EXT};

/// Result of a successful archive write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedAsset {
    /// Committed archive path.
    pub path: PathBuf,
    /// Uncompressed size of the archived file.
    pub source_bytes: u64,
    /// Size of the archive on disk.
    pub archive_bytes: u64,
}

impl ArchiveStore {
    /// Archive `source` under `key` and a raw purpose tag.
    ///
    /// The tag is validated before anything touches the filesystem: an
    /// unknown tag fails with `UnsupportedPurpose` and leaves both the
    /// source and the archive root untouched.
    pub fn archive_tagged(
        &self,
        source: &Path,
        key: &AssetKey,
        tag: &str,
    ) -> Result<ArchivedAsset, ArchiveError> {
        let purpose: Purpose = tag.parse()?;
        self.archive(source, key, purpose)
    }

    /// Archive `source` under `key` and `purpose`, replacing any existing
    /// archive for the pair.
    pub fn archive(
        &self,
        source: &Path,
        key: &AssetKey,
        purpose: Purpose,
    ) -> Result<ArchivedAsset, ArchiveError> {
        self.archive_then(source, key, purpose, |_| ())
            .map(|(archived, ())| archived)
    }

    /// Archive `source` as [`ArchiveStore::archive`] does, then run
    /// `on_commit` before the write lock is released.
    ///
    /// Callers that keep state describing the archive update it in
    /// `on_commit`, so concurrent writers of one archive apply their updates
    /// in the same order as their commits. `on_commit` does not run if the
    /// write fails.
    pub fn archive_then<T>(
        &self,
        source: &Path,
        key: &AssetKey,
        purpose: Purpose,
        on_commit: impl FnOnce(&ArchivedAsset) -> T,
    ) -> Result<(ArchivedAsset, T), ArchiveError> {
        let _consumed = ConsumedSource(source);

        let (mut src, meta) = open_source(source)?;
        self.ensure_layout()?;

        let name = purpose.archive_file_name(key);
        let dest = self.root().join(&name);

        self.locks.with(&name, || -> Result<(ArchivedAsset, T), ArchiveError> {
            let partial_path = self
                .tmp_dir()
                .join(format!("{name}.{}.{PARTIAL_EXT}", Uuid::new_v4()));
            let partial = PartialArchive::create(partial_path)?;

            let mut header = Header::new_gnu();
            header.set_entry_type(EntryType::Regular);
            header.set_size(meta.len());
            header.set_mode(file_mode(&meta));
            header.set_mtime(mtime_secs(&meta));

            let storage_err = |source: io::Error| ArchiveError::StorageUnavailable {
                path: dest.clone(),
                source,
            };

            let encoder =
                ZlibEncoder::new(partial.file().map_err(storage_err)?, Compression::fast());
            let mut builder = tar::Builder::new(encoder);
            builder
                .append_data(&mut header, &name, &mut src)
                .map_err(storage_err)?;
            let encoder = builder.into_inner().map_err(storage_err)?;
            let file = encoder.finish().map_err(storage_err)?;
            file.sync_all().map_err(storage_err)?;
            let archive_bytes = file.metadata().map_err(storage_err)?.len();
            drop(file);

            partial.commit(&dest).map_err(storage_err)?;
            sync_dir(self.root());

            tracing::info!(
                %key,
                %purpose,
                source_bytes = meta.len(),
                archive_bytes,
                "archive written"
            );

            let archived = ArchivedAsset {
                path: dest.clone(),
                source_bytes: meta.len(),
                archive_bytes,
            };
            let out = on_commit(&archived);
            Ok((archived, out))
        })
    }
}

fn open_source(source: &Path) -> Result<(File, Metadata), ArchiveError> {
    let missing = |e: io::Error| ArchiveError::SourceMissing {
        path: source.to_path_buf(),
        source: e,
    };
    let file = File::open(source).map_err(missing)?;
    let meta = file.metadata().map_err(missing)?;
    if !meta.is_file() {
        return Err(missing(io::Error::new(
            io::ErrorKind::InvalidInput,
            "not a regular file",
        )));
    }
    Ok((file, meta))
}

/// Deletes the source file when dropped.
struct ConsumedSource<'a>(&'a Path);

impl Drop for ConsumedSource<'_> {
    fn drop(&mut self) {
        match fs::remove_file(self.0) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.0.display(), error = %e, "failed to remove archived source");
            }
        }
    }
}

/// An in-flight archive file, deleted on drop unless committed.
struct PartialArchive {
    path: PathBuf,
    committed: bool,
}

impl PartialArchive {
    fn create(path: PathBuf) -> Result<Self, ArchiveError> {
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|source| ArchiveError::StorageUnavailable {
                path: path.clone(),
                source,
            })?;
        Ok(Self {
            path,
            committed: false,
        })
    }

    fn file(&self) -> io::Result<File> {
        OpenOptions::new().write(true).open(&self.path)
    }

    fn commit(mut self, dest: &Path) -> io::Result<()> {
        fs::rename(&self.path, dest)?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for PartialArchive {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to remove partial archive");
            }
        }
    }
}

#[cfg(unix)]
fn file_mode(meta: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn file_mode(meta: &Metadata) -> u32 {
    if meta.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}

fn mtime_secs(meta: &Metadata) -> u64 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |d| d.as_secs())
}

/// Persist a rename in `dir`. Best effort: not every platform can fsync a
/// directory handle.
fn sync_dir(dir: &Path) {
    if !cfg!(unix) {
        return;
    }
    if let Err(e) = File::open(dir).and_then(|d| d.sync_all()) {
        tracing::debug!(dir = %dir.display(), error = %e, "directory fsync failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    use flate2::read::ZlibDecoder;

    fn key(subject: &str) -> AssetKey {
        AssetKey::derive(subject).unwrap()
    }

    fn staged(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn writes_single_entry_zlib_tar_and_removes_source() {
        let staging = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let store = ArchiveStore::new(root.path());
        let source = staged(staging.path(), "upload.jpg", b"fake jpeg bytes");

        let archived = store
            .archive(&source, &key("Jane Doe"), Purpose::ProfilePicture)
            .unwrap();

        assert_eq!(
            archived.path,
            root.path().join("jane_doe-profile_picture.tar.gz")
        );
        assert_eq!(archived.source_bytes, 15);
        assert!(!source.exists());

        let file = File::open(&archived.path).unwrap();
        assert_eq!(file.metadata().unwrap().len(), archived.archive_bytes);
        let mut archive = tar::Archive::new(ZlibDecoder::new(file));
        let mut entries = archive.entries().unwrap();
        let mut entry = entries.next().unwrap().unwrap();
        assert_eq!(
            entry.path().unwrap().to_str(),
            Some("jane_doe-profile_picture.tar.gz")
        );
        assert!(entry.header().entry_type().is_file());
        let mut body = Vec::new();
        entry.read_to_end(&mut body).unwrap();
        assert_eq!(body, b"fake jpeg bytes");
        drop(entry);
        assert!(entries.next().is_none());
    }

    #[test]
    fn unknown_tag_touches_nothing() {
        let staging = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let archive_root = root.path().join("archives");
        let store = ArchiveStore::new(&archive_root);
        let source = staged(staging.path(), "upload.jpg", b"bytes");

        let err = store
            .archive_tagged(&source, &key("jane"), "unknown_tag")
            .unwrap_err();

        assert_eq!(err.kind(), "unsupported_purpose");
        assert!(source.exists());
        assert!(!archive_root.exists());
    }

    #[test]
    fn missing_source_is_reported() {
        let root = tempfile::tempdir().unwrap();
        let store = ArchiveStore::new(root.path());
        let err = store
            .archive(
                &root.path().join("nope.jpg"),
                &key("jane"),
                Purpose::ProfilePicture,
            )
            .unwrap_err();
        assert!(matches!(err, ArchiveError::SourceMissing { .. }));
        assert!(!store
            .archive_path(&key("jane"), Purpose::ProfilePicture)
            .exists());
    }

    #[test]
    fn unwritable_root_is_storage_unavailable_and_source_removed() {
        let staging = tempfile::tempdir().unwrap();
        let blocker = staged(staging.path(), "not-a-dir", b"");
        let store = ArchiveStore::new(blocker.join("archives"));
        let source = staged(staging.path(), "upload.jpg", b"bytes");

        let err = store
            .archive(&source, &key("jane"), Purpose::ProfilePicture)
            .unwrap_err();

        assert!(matches!(err, ArchiveError::StorageUnavailable { .. }));
        assert!(!source.exists());
    }

    #[test]
    fn rewrite_replaces_previous_archive_and_leaves_no_partials() {
        let staging = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let store = ArchiveStore::new(root.path());
        let k = key("jane");

        let first = staged(staging.path(), "a.jpg", b"first");
        store.archive(&first, &k, Purpose::ProfilePicture).unwrap();
        let second = staged(staging.path(), "b.jpg", b"second version");
        let archived = store.archive(&second, &k, Purpose::ProfilePicture).unwrap();

        assert_eq!(archived.source_bytes, 14);
        assert_eq!(fs::read_dir(store.tmp_dir()).unwrap().count(), 0);
    }

    #[test]
    fn commit_hook_sees_committed_archive() {
        let staging = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let store = ArchiveStore::new(root.path());
        let source = staged(staging.path(), "upload.jpg", b"pixels");

        let (archived, seen) = store
            .archive_then(&source, &key("jane"), Purpose::ProfilePicture, |a| {
                a.path.is_file()
            })
            .unwrap();
        assert!(seen);
        assert!(archived.path.is_file());
    }

    #[test]
    fn commit_hook_skipped_on_failure() {
        let root = tempfile::tempdir().unwrap();
        let store = ArchiveStore::new(root.path());
        let mut ran = false;
        let err = store
            .archive_then(
                &root.path().join("nope.jpg"),
                &key("jane"),
                Purpose::ProfilePicture,
                |_| ran = true,
            )
            .unwrap_err();
        assert!(matches!(err, ArchiveError::SourceMissing { .. }));
        assert!(!ran);
    }

    #[test]
    fn partial_archive_is_removed_unless_committed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.partial");
        drop(PartialArchive::create(path.clone()).unwrap());
        assert!(!path.exists());

        let dest = dir.path().join("x.tar.gz");
        PartialArchive::create(path.clone())
            .unwrap()
            .commit(&dest)
            .unwrap();
        assert!(dest.exists());
        assert!(!path.exists());
    }
}
