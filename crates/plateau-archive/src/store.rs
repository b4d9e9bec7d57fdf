//! # Archive Store Layout
//!
//! ```text
//! {root}/
//!   {key}-{purpose}.tar.gz          committed archives
//!   tmp/{name}.{uuid}.partial       in-flight writes, renamed into place
//!   extracted/{uuid}/{file}         transient extractions, one dir each
//! ```
//!
//! Committed archive names always end in `-{purpose}.tar.gz`, so they can
//! never collide with the `tmp` and `extracted` directories.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use plateau_core::{AssetKey, Purpose};

use crate::error::ArchiveError;
use crate::locks::KeyedLocks;

const TMP_DIR: &str = "tmp";
const EXTRACTED_DIR: &str = "extracted";

/// Extension of in-flight archive files.
pub const PARTIAL_EXT: &str = "partial";

/// Handle to an archive root directory.
///
/// Cloning is cheap; clones share the same write locks. Writes and removals
/// of one archive are serialized on its lock.
#[derive(Debug, Clone)]
pub struct ArchiveStore {
    root: PathBuf,
    pub(crate) locks: KeyedLocks,
}

/// What [`ArchiveStore::sweep`] removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub partials_removed: u64,
    pub extractions_removed: u64,
}

impl ArchiveStore {
    /// Handle to `root`. Nothing is created until the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: KeyedLocks::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the archive for `key` under `purpose`, whether or not it exists.
    pub fn archive_path(&self, key: &AssetKey, purpose: Purpose) -> PathBuf {
        self.root.join(purpose.archive_file_name(key))
    }

    /// Delete the archive for `key` under `purpose` if `claim` agrees.
    ///
    /// `claim` runs under the archive's write lock, before the file is
    /// touched. Returning `None` leaves the archive in place and yields
    /// `Ok(None)`. Otherwise the archive is deleted and the claimed value is
    /// returned with whether there was a file to delete. A writer of the same
    /// archive cannot commit between the claim and the delete.
    pub fn remove_if<T>(
        &self,
        key: &AssetKey,
        purpose: Purpose,
        claim: impl FnOnce() -> Option<T>,
    ) -> Result<Option<(T, bool)>, ArchiveError> {
        let name = purpose.archive_file_name(key);
        self.locks.with(&name, || {
            let Some(claimed) = claim() else {
                return Ok(None);
            };
            let path = self.root.join(&name);
            match fs::remove_file(&path) {
                Ok(()) => {
                    tracing::info!(%key, %purpose, "archive removed");
                    Ok(Some((claimed, true)))
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Some((claimed, false))),
                Err(source) => Err(ArchiveError::StorageUnavailable { path, source }),
            }
        })
    }

    /// Create the root and its working directories if missing.
    pub fn ensure_layout(&self) -> Result<(), ArchiveError> {
        for dir in [self.root.clone(), self.tmp_dir(), self.extracted_dir()] {
            fs::create_dir_all(&dir)
                .map_err(|source| ArchiveError::StorageUnavailable { path: dir, source })?;
        }
        Ok(())
    }

    /// Remove leftovers of interrupted writes and extractions.
    ///
    /// Intended for startup, before any request is served: it does not take
    /// write locks and would delete live in-flight files.
    pub fn sweep(&self) -> Result<SweepSummary, ArchiveError> {
        self.ensure_layout()?;
        let mut summary = SweepSummary::default();

        let tmp = self.tmp_dir();
        for entry in read_dir(&tmp)? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == PARTIAL_EXT) {
                fs::remove_file(&path)
                    .map_err(|source| ArchiveError::StorageUnavailable { path, source })?;
                summary.partials_removed += 1;
            }
        }

        let extracted = self.extracted_dir();
        for entry in read_dir(&extracted)? {
            let path = entry.path();
            let removed = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            removed.map_err(|source| ArchiveError::StorageUnavailable { path, source })?;
            summary.extractions_removed += 1;
        }

        if summary != SweepSummary::default() {
            tracing::info!(
                partials = summary.partials_removed,
                extractions = summary.extractions_removed,
                "swept stale archive work files"
            );
        }
        Ok(summary)
    }

    /// Check that the root is writable by creating and removing a probe file.
    pub fn check_writable(&self) -> Result<(), ArchiveError> {
        self.ensure_layout()?;
        let probe = self
            .tmp_dir()
            .join(format!("ready.{}.{PARTIAL_EXT}", uuid::Uuid::new_v4()));
        fs::write(&probe, b"")
            .and_then(|()| fs::remove_file(&probe))
            .map_err(|source| ArchiveError::StorageUnavailable { path: probe, source })
    }

    pub(crate) fn tmp_dir(&self) -> PathBuf {
        self.root.join(TMP_DIR)
    }

    pub(crate) fn extracted_dir(&self) -> PathBuf {
        self.root.join(EXTRACTED_DIR)
    }
}

fn read_dir(dir: &Path) -> Result<Vec<fs::DirEntry>, ArchiveError> {
    fs::read_dir(dir)
        .and_then(|entries| entries.collect::<io::Result<Vec<_>>>())
        .map_err(|source| ArchiveError::StorageUnavailable {
            path: dir.to_path_buf(),
            source,
        })
}
