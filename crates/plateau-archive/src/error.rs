//! # Archive Error Types
//!
//! Every filesystem failure carries the path it concerns and the underlying
//! `std::io::Error` as its source, so callers can log full context while
//! reporting only [`ArchiveError::kind`] outward.

use std::path::PathBuf;

use plateau_core::CoreError;
use thiserror::Error;

/// Error raised by archive writing, extraction, or probing.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Key, purpose tag, or other input failed validation.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The source file to archive could not be opened.
    #[error("source file {path:?} is missing or unreadable")]
    SourceMissing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The archive root could not be created or written.
    #[error("archive storage unavailable at {path:?}")]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No archive exists for the requested key and purpose.
    #[error("archive {path:?} not found")]
    ArchiveNotFound { path: PathBuf },

    /// The archive could not be decompressed or its tar stream is malformed.
    #[error("archive {path:?} is corrupt: {reason}")]
    CorruptArchive { path: PathBuf, reason: String },

    /// Writing the reconstructed file failed.
    #[error("failed to write extracted file {path:?}")]
    ExtractIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file handed to the probe could not be read.
    #[error("cannot read {path:?} for probing")]
    UnreadableFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not an image format the probe can decode.
    #[error("{path:?} is not a supported image: {reason}")]
    UnsupportedImageFormat { path: PathBuf, reason: String },
}

impl ArchiveError {
    /// Stable machine-readable name of the error kind, suitable for metric
    /// labels and client-facing codes.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Core(e) => e.kind(),
            Self::SourceMissing { .. } => "source_missing",
            Self::StorageUnavailable { .. } => "storage_unavailable",
            Self::ArchiveNotFound { .. } => "archive_not_found",
            Self::CorruptArchive { .. } => "corrupt_archive",
            Self::ExtractIo { .. } => "extract_io",
            Self::UnreadableFile { .. } => "unreadable_file",
            Self::UnsupportedImageFormat { .. } => "unsupported_image_format",
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self::CorruptArchive {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
