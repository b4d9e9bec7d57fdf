//! # plateau-archive — Archive Engine
//!
//! Stores each uploaded asset as a single-entry tar stream inside zlib
//! (DEFLATE) framing, at a path derived from its [`AssetKey`] and
//! [`Purpose`], and reconstructs it on demand into a scratch file that is
//! deleted when its handle drops.
//!
//! | Module     | Responsibility                                          |
//! |------------|---------------------------------------------------------|
//! | [`store`]  | Root layout, removal, startup sweep, writability check  |
//! | [`writer`] | Atomic archive writes with per-archive locking          |
//! | [`reader`] | Extraction into [`ExtractedFile`] scratch handles       |
//! | [`probe`]  | Content-type sniffing and image dimension decoding      |
//!
//! All operations are blocking. Async callers run them on a blocking pool.
//!
//! [`AssetKey`]: plateau_core::AssetKey
//! [`Purpose`]: plateau_core::Purpose

pub mod error;
pub mod locks;
pub mod probe;
pub mod reader;
pub mod store;
pub mod writer;

pub use error::ArchiveError;
pub use probe::{detect_content_type, image_dimensions, probe, sniff_content_type, Dimensions, ProbeReport};
pub use reader::ExtractedFile;
pub use store::{ArchiveStore, SweepSummary};
pub use writer::ArchivedAsset;
