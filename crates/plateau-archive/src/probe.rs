//! # Dimension and Type Probe
//!
//! Two independent inspections of a file on disk:
//!
//! - [`sniff_content_type`] reads at most the first [`SNIFF_LEN`] bytes and
//!   maps their signature to a media type. It never fails on content, only
//!   on I/O.
//! - [`image_dimensions`] decodes just enough of the image header to learn
//!   its width and height, and fails with `UnsupportedImageFormat` for
//!   anything that is not a decodable image.
//!
//! A file can therefore have a content type without having dimensions.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use image::ImageReader;

use crate::error::ArchiveError;

/// Bytes examined when sniffing a content type.
pub const SNIFF_LEN: usize = 512;

/// Fallback for binary content with no recognized signature.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Media type for text without a recognized signature.
pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Pixel dimensions of a decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Content type and dimensions of an image file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub content_type: &'static str,
    pub dimensions: Dimensions,
}

/// Sniff `path`'s content type and decode its dimensions.
///
/// Fails with `UnsupportedImageFormat` when the file is not an image; call
/// [`sniff_content_type`] alone when only the type is needed.
pub fn probe(path: &Path) -> Result<ProbeReport, ArchiveError> {
    let content_type = sniff_content_type(path)?;
    let dimensions = image_dimensions(path)?;
    Ok(ProbeReport {
        content_type,
        dimensions,
    })
}

/// Media type of `path` inferred from its leading bytes.
pub fn sniff_content_type(path: &Path) -> Result<&'static str, ArchiveError> {
    let unreadable = |source: io::Error| ArchiveError::UnreadableFile {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(unreadable)?;
    let mut head = Vec::with_capacity(SNIFF_LEN);
    file.take(SNIFF_LEN as u64)
        .read_to_end(&mut head)
        .map_err(unreadable)?;
    Ok(detect_content_type(&head))
}

/// Media type for a buffer holding the start of a file.
pub fn detect_content_type(head: &[u8]) -> &'static str {
    let head = &head[..head.len().min(SNIFF_LEN)];

    if let Ok(format) = image::guess_format(head) {
        return format.to_mime_type();
    }

    const SIGNATURES: &[(&[u8], &str)] = &[
        (b"%PDF-", "application/pdf"),
        (b"PK\x03\x04", "application/zip"),
        (b"\x1f\x8b\x08", "application/x-gzip"),
        (b"<?xml", "text/xml; charset=utf-8"),
    ];
    if let Some((_, mime)) = SIGNATURES.iter().find(|(sig, _)| head.starts_with(sig)) {
        return *mime;
    }

    if head.iter().any(|&b| is_binary_byte(b)) {
        OCTET_STREAM
    } else {
        TEXT_PLAIN
    }
}

/// Control bytes that do not appear in text.
fn is_binary_byte(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0b | 0x0e..=0x1a | 0x1c..=0x1f)
}

/// Width and height of the image at `path`, read from its header.
pub fn image_dimensions(path: &Path) -> Result<Dimensions, ArchiveError> {
    let unreadable = |source: io::Error| ArchiveError::UnreadableFile {
        path: path.to_path_buf(),
        source,
    };
    let unsupported = |reason: String| ArchiveError::UnsupportedImageFormat {
        path: path.to_path_buf(),
        reason,
    };

    let reader = ImageReader::open(path)
        .map_err(unreadable)?
        .with_guessed_format()
        .map_err(unreadable)?;
    if reader.format().is_none() {
        return Err(unsupported("unrecognized image signature".to_string()));
    }
    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| unsupported(e.to_string()))?;
    Ok(Dimensions { width, height })
}
