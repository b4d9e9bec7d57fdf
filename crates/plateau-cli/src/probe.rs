//! `plateau probe` — content type and image dimensions of a file.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde_json::json;

use plateau_archive::{image_dimensions, sniff_content_type, ArchiveError};

#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// File to inspect.
    pub path: PathBuf,

    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Exits 0 for a decodable image and 2 for any other readable file.
pub fn run_probe(args: &ProbeArgs) -> Result<u8> {
    let content_type = sniff_content_type(&args.path)?;
    let dimensions = match image_dimensions(&args.path) {
        Ok(d) => Some(d),
        Err(ArchiveError::UnsupportedImageFormat { reason, .. }) => {
            tracing::debug!(%reason, "not a decodable image");
            None
        }
        Err(e) => return Err(e.into()),
    };

    if args.json {
        let report = json!({
            "path": args.path.display().to_string(),
            "content_type": content_type,
            "width": dimensions.map(|d| d.width),
            "height": dimensions.map(|d| d.height),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", args.path.display());
        println!("  content type: {content_type}");
        match dimensions {
            Some(d) => println!("  dimensions:   {}x{}", d.width, d.height),
            None => println!("  dimensions:   not an image"),
        }
    }

    Ok(if dimensions.is_some() { 0 } else { 2 })
}
