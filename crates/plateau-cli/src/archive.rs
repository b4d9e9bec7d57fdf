//! `plateau archive` and `plateau extract`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use plateau_archive::ArchiveStore;
use plateau_core::{AssetKey, Purpose};

/// Archive a file under a subject and purpose.
#[derive(Args, Debug)]
pub struct ArchiveArgs {
    /// Archive root directory.
    #[arg(long)]
    pub root: PathBuf,

    /// File to archive. Removed once archived, or on failure.
    #[arg(long)]
    pub source: PathBuf,

    /// Subject name the asset key is derived from.
    #[arg(long)]
    pub subject: String,

    /// Purpose tag (e.g., profile_picture).
    #[arg(long)]
    pub purpose: String,
}

/// Extract an archived file.
#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Archive root directory.
    #[arg(long)]
    pub root: PathBuf,

    /// Subject name the asset key is derived from.
    #[arg(long)]
    pub subject: String,

    /// Purpose tag (e.g., profile_picture).
    #[arg(long)]
    pub purpose: String,

    /// Destination file, or an existing directory to place the file in.
    #[arg(long)]
    pub out: PathBuf,
}

pub fn run_archive(args: &ArchiveArgs) -> Result<u8> {
    let key = AssetKey::derive(&args.subject)?;

    let store = ArchiveStore::new(&args.root);
    let archived = store
        .archive_tagged(&args.source, &key, &args.purpose)
        .with_context(|| format!("archiving {}", args.source.display()))?;

    tracing::info!(key = %key, purpose = %args.purpose, "archived");
    println!("{}", archived.path.display());
    println!(
        "  {} bytes -> {} bytes",
        archived.source_bytes, archived.archive_bytes
    );
    Ok(0)
}

pub fn run_extract(args: &ExtractArgs) -> Result<u8> {
    let purpose: Purpose = args.purpose.parse()?;
    let key = AssetKey::derive(&args.subject)?;

    let store = ArchiveStore::new(&args.root);
    let extracted = store
        .extract(&key, purpose)
        .with_context(|| format!("extracting {key} ({purpose})"))?;

    let dest = resolve_destination(&args.out, extracted.file_name());
    let bytes = extracted
        .copy_to(&dest)
        .with_context(|| format!("writing {}", dest.display()))?;

    println!("{}", dest.display());
    println!("  {bytes} bytes");
    Ok(0)
}

fn resolve_destination(out: &Path, file_name: &str) -> PathBuf {
    if out.is_dir() {
        out.join(file_name)
    } else {
        out.to_path_buf()
    }
}
