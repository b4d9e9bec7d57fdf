//! `plateau key` — asset key and archive file name for a subject.

use anyhow::Result;
use clap::Args;

use plateau_core::{AssetKey, Purpose};

#[derive(Args, Debug)]
pub struct KeyArgs {
    /// Subject name.
    pub subject: String,

    /// Also print the archive file name for this purpose tag.
    #[arg(long)]
    pub purpose: Option<String>,
}

pub fn run_key(args: &KeyArgs) -> Result<u8> {
    let key = AssetKey::derive(&args.subject)?;
    println!("{key}");
    if let Some(tag) = &args.purpose {
        let purpose: Purpose = tag.parse()?;
        println!("{}", purpose.archive_file_name(&key));
    }
    Ok(0)
}
