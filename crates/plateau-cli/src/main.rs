//! # plateau CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use plateau_cli::archive::{run_archive, run_extract, ArchiveArgs, ExtractArgs};
use plateau_cli::cursor::{run_cursor, CursorArgs};
use plateau_cli::key::{run_key, KeyArgs};
use plateau_cli::probe::{run_probe, ProbeArgs};

/// Plateau asset pipeline CLI
///
/// Archives assets into compressed single-file archives, reconstructs
/// them, and inspects files, keys, and page cursors.
#[derive(Parser, Debug)]
#[command(name = "plateau", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Archive a file under a subject and purpose (consumes the file).
    Archive(ArchiveArgs),

    /// Reconstruct an archived file.
    Extract(ExtractArgs),

    /// Report content type and image dimensions of a file.
    Probe(ProbeArgs),

    /// Derive the asset key for a subject name.
    Key(KeyArgs),

    /// Encode or decode page cursors.
    Cursor(CursorArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Archive(args) => run_archive(&args),
        Commands::Extract(args) => run_extract(&args),
        Commands::Probe(args) => run_probe(&args),
        Commands::Key(args) => run_key(&args),
        Commands::Cursor(args) => run_cursor(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}
