//! Rvl CLI - command-line tool for Revolution scene archives
//!
//! # Commands
//!
//! - `rvl compress` - Yaz0-compress a file
//! - `rvl decompress` - expand a Yaz0 file
//! - `rvl extract` - unpack a U8 archive to a directory
//! - `rvl create` - pack a directory into a U8 archive
//! - `rvl info` - summarize a scene archive's sections
//! - `rvl json` - dump a parsed scene as JSON
//!
//! All the byte transforms live in the library crates; this binary only
//! does argument handling and file I/O around them.

mod archive;
mod scene;
mod szs;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Command-line tool for Revolution scene archives
#[derive(Parser)]
#[command(name = "rvl")]
#[command(about = "Compress, unpack and inspect Revolution scene assets")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Yaz0-compress a file
    Compress(szs::CompressArgs),

    /// Expand a Yaz0-compressed file
    Decompress(szs::DecompressArgs),

    /// Unpack a U8 archive into a directory
    Extract(archive::ExtractArgs),

    /// Pack a directory into a U8 archive
    Create(archive::CreateArgs),

    /// Summarize a scene archive's sections
    Info(scene::InfoArgs),

    /// Dump a parsed scene archive as JSON
    Json(scene::JsonArgs),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Compress(args) => szs::compress(args),
        Commands::Decompress(args) => szs::decompress(args),
        Commands::Extract(args) => archive::extract(args),
        Commands::Create(args) => archive::create(args),
        Commands::Info(args) => scene::info(args),
        Commands::Json(args) => scene::json(args),
    }
}
