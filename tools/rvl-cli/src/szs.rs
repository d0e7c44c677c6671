//! Yaz0 compress/decompress commands

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

#[derive(Args)]
pub struct CompressArgs {
    /// File to compress
    pub input: PathBuf,

    /// Output path (default: input with .szs appended)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Store literals only - larger output, instant
    #[arg(long)]
    pub fast: bool,
}

#[derive(Args)]
pub struct DecompressArgs {
    /// Yaz0-compressed file
    pub input: PathBuf,

    /// Output path (default: input with .szs stripped, or .bin appended)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn compress(args: CompressArgs) -> Result<()> {
    let data = std::fs::read(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;

    let packed = if args.fast {
        rvl_yaz0::encode_fast(&data)
    } else {
        rvl_yaz0::encode(&data)
    };

    let output = args.output.unwrap_or_else(|| {
        let mut path = args.input.clone();
        path.as_mut_os_string().push(".szs");
        path
    });
    std::fs::write(&output, &packed)
        .with_context(|| format!("writing {}", output.display()))?;

    println!(
        "{} -> {} ({} -> {} bytes)",
        args.input.display(),
        output.display(),
        data.len(),
        packed.len()
    );
    Ok(())
}

pub fn decompress(args: DecompressArgs) -> Result<()> {
    let data = std::fs::read(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;

    if !rvl_yaz0::is_compressed(&data) {
        bail!("{} is not Yaz0 compressed", args.input.display());
    }
    let expanded = rvl_yaz0::decode(&data)?;

    let output = args.output.unwrap_or_else(|| {
        match args.input.extension().and_then(|e| e.to_str()) {
            Some("szs") => args.input.with_extension(""),
            _ => {
                let mut path = args.input.clone();
                path.as_mut_os_string().push(".bin");
                path
            }
        }
    });
    std::fs::write(&output, &expanded)
        .with_context(|| format!("writing {}", output.display()))?;

    println!(
        "{} -> {} ({} -> {} bytes)",
        args.input.display(),
        output.display(),
        data.len(),
        expanded.len()
    );
    Ok(())
}
