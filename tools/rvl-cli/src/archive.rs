//! U8 archive pack/unpack commands
//!
//! `extract` walks the node array depth-first with an explicit folder
//! stack; `create` walks the directory tree with walkdir and lets the
//! builder handle ordering. Compressed archives are expanded transparently
//! on extract.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use rvl_u8::{U8Archive, U8Builder, U8NodeKind};
use walkdir::WalkDir;

#[derive(Args)]
pub struct ExtractArgs {
    /// U8 archive (optionally Yaz0-compressed)
    pub input: PathBuf,

    /// Destination directory
    pub output: PathBuf,
}

#[derive(Args)]
pub struct CreateArgs {
    /// Directory to pack
    pub input: PathBuf,

    /// Output archive path
    pub output: PathBuf,

    /// Yaz0-compress the result
    #[arg(long)]
    pub compress: bool,
}

pub fn extract(args: ExtractArgs) -> Result<()> {
    let mut data = std::fs::read(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    if rvl_yaz0::is_compressed(&data) {
        data = rvl_yaz0::decode(&data)?;
    }

    let archive = U8Archive::parse(&data)?;

    let mut current = args.output.clone();
    let mut stack: Vec<u32> = Vec::new();
    let mut file_count = 0usize;

    for (index, node) in archive.nodes.iter().enumerate() {
        while stack.last() == Some(&(index as u32)) {
            stack.pop();
            current.pop();
        }
        match node.kind {
            U8NodeKind::Folder { sibling_next, .. } => {
                stack.push(sibling_next);
                current.push(&node.name);
                std::fs::create_dir_all(&current)
                    .with_context(|| format!("creating {}", current.display()))?;
            }
            U8NodeKind::File { .. } => {
                let data = archive
                    .node_data(index)
                    .with_context(|| format!("node {} has an invalid data span", index))?;
                let path = current.join(&node.name);
                std::fs::write(&path, data)
                    .with_context(|| format!("writing {}", path.display()))?;
                file_count += 1;
            }
        }
    }

    println!(
        "extracted {} files to {}",
        file_count,
        args.output.display()
    );
    Ok(())
}

pub fn create(args: CreateArgs) -> Result<()> {
    if !args.input.is_dir() {
        bail!("{} is not a directory", args.input.display());
    }

    let mut builder = U8Builder::new();
    let mut file_count = 0usize;
    for entry in WalkDir::new(&args.input).sort_by_file_name() {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(&args.input)
            .expect("walkdir yields children of the root");
        if relative.as_os_str().is_empty() {
            continue;
        }
        let Some(relative) = path_to_archive_path(relative) else {
            bail!("non-UTF-8 path: {}", entry.path().display());
        };
        if entry.file_type().is_dir() {
            builder.add_folder(&relative);
        } else {
            let data = std::fs::read(entry.path())
                .with_context(|| format!("reading {}", entry.path().display()))?;
            builder.add_file(&relative, data);
            file_count += 1;
        }
    }

    let mut bytes = builder.build().write();
    if args.compress {
        bytes = rvl_yaz0::encode(&bytes);
    }
    std::fs::write(&args.output, &bytes)
        .with_context(|| format!("writing {}", args.output.display()))?;

    println!(
        "packed {} files into {} ({} bytes)",
        file_count,
        args.output.display(),
        bytes.len()
    );
    Ok(())
}

fn path_to_archive_path(path: &Path) -> Option<String> {
    let mut out = String::new();
    for component in path.components() {
        if !out.is_empty() {
            out.push('/');
        }
        out.push_str(component.as_os_str().to_str()?);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_extract_roundtrip() {
        let src = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(src.path().join("model")).unwrap();
        std::fs::write(src.path().join("model/a.bin"), [1, 2, 3]).unwrap();
        std::fs::write(src.path().join("top.txt"), b"hello").unwrap();

        let arc_path = src.path().join("out.arc");
        create(CreateArgs {
            input: src.path().to_path_buf(),
            output: arc_path.clone(),
            compress: true,
        })
        .unwrap();

        let dst = tempfile::tempdir().unwrap();
        extract(ExtractArgs {
            input: arc_path.clone(),
            output: dst.path().to_path_buf(),
        })
        .unwrap();

        assert_eq!(
            std::fs::read(dst.path().join("model/a.bin")).unwrap(),
            vec![1, 2, 3]
        );
        assert_eq!(
            std::fs::read(dst.path().join("top.txt")).unwrap(),
            b"hello"
        );
    }
}
