//! Rvl-U8: U8 (`.arc`) container archive reader/writer
//!
//! U8 is the minimal virtual filesystem used on GameCube/Wii discs to bundle
//! named sub-resources into one relocatable buffer - a tar without the
//! padding. Folders and files live in a single flat node table stored in
//! depth-first pre-order; each folder records the index one past its last
//! descendant, so skipping a subtree is O(1) and named lookup needs no
//! parsing pass.
//!
//! # Container Format
//!
//! ```text
//! 0x00: magic 0x55AA382D ("U.8-")
//! 0x04: node table offset (s32 BE, always 0x20)
//! 0x08: node table size   (s32 BE, nodes + string pool)
//! 0x0C: file data offset  (s32 BE)
//! 0x10: watermark (16 bytes, opaque, preserved verbatim)
//! 0x20: node records, 12 bytes each
//! ....: string pool (NUL-terminated names)
//! ....: file data
//! ```
//!
//! Each node packs its type and name offset into one u32 (top byte is the
//! folder flag, low 24 bits index the string pool), followed by either
//! {data offset, size} for files or {parent index, sibling_next} for
//! folders. The root is always node 0.
//!
//! # Usage
//!
//! ```
//! use rvl_u8::U8Builder;
//!
//! let mut builder = U8Builder::new();
//! builder.add_file("course/course.bin", vec![1, 2, 3]);
//! builder.add_file("course/map.bin", vec![4, 5]);
//! let archive = builder.build();
//!
//! let bytes = archive.write();
//! let parsed = rvl_u8::U8Archive::parse(&bytes).unwrap();
//! assert_eq!(parsed.read_file("course/map.bin").unwrap(), &[4, 5]);
//! ```

mod archive;
mod error;
mod parse;
mod write;

pub use archive::{U8Archive, U8Builder, U8Node, U8NodeKind};
pub use error::U8Error;

// =============================================================================
// Constants
// =============================================================================

/// Archive magic, offset 0 ("U", 0xAA, "8", "-")
pub const U8_MAGIC: u32 = 0x55AA_382D;

/// Fixed header size; the node table always starts here
pub const U8_HEADER_SIZE: usize = 32;

/// Size of one serialized node record
pub const U8_NODE_SIZE: usize = 12;

/// Node count ceiling imposed by 16-bit consumers of the format
pub const U8_MAX_NODES: usize = 65535;
