//! U8 archive parser
//!
//! Every derived span (node table, string pool, file data) is bounds-checked
//! against the input before anything is copied; a hostile header cannot make
//! the parser read outside the buffer.

use crate::archive::{U8Archive, U8Node, U8NodeKind};
use crate::error::U8Error;
use crate::{U8_HEADER_SIZE, U8_MAGIC, U8_MAX_NODES, U8_NODE_SIZE};

fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

impl U8Archive {
    /// Parse an archive from bytes.
    ///
    /// # Errors
    /// * `TooSmall` / `InvalidMagic` - not a U8 header
    /// * `Truncated` - a declared span exceeds the buffer
    /// * `BadNameOffset` / `BadFolderSpan` - node table inconsistencies
    pub fn parse(data: &[u8]) -> Result<Self, U8Error> {
        if data.len() < U8_HEADER_SIZE {
            return Err(U8Error::TooSmall);
        }
        if read_u32(data, 0) != U8_MAGIC {
            return Err(U8Error::InvalidMagic);
        }

        let nodes_offset = read_u32(data, 4) as usize;
        let nodes_size = read_u32(data, 8) as usize;
        let data_offset = read_u32(data, 12) as usize;

        let mut watermark = [0u8; 16];
        watermark.copy_from_slice(&data[16..32]);

        if nodes_offset < U8_HEADER_SIZE
            || nodes_offset.checked_add(nodes_size).is_none()
            || nodes_offset + nodes_size > data.len()
        {
            return Err(U8Error::Truncated { offset: 4 });
        }
        if data_offset < U8_HEADER_SIZE || data_offset > data.len() {
            return Err(U8Error::Truncated { offset: 12 });
        }

        // Node count comes from the root's sibling_next field
        if nodes_size < U8_NODE_SIZE {
            return Err(U8Error::Truncated { offset: 8 });
        }
        let node_count = read_u32(data, nodes_offset + 8) as usize;
        if node_count > U8_MAX_NODES {
            return Err(U8Error::TooManyNodes(node_count));
        }
        let table_bytes = node_count
            .checked_mul(U8_NODE_SIZE)
            .ok_or(U8Error::Truncated { offset: nodes_offset })?;
        if table_bytes > nodes_size || nodes_offset + table_bytes > data.len() {
            return Err(U8Error::Truncated {
                offset: nodes_offset,
            });
        }

        let pool_start = nodes_offset + table_bytes;
        let pool_end = nodes_offset + nodes_size;
        let string_pool = &data[pool_start..pool_end];

        let mut nodes = Vec::with_capacity(node_count);
        for i in 0..node_count {
            let base = nodes_offset + i * U8_NODE_SIZE;
            let packed = read_u32(data, base);
            let is_folder = packed & 0xFF00_0000 != 0;
            let name_offset = (packed & 0x00FF_FFFF) as usize;

            let name = read_pool_string(string_pool, name_offset)
                .ok_or(U8Error::BadNameOffset { node: i })?;

            let a = read_u32(data, base + 4);
            let b = read_u32(data, base + 8);
            let kind = if is_folder {
                if (b as usize) < i + 1 || b as usize > node_count {
                    return Err(U8Error::BadFolderSpan { node: i });
                }
                U8NodeKind::Folder {
                    parent: a,
                    sibling_next: b,
                }
            } else {
                // Stored offsets are absolute; rebase onto the data region
                let absolute = a as usize;
                let size = b as usize;
                if absolute < data_offset
                    || absolute + size > data.len()
                    || absolute + size < absolute
                {
                    return Err(U8Error::Truncated { offset: base + 4 });
                }
                U8NodeKind::File {
                    offset: (absolute - data_offset) as u32,
                    size: b,
                }
            };

            nodes.push(U8Node { name, kind });
        }

        Ok(U8Archive {
            nodes,
            file_data: data[data_offset..].to_vec(),
            watermark,
        })
    }
}

fn read_pool_string(pool: &[u8], offset: usize) -> Option<String> {
    let tail = pool.get(offset..)?;
    let len = tail.iter().position(|&c| c == 0)?;
    String::from_utf8(tail[..len].to_vec()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::U8Builder;

    fn sample_bytes() -> Vec<u8> {
        let mut builder = U8Builder::new();
        builder.add_file("a/b.bin", vec![1, 2, 3, 4]);
        builder.add_file("top.bin", vec![5]);
        builder.build().write()
    }

    #[test]
    fn test_parse_rejects_bad_magic() {
        let mut bytes = sample_bytes();
        bytes[0] = 0;
        assert_eq!(U8Archive::parse(&bytes), Err(U8Error::InvalidMagic));
    }

    #[test]
    fn test_parse_rejects_short_buffer() {
        assert_eq!(U8Archive::parse(&[0x55, 0xAA]), Err(U8Error::TooSmall));
    }

    #[test]
    fn test_parse_rejects_node_table_past_end() {
        let mut bytes = sample_bytes();
        // Inflate the declared node-table size beyond the buffer
        bytes[8..12].copy_from_slice(&0x7FFF_FFFFu32.to_be_bytes());
        assert_eq!(
            U8Archive::parse(&bytes),
            Err(U8Error::Truncated { offset: 4 })
        );
    }

    #[test]
    fn test_parse_rejects_file_span_past_end() {
        let mut bytes = sample_bytes();
        let arc = U8Archive::parse(&bytes).unwrap();
        // Node 2 is a/b.bin; corrupt its size field
        assert_eq!(arc.nodes[2].name, "b.bin");
        let node_base = 32 + 2 * U8_NODE_SIZE;
        bytes[node_base + 8..node_base + 12].copy_from_slice(&0xFFFFu32.to_be_bytes());
        assert!(matches!(
            U8Archive::parse(&bytes),
            Err(U8Error::Truncated { .. })
        ));
    }

    #[test]
    fn test_watermark_preserved() {
        let mut builder = U8Builder::new();
        builder.add_file("x", vec![0]);
        let mut arc = builder.build();
        arc.watermark = *b"0123456789abcdef";
        let parsed = U8Archive::parse(&arc.write()).unwrap();
        assert_eq!(&parsed.watermark, b"0123456789abcdef");
    }
}
