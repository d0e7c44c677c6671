//! U8 archive serializer

use crate::archive::{U8Archive, U8NodeKind};
use crate::{U8_HEADER_SIZE, U8_MAGIC, U8_NODE_SIZE};

impl U8Archive {
    /// Serialize to the on-disc layout.
    ///
    /// The string pool is emitted in node order; file offsets, kept relative
    /// to the data region in memory, become absolute here.
    pub fn write(&self) -> Vec<u8> {
        let mut strings: Vec<u8> = Vec::new();
        let mut name_offsets = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            name_offsets.push(strings.len() as u32);
            strings.extend_from_slice(node.name.as_bytes());
            strings.push(0);
        }

        let nodes_offset = U8_HEADER_SIZE;
        let table_bytes = self.nodes.len() * U8_NODE_SIZE;
        let nodes_size = table_bytes + strings.len();
        let data_offset = nodes_offset + nodes_size;

        let mut out = Vec::with_capacity(data_offset + self.file_data.len());
        out.extend_from_slice(&U8_MAGIC.to_be_bytes());
        out.extend_from_slice(&(nodes_offset as u32).to_be_bytes());
        out.extend_from_slice(&(nodes_size as u32).to_be_bytes());
        out.extend_from_slice(&(data_offset as u32).to_be_bytes());
        out.extend_from_slice(&self.watermark);

        for (node, &name_offset) in self.nodes.iter().zip(&name_offsets) {
            let folder_flag = if node.is_folder() { 0x0100_0000 } else { 0 };
            out.extend_from_slice(
                &(folder_flag | (name_offset & 0x00FF_FFFF)).to_be_bytes(),
            );
            match node.kind {
                U8NodeKind::Folder {
                    parent,
                    sibling_next,
                } => {
                    out.extend_from_slice(&parent.to_be_bytes());
                    out.extend_from_slice(&sibling_next.to_be_bytes());
                }
                U8NodeKind::File { offset, size } => {
                    out.extend_from_slice(&(data_offset as u32 + offset).to_be_bytes());
                    out.extend_from_slice(&size.to_be_bytes());
                }
            }
        }

        out.extend_from_slice(&strings);
        out.extend_from_slice(&self.file_data);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::U8Builder;

    #[test]
    fn test_roundtrip_isomorphic() {
        let mut builder = U8Builder::new();
        builder.add_file("effect/smoke.breff", vec![0xDE, 0xAD]);
        builder.add_file("model/driver.brres", vec![1; 64]);
        builder.add_file("model/kart.brres", vec![2; 32]);
        builder.add_folder("sound");
        let original = builder.build();

        let parsed = U8Archive::parse(&original.write()).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_roundtrip_empty_archive() {
        let original = U8Builder::new().build();
        let parsed = U8Archive::parse(&original.write()).unwrap();
        assert_eq!(parsed.nodes.len(), 1);
        assert!(parsed.nodes[0].is_folder());
    }

    #[test]
    fn test_header_fields() {
        let mut builder = U8Builder::new();
        builder.add_file("f", vec![7; 5]);
        let bytes = builder.build().write();

        assert_eq!(&bytes[0..4], &[0x55, 0xAA, 0x38, 0x2D]);
        // Node table directly after the header
        assert_eq!(u32::from_be_bytes(bytes[4..8].try_into().unwrap()), 32);
        // File data is the final 5 bytes
        let data_offset =
            u32::from_be_bytes(bytes[12..16].try_into().unwrap()) as usize;
        assert_eq!(&bytes[data_offset..], &[7; 5]);
    }
}
