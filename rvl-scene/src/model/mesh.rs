//! Mesh data
//!
//! A mesh references vertex buffers by name (position required, the rest
//! optional) and indexes into them per vertex. Skinned meshes carry a local
//! draw-matrix table; each vertex selects a slot in that table, mirroring
//! how the GPU binds a small matrix palette per shape.

use serde::{Deserialize, Serialize};

/// Per-vertex indices into the referenced buffers.
///
/// Indices for absent attributes are ignored (and serialized as 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VertexIndices {
    /// Slot in the mesh's local draw-matrix table.
    pub matrix_slot: u8,
    pub position: u16,
    pub normal: u16,
    pub color: u16,
    pub texcoord: u16,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Mesh {
    pub name: String,
    pub position_buffer: String,
    pub normal_buffer: Option<String>,
    pub color_buffer: Option<String>,
    pub texcoord_buffer: Option<String>,
    /// Indices into `Scene::draw_matrices`; vertices address this table
    /// through `matrix_slot`.
    pub draw_matrices: Vec<u16>,
    /// Triangle list, three entries per face.
    pub vertices: Vec<VertexIndices>,
}

impl Mesh {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// On-disc attribute presence flags.
    pub(crate) fn attribute_flags(&self) -> u32 {
        let mut flags = ATTR_POSITION;
        if self.normal_buffer.is_some() {
            flags |= ATTR_NORMAL;
        }
        if self.color_buffer.is_some() {
            flags |= ATTR_COLOR;
        }
        if self.texcoord_buffer.is_some() {
            flags |= ATTR_TEXCOORD;
        }
        flags
    }
}

pub(crate) const ATTR_POSITION: u32 = 1;
pub(crate) const ATTR_NORMAL: u32 = 2;
pub(crate) const ATTR_COLOR: u32 = 4;
pub(crate) const ATTR_TEXCOORD: u32 = 8;

/// Reverse of [`Mesh::attribute_flags`]: turn presence flags plus the
/// serialized (possibly empty) buffer names back into options.
pub(crate) fn mesh_buffers_from_flags(
    flags: u32,
    normal: String,
    color: String,
    texcoord: String,
) -> (Option<String>, Option<String>, Option<String>) {
    (
        (flags & ATTR_NORMAL != 0).then_some(normal),
        (flags & ATTR_COLOR != 0).then_some(color),
        (flags & ATTR_TEXCOORD != 0).then_some(texcoord),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_flags() {
        let mut mesh = Mesh::named("m");
        mesh.position_buffer = "pos".into();
        assert_eq!(mesh.attribute_flags(), ATTR_POSITION);
        mesh.normal_buffer = Some("nrm".into());
        mesh.texcoord_buffer = Some("uv".into());
        assert_eq!(
            mesh.attribute_flags(),
            ATTR_POSITION | ATTR_NORMAL | ATTR_TEXCOORD
        );
    }
}
