//! In-memory scene graph
//!
//! Everything here is a plain value type exclusively owned by the
//! [`Scene`](crate::Scene); the transient serialization machinery
//! (dictionaries, name tables) never appears in the model, and nothing
//! holds a raw pointer or a kind tag that needs casting.

mod anim;
mod bone;
mod draw_matrix;
mod material;
mod mesh;
mod texture;
mod vertex;

pub use anim::{Animation, AnimationTrack, Keyframe, TrackKind};
pub use bone::{Aabb, BillboardMode, Bone, DisplayCommand};
pub use draw_matrix::{BoneWeight, DrawMatrix};
pub use material::{CullMode, Material, TextureRef};
pub use mesh::{Mesh, VertexIndices};
pub use texture::{Texture, TextureFormat};
pub use vertex::{
    ColorBuffer, ColorFormat, ElementType, PositionBuffer, Quantization, TexCoordBuffer,
    NormalBuffer,
};

pub(crate) use bone::{rotation_from_fixed, rotation_to_fixed};
pub(crate) use mesh::{mesh_buffers_from_flags, ATTR_COLOR, ATTR_NORMAL, ATTR_TEXCOORD};
pub(crate) use vertex::{
    read_color, read_vec2s, read_vec3s, write_color, write_vec2s, write_vec3s, KIND_COLOR,
    KIND_NORMAL, KIND_POSITION, KIND_TEXCOORD,
};

use serde::{Deserialize, Serialize};

/// A fully materialized scene: the parse result and the write input.
///
/// Consumers get this graph, never raw section bytes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub name: String,

    pub bones: Vec<Bone>,

    /// Serialized-slot to logical-joint remap. Empty means identity.
    /// Archives produced by optimizing packers carry non-identity tables
    /// ("joint compression"); both forms are preserved on round-trip.
    pub joint_lut: Vec<u16>,

    pub draw_matrices: Vec<DrawMatrix>,

    pub positions: Vec<PositionBuffer>,
    pub normals: Vec<NormalBuffer>,
    pub colors: Vec<ColorBuffer>,
    pub texcoords: Vec<TexCoordBuffer>,

    pub materials: Vec<Material>,
    pub meshes: Vec<Mesh>,
    pub textures: Vec<Texture>,
    pub animations: Vec<Animation>,
}

impl Scene {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Logical joint id stored in serialized slot `slot`.
    pub fn joint_at_slot(&self, slot: usize) -> usize {
        if self.joint_lut.is_empty() {
            slot
        } else {
            self.joint_lut[slot] as usize
        }
    }

    /// Rebuild every bone's ordered child list from the parent indices.
    /// Out-of-range parents are left childless here and rejected by the
    /// link checks.
    pub fn recompute_hierarchy(&mut self) {
        for bone in &mut self.bones {
            bone.children.clear();
        }
        for i in 0..self.bones.len() {
            let parent = self.bones[i].parent;
            if parent >= 0 && (parent as usize) < self.bones.len() {
                self.bones[parent as usize].children.push(i as u16);
            }
        }
    }

    pub fn texture_index(&self, name: &str) -> Option<u16> {
        self.textures
            .iter()
            .position(|t| t.name == name)
            .map(|i| i as u16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recompute_hierarchy() {
        let mut scene = Scene::new("test");
        scene.bones = vec![
            Bone::named("root"),
            Bone::named("spine"),
            Bone::named("arm"),
        ];
        scene.bones[1].parent = 0;
        scene.bones[2].parent = 1;
        scene.recompute_hierarchy();
        assert_eq!(scene.bones[0].children, vec![1]);
        assert_eq!(scene.bones[1].children, vec![2]);
        assert!(scene.bones[2].children.is_empty());
    }

    #[test]
    fn test_joint_at_slot() {
        let mut scene = Scene::new("test");
        assert_eq!(scene.joint_at_slot(3), 3);
        scene.joint_lut = vec![2, 0, 1];
        assert_eq!(scene.joint_at_slot(0), 2);
        assert_eq!(scene.joint_at_slot(2), 1);
    }
}
