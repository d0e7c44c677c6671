//! Scene archive container
//!
//! One relocatable blob holds every section of a scene: a fixed header, a
//! dictionary of section offsets, the sections themselves, and a shared
//! name pool poured last. Sections are discovered by dictionary lookup, not
//! position, so readers tolerate any section order and any subset of
//! sections.
//!
//! # Archive Layout
//!
//! ```text
//! 0x00: magic "RSCN"
//! 0x04: total size u32
//! 0x08: version u16 (currently 1)
//! 0x0A: section count u16
//! 0x0C: scene name s32 (relative to archive start)
//! 0x10: root dictionary (section name -> section offset)
//! ....: sections, each: 4-byte magic, u32 byte size, payload
//! ....: name pool
//! ```

mod read;
mod write;

pub use read::ParseReport;

use crate::error::{Result, SceneError};
use crate::model::Scene;

pub(crate) const ARCHIVE_MAGIC: u32 = u32::from_be_bytes(*b"RSCN");
pub(crate) const ARCHIVE_VERSION: u16 = 1;
pub(crate) const HEADER_SIZE: usize = 16;

pub(crate) const SEC_BONES: &str = "bones";
pub(crate) const SEC_DRAW_MATRICES: &str = "draw_matrices";
pub(crate) const SEC_VERTEX_DATA: &str = "vertex_data";
pub(crate) const SEC_MATERIALS: &str = "materials";
pub(crate) const SEC_MESHES: &str = "meshes";
pub(crate) const SEC_TEXTURES: &str = "textures";
pub(crate) const SEC_ANIMATIONS: &str = "animations";

/// Every section a reader probes for, in canonical write order.
pub(crate) const ALL_SECTIONS: [&str; 7] = [
    SEC_BONES,
    SEC_DRAW_MATRICES,
    SEC_VERTEX_DATA,
    SEC_MATERIALS,
    SEC_MESHES,
    SEC_TEXTURES,
    SEC_ANIMATIONS,
];

pub(crate) const MAGIC_BONES: u32 = u32::from_be_bytes(*b"BONE");
pub(crate) const MAGIC_DRAW_MATRICES: u32 = u32::from_be_bytes(*b"DRWM");
pub(crate) const MAGIC_VERTEX_DATA: u32 = u32::from_be_bytes(*b"VTXB");
pub(crate) const MAGIC_MATERIALS: u32 = u32::from_be_bytes(*b"MATL");
pub(crate) const MAGIC_MESHES: u32 = u32::from_be_bytes(*b"MESH");
pub(crate) const MAGIC_TEXTURES: u32 = u32::from_be_bytes(*b"TEXS");
pub(crate) const MAGIC_ANIMATIONS: u32 = u32::from_be_bytes(*b"ANIM");

pub(crate) const BONE_RECORD_SIZE: usize = 0x4C;
pub(crate) const INVERSE_BIND_SIZE: usize = 48;

pub(crate) const MAX_U16: usize = 0xFFFF;

/// Cross-section reference resolution.
///
/// Runs at the end of a parse and before a write: every name or index that
/// crosses a section boundary must land on something. Failures are
/// `MissingReference` naming both ends.
pub(crate) fn check_links(scene: &Scene) -> Result<()> {
    let bone_count = scene.bones.len();

    if !scene.joint_lut.is_empty() {
        if scene.joint_lut.len() != bone_count {
            return Err(SceneError::UnsupportedFeature(format!(
                "joint LUT holds {} slots for {} bones",
                scene.joint_lut.len(),
                bone_count
            )));
        }
        let mut seen = vec![false; bone_count];
        for &logical in &scene.joint_lut {
            match seen.get_mut(logical as usize) {
                Some(slot @ false) => *slot = true,
                _ => {
                    return Err(SceneError::UnsupportedFeature(
                        "joint LUT is not a permutation".into(),
                    ))
                }
            }
        }
    }

    for bone in &scene.bones {
        if bone.parent >= 0 && bone.parent as usize >= bone_count {
            return Err(SceneError::MissingReference {
                from: format!("bone '{}'", bone.name),
                to: format!("parent bone {}", bone.parent),
            });
        }
        for display in &bone.displays {
            if display.material as usize >= scene.materials.len() {
                return Err(SceneError::MissingReference {
                    from: format!("bone '{}' display", bone.name),
                    to: format!("material {}", display.material),
                });
            }
            if display.mesh as usize >= scene.meshes.len() {
                return Err(SceneError::MissingReference {
                    from: format!("bone '{}' display", bone.name),
                    to: format!("mesh {}", display.mesh),
                });
            }
        }
    }

    for (i, dm) in scene.draw_matrices.iter().enumerate() {
        for weight in &dm.weights {
            if weight.bone as usize >= bone_count {
                return Err(SceneError::MissingReference {
                    from: format!("draw matrix {}", i),
                    to: format!("bone {}", weight.bone),
                });
            }
        }
    }

    for material in &scene.materials {
        for texture in &material.textures {
            if scene.texture_index(&texture.name).is_none() {
                return Err(SceneError::MissingReference {
                    from: format!("material '{}'", material.name),
                    to: format!("texture '{}'", texture.name),
                });
            }
        }
    }

    for mesh in &scene.meshes {
        check_mesh_links(scene, mesh)?;
    }

    for animation in &scene.animations {
        for track in &animation.tracks {
            if !scene.bones.iter().any(|b| b.name == track.target) {
                return Err(SceneError::MissingReference {
                    from: format!("animation '{}'", animation.name),
                    to: format!("bone '{}'", track.target),
                });
            }
        }
    }

    Ok(())
}

fn check_mesh_links(scene: &Scene, mesh: &crate::model::Mesh) -> Result<()> {
    let position = scene
        .positions
        .iter()
        .find(|b| b.name == mesh.position_buffer)
        .ok_or_else(|| SceneError::MissingReference {
            from: format!("mesh '{}'", mesh.name),
            to: format!("position buffer '{}'", mesh.position_buffer),
        })?;

    let normal = match &mesh.normal_buffer {
        Some(name) => Some(scene.normals.iter().find(|b| &b.name == name).ok_or_else(
            || SceneError::MissingReference {
                from: format!("mesh '{}'", mesh.name),
                to: format!("normal buffer '{}'", name),
            },
        )?),
        None => None,
    };
    let color = match &mesh.color_buffer {
        Some(name) => Some(scene.colors.iter().find(|b| &b.name == name).ok_or_else(
            || SceneError::MissingReference {
                from: format!("mesh '{}'", mesh.name),
                to: format!("color buffer '{}'", name),
            },
        )?),
        None => None,
    };
    let texcoord = match &mesh.texcoord_buffer {
        Some(name) => Some(
            scene
                .texcoords
                .iter()
                .find(|b| &b.name == name)
                .ok_or_else(|| SceneError::MissingReference {
                    from: format!("mesh '{}'", mesh.name),
                    to: format!("texcoord buffer '{}'", name),
                })?,
        ),
        None => None,
    };

    for &dm in &mesh.draw_matrices {
        if dm as usize >= scene.draw_matrices.len() {
            return Err(SceneError::MissingReference {
                from: format!("mesh '{}'", mesh.name),
                to: format!("draw matrix {}", dm),
            });
        }
    }

    for (i, v) in mesh.vertices.iter().enumerate() {
        let vertex = format!("mesh '{}' vertex {}", mesh.name, i);
        if !mesh.draw_matrices.is_empty() && v.matrix_slot as usize >= mesh.draw_matrices.len()
        {
            return Err(SceneError::MissingReference {
                from: vertex,
                to: format!("draw matrix slot {}", v.matrix_slot),
            });
        }
        if v.position as usize >= position.data.len() {
            return Err(SceneError::MissingReference {
                from: vertex,
                to: format!("position {}", v.position),
            });
        }
        if let Some(buffer) = normal {
            if v.normal as usize >= buffer.data.len() {
                return Err(SceneError::MissingReference {
                    from: vertex,
                    to: format!("normal {}", v.normal),
                });
            }
        }
        if let Some(buffer) = color {
            if v.color as usize >= buffer.data.len() {
                return Err(SceneError::MissingReference {
                    from: vertex,
                    to: format!("color {}", v.color),
                });
            }
        }
        if let Some(buffer) = texcoord {
            if v.texcoord as usize >= buffer.data.len() {
                return Err(SceneError::MissingReference {
                    from: vertex,
                    to: format!("texcoord {}", v.texcoord),
                });
            }
        }
    }

    Ok(())
}
