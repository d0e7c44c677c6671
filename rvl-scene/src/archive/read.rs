//! Scene archive parser
//!
//! Parsing runs in phases: header check, root-dictionary scan, per-section
//! parse (order-independent; a section the dictionary does not know is
//! treated as absent), then the link phase that resolves every
//! cross-section reference. Hard failures - bad magic, truncated spans,
//! corrupt dictionaries - abort immediately; missing optional sections
//! only leave a warning in the report.

use glam::Vec3;

use super::*;
use crate::dict::Dictionary;
use crate::error::{Result, SceneError};
use crate::io::BinReader;
use crate::model::{
    read_color, read_vec2s, read_vec3s, Aabb, Animation, AnimationTrack, BillboardMode, Bone,
    BoneWeight, ColorBuffer, ColorFormat, CullMode, DisplayCommand, DrawMatrix, ElementType,
    Keyframe, Material, Mesh, NormalBuffer, PositionBuffer, Quantization, Scene,
    TexCoordBuffer, Texture, TextureFormat, TextureRef, TrackKind, VertexIndices,
    mesh_buffers_from_flags, rotation_from_fixed, ATTR_COLOR, ATTR_NORMAL, ATTR_TEXCOORD,
    KIND_COLOR, KIND_NORMAL, KIND_POSITION, KIND_TEXCOORD,
};
use crate::names::read_name;

/// Non-fatal findings from a parse: absent optional sections, quirks the
/// reader tolerated. Front-ends surface these as warnings.
#[derive(Debug, Clone, Default)]
pub struct ParseReport {
    pub warnings: Vec<String>,
}

impl Scene {
    /// Parse an archive image into a scene graph.
    pub fn parse(data: &[u8]) -> Result<(Scene, ParseReport)> {
        let mut report = ParseReport::default();
        let mut r = BinReader::new(data);

        let magic = r.u32()?;
        if magic != ARCHIVE_MAGIC {
            return Err(SceneError::CorruptArchive {
                offset: 0,
                reason: "bad archive magic".into(),
            });
        }
        let total_size = r.u32()? as usize;
        if total_size > data.len() {
            return Err(SceneError::TruncatedArchive {
                offset: 4,
                needed: total_size,
                available: data.len(),
            });
        }
        let version = r.u16()?;
        if version != ARCHIVE_VERSION {
            return Err(SceneError::CorruptArchive {
                offset: 8,
                reason: format!("unsupported archive version {}", version),
            });
        }
        let _section_count = r.u16()?;

        let mut scene = Scene {
            name: read_name(&mut r, 0)?,
            ..Default::default()
        };

        r.seek_set(HEADER_SIZE);
        let dict = Dictionary::read(&mut r)?;

        for section in ALL_SECTIONS {
            let node = match dict.lookup(section)? {
                Some(node) => node,
                None => {
                    report.warnings.push(format!("section '{}' absent", section));
                    continue;
                }
            };
            let start = node.data_offset as usize;
            match section {
                SEC_BONES => read_bones(&mut scene, data, start, &mut report)?,
                SEC_DRAW_MATRICES => read_draw_matrices(&mut scene, data, start)?,
                SEC_VERTEX_DATA => read_vertex_data(&mut scene, data, start)?,
                SEC_MATERIALS => read_materials(&mut scene, data, start)?,
                SEC_MESHES => read_meshes(&mut scene, data, start)?,
                SEC_TEXTURES => read_textures(&mut scene, data, start)?,
                SEC_ANIMATIONS => read_animations(&mut scene, data, start)?,
                _ => unreachable!(),
            }
        }

        check_links(&scene)?;
        Ok((scene, report))
    }
}

/// Validate a section prologue; returns a reader positioned just past the
/// magic and size fields.
fn open_section<'a>(
    data: &'a [u8],
    start: usize,
    magic: u32,
    section: &'static str,
) -> Result<BinReader<'a>> {
    let mut r = BinReader::new(data);
    r.seek_set(start);
    let found = r.u32()?;
    if found != magic {
        return Err(SceneError::CorruptArchive {
            offset: start,
            reason: format!("bad magic for section '{}'", section),
        });
    }
    let size = r.u32()? as usize;
    if start + size > data.len() {
        return Err(SceneError::TruncatedArchive {
            offset: start + 4,
            needed: start + size,
            available: data.len(),
        });
    }
    Ok(r)
}

fn read_bones(
    scene: &mut Scene,
    data: &[u8],
    start: usize,
    report: &mut ParseReport,
) -> Result<()> {
    let mut r = open_section(data, start, MAGIC_BONES, SEC_BONES)?;
    let count = r.u16()? as usize;
    r.u16()?;
    let ofs_records = r.u32()? as usize;
    let ofs_lut = r.u32()? as usize;
    let ofs_inverse_bind = r.u32()? as usize;
    let ofs_displays = r.u32()? as usize;

    // Slot remap first - record fetches go through it
    r.seek_set(start + ofs_lut);
    let mut lut = Vec::with_capacity(count);
    let mut sorted = true;
    for slot in 0..count {
        let logical = r.u16()?;
        if logical as usize >= count {
            return Err(SceneError::CorruptArchive {
                offset: start + ofs_lut + slot * 2,
                reason: format!("joint LUT slot {} points at joint {}", slot, logical),
            });
        }
        if logical as usize != slot {
            sorted = false;
        }
        lut.push(logical);
    }
    if !sorted {
        log::warn!(
            "archive employs joint compression ({} remapped slots); slot order is preserved on resave",
            count
        );
        report
            .warnings
            .push("joint LUT is not the identity (joint compression)".into());
    }

    scene.bones = vec![Bone::default(); count];
    for slot in 0..count {
        let logical = lut[slot] as usize;
        let record_start = start + ofs_records + slot * BONE_RECORD_SIZE;
        r.seek_set(record_start);

        let bone = &mut scene.bones[logical];
        bone.name = read_name(&mut r, record_start)?;
        let flag = r.u16()?;
        bone.billboard = BillboardMode::from_raw((flag >> 4) & 0x7).ok_or(
            SceneError::CorruptArchive {
                offset: record_start + 4,
                reason: format!("bad billboard mode {}", (flag >> 4) & 0x7),
            },
        )?;
        let ssc = r.u8()?;
        // Legacy archives store 0xFF for "unset"
        bone.ssc = ssc != 0xFF && ssc != 0;
        r.u8()?;
        bone.scale = read_vec3(&mut r)?;
        bone.rotation = Vec3::new(
            rotation_from_fixed(r.i16()?),
            rotation_from_fixed(r.i16()?),
            rotation_from_fixed(r.i16()?),
        );
        r.u16()?;
        bone.translation = read_vec3(&mut r)?;
        bone.bounding_radius = r.f32()?;
        bone.aabb = Aabb {
            min: read_vec3(&mut r)?,
            max: read_vec3(&mut r)?,
        };
        bone.parent = r.i32()?;
        if bone.parent < -1 || bone.parent >= count as i32 {
            return Err(SceneError::CorruptArchive {
                offset: record_start + 0x44,
                reason: format!("bone parent {} out of range", bone.parent),
            });
        }
        let display_count = r.u16()? as usize;
        let display_start = r.u16()? as usize;

        r.seek_set(start + ofs_displays + display_start * 4);
        let mut displays = Vec::with_capacity(display_count);
        for _ in 0..display_count {
            displays.push(DisplayCommand {
                material: r.u16()?,
                mesh: r.u16()?,
            });
        }
        scene.bones[logical].displays = displays;
    }

    for slot in 0..count {
        let logical = lut[slot] as usize;
        r.seek_set(start + ofs_inverse_bind + slot * INVERSE_BIND_SIZE);
        let mut matrix = [0.0f32; 12];
        for value in &mut matrix {
            *value = r.f32()?;
        }
        scene.bones[logical].inverse_bind = matrix;
    }

    scene.joint_lut = if sorted { Vec::new() } else { lut };
    scene.recompute_hierarchy();
    Ok(())
}

fn read_draw_matrices(scene: &mut Scene, data: &[u8], start: usize) -> Result<()> {
    let mut r = open_section(data, start, MAGIC_DRAW_MATRICES, SEC_DRAW_MATRICES)?;
    let total = r.u16()? as usize;
    let envelope_count = r.u16()? as usize;
    let ofs_kinds = r.u32()? as usize;
    let ofs_indices = r.u32()? as usize;
    let ofs_env_sizes = r.u32()? as usize;
    let ofs_env_bones = r.u32()? as usize;
    let ofs_env_weights = r.u32()? as usize;

    r.seek_set(start + ofs_env_sizes);
    let mut sizes = Vec::with_capacity(envelope_count);
    for _ in 0..envelope_count {
        sizes.push(r.u8()? as usize);
    }

    let flat: usize = sizes.iter().sum();
    r.seek_set(start + ofs_env_bones);
    let mut flat_bones = Vec::with_capacity(flat);
    for _ in 0..flat {
        flat_bones.push(r.u16()?);
    }
    r.seek_set(start + ofs_env_weights);
    let mut flat_weights = Vec::with_capacity(flat);
    for _ in 0..flat {
        flat_weights.push(r.f32()?);
    }

    let mut envelopes = Vec::with_capacity(envelope_count);
    let mut cursor = 0;
    for &size in &sizes {
        let weights = (cursor..cursor + size)
            .map(|i| BoneWeight {
                bone: flat_bones[i],
                weight: flat_weights[i],
            })
            .collect();
        envelopes.push(DrawMatrix { weights });
        cursor += size;
    }

    let mut kinds_reader = BinReader::new(data);
    kinds_reader.seek_set(start + ofs_kinds);
    let mut indices_reader = BinReader::new(data);
    indices_reader.seek_set(start + ofs_indices);

    scene.draw_matrices = Vec::with_capacity(total);
    for i in 0..total {
        let kind = kinds_reader.u8()?;
        let index = indices_reader.u16()?;
        let dm = match kind {
            0 => DrawMatrix::rigid(index),
            1 => envelopes
                .get(index as usize)
                .cloned()
                .ok_or(SceneError::CorruptArchive {
                    offset: start + ofs_indices + i * 2,
                    reason: format!("draw matrix {} points at envelope {}", i, index),
                })?,
            other => {
                return Err(SceneError::CorruptArchive {
                    offset: start + ofs_kinds + i,
                    reason: format!("bad draw matrix kind {}", other),
                })
            }
        };
        scene.draw_matrices.push(dm);
    }
    Ok(())
}

fn read_vertex_data(scene: &mut Scene, data: &[u8], start: usize) -> Result<()> {
    let mut r = open_section(data, start, MAGIC_VERTEX_DATA, SEC_VERTEX_DATA)?;
    let _count = r.u16()?;
    r.u16()?;
    let dict = Dictionary::read(&mut r)?;

    for node in dict.entries() {
        let record = node.data_offset as usize;
        r.seek_set(record);
        let name = read_name(&mut r, record)?;
        let kind = r.u32()?;
        let ty = r.u32()?;
        let comp_count = r.u8()?;
        let shift = r.u8()?;
        let _stride = r.u8()?;
        r.u8()?;
        let count = r.u16()? as usize;
        r.u16()?;
        let data_delta = r.i32()?;
        r.seek_set((record as i64 + data_delta as i64) as usize);

        if shift > 31 {
            return Err(SceneError::CorruptArchive {
                offset: record + 13,
                reason: format!("bad quantization shift {}", shift),
            });
        }

        match kind {
            KIND_POSITION | KIND_NORMAL | KIND_TEXCOORD => {
                let ty = ElementType::from_raw(ty).ok_or(SceneError::CorruptArchive {
                    offset: record + 8,
                    reason: format!("bad element type {}", ty),
                })?;
                let valid_comp = if kind == KIND_TEXCOORD {
                    matches!(comp_count, 1 | 2)
                } else {
                    matches!(comp_count, 2 | 3)
                };
                if !valid_comp {
                    return Err(SceneError::CorruptArchive {
                        offset: record + 12,
                        reason: format!("bad component count {}", comp_count),
                    });
                }
                let quant = Quantization {
                    ty,
                    comp_count,
                    shift,
                };
                match kind {
                    KIND_POSITION => scene.positions.push(PositionBuffer {
                        name,
                        quant,
                        data: read_vec3s(&quant, &mut r, count)?,
                    }),
                    KIND_NORMAL => scene.normals.push(NormalBuffer {
                        name,
                        quant,
                        data: read_vec3s(&quant, &mut r, count)?,
                    }),
                    _ => scene.texcoords.push(TexCoordBuffer {
                        name,
                        quant,
                        data: read_vec2s(&quant, &mut r, count)?,
                    }),
                }
            }
            KIND_COLOR => {
                let format = ColorFormat::from_raw(ty).ok_or(SceneError::CorruptArchive {
                    offset: record + 8,
                    reason: format!("bad color format {}", ty),
                })?;
                let mut colors = Vec::with_capacity(count);
                for _ in 0..count {
                    colors.push(read_color(format, &mut r)?);
                }
                scene.colors.push(ColorBuffer {
                    name,
                    format,
                    data: colors,
                });
            }
            other => {
                return Err(SceneError::CorruptArchive {
                    offset: record + 4,
                    reason: format!("bad vertex buffer kind {}", other),
                })
            }
        }
    }
    Ok(())
}

fn read_materials(scene: &mut Scene, data: &[u8], start: usize) -> Result<()> {
    let mut r = open_section(data, start, MAGIC_MATERIALS, SEC_MATERIALS)?;
    let _count = r.u16()?;
    r.u16()?;
    let dict = Dictionary::read(&mut r)?;

    for node in dict.entries() {
        let record = node.data_offset as usize;
        r.seek_set(record);
        let name = read_name(&mut r, record)?;
        let cull_raw = r.u32()?;
        let cull = CullMode::from_raw(cull_raw).ok_or(SceneError::CorruptArchive {
            offset: record + 4,
            reason: format!("bad cull mode {}", cull_raw),
        })?;
        let texture_count = r.u32()? as usize;
        let mut textures = Vec::with_capacity(texture_count);
        for _ in 0..texture_count {
            textures.push(TextureRef {
                name: read_name(&mut r, record)?,
            });
        }
        scene.materials.push(Material {
            name,
            cull,
            textures,
        });
    }
    Ok(())
}

fn read_meshes(scene: &mut Scene, data: &[u8], start: usize) -> Result<()> {
    let mut r = open_section(data, start, MAGIC_MESHES, SEC_MESHES)?;
    let _count = r.u16()?;
    r.u16()?;
    let dict = Dictionary::read(&mut r)?;

    for node in dict.entries() {
        let record = node.data_offset as usize;
        r.seek_set(record);
        let name = read_name(&mut r, record)?;
        let flags = r.u32()?;
        let position_buffer = read_name(&mut r, record)?;
        let normal_name = read_name(&mut r, record)?;
        let color_name = read_name(&mut r, record)?;
        let texcoord_name = read_name(&mut r, record)?;
        let (normal_buffer, color_buffer, texcoord_buffer) =
            mesh_buffers_from_flags(flags, normal_name, color_name, texcoord_name);

        let dm_count = r.u16()? as usize;
        let vertex_count = r.u16()? as usize;
        let mut draw_matrices = Vec::with_capacity(dm_count);
        for _ in 0..dm_count {
            draw_matrices.push(r.u16()?);
        }

        let mut vertices = Vec::with_capacity(vertex_count);
        for _ in 0..vertex_count {
            let mut v = VertexIndices {
                matrix_slot: r.u8()?,
                position: r.u16()?,
                ..Default::default()
            };
            if flags & ATTR_NORMAL != 0 {
                v.normal = r.u16()?;
            }
            if flags & ATTR_COLOR != 0 {
                v.color = r.u16()?;
            }
            if flags & ATTR_TEXCOORD != 0 {
                v.texcoord = r.u16()?;
            }
            vertices.push(v);
        }

        scene.meshes.push(Mesh {
            name,
            position_buffer,
            normal_buffer,
            color_buffer,
            texcoord_buffer,
            draw_matrices,
            vertices,
        });
    }
    Ok(())
}

fn read_textures(scene: &mut Scene, data: &[u8], start: usize) -> Result<()> {
    let mut r = open_section(data, start, MAGIC_TEXTURES, SEC_TEXTURES)?;
    let _count = r.u16()?;
    r.u16()?;
    let dict = Dictionary::read(&mut r)?;

    for node in dict.entries() {
        let record = node.data_offset as usize;
        r.seek_set(record);
        let name = read_name(&mut r, record)?;
        let width = r.u16()?;
        let height = r.u16()?;
        let format_raw = r.u32()?;
        let format = TextureFormat::from_raw(format_raw).ok_or(SceneError::CorruptArchive {
            offset: record + 8,
            reason: format!("bad texture format {}", format_raw),
        })?;
        let mip_count = r.u32()?;
        let data_size = r.u32()? as usize;
        let data_delta = r.i32()?;
        r.seek_set((record as i64 + data_delta as i64) as usize);
        let bytes = r.read_bytes(data_size)?.to_vec();

        scene.textures.push(Texture {
            name,
            width,
            height,
            format,
            mip_count,
            data: bytes,
        });
    }
    Ok(())
}

fn read_animations(scene: &mut Scene, data: &[u8], start: usize) -> Result<()> {
    let mut r = open_section(data, start, MAGIC_ANIMATIONS, SEC_ANIMATIONS)?;
    let _count = r.u16()?;
    r.u16()?;
    let dict = Dictionary::read(&mut r)?;

    for node in dict.entries() {
        let record = node.data_offset as usize;
        r.seek_set(record);
        let name = read_name(&mut r, record)?;
        let frame_count = r.u16()?;
        let looping = r.u16()? & 1 != 0;
        let track_count = r.u16()? as usize;
        r.u16()?;

        let mut tracks = Vec::with_capacity(track_count);
        for _ in 0..track_count {
            let target = read_name(&mut r, record)?;
            let kind_raw = r.u32()?;
            let kind = TrackKind::from_raw(kind_raw).ok_or(SceneError::CorruptArchive {
                offset: record,
                reason: format!("bad animation track kind {}", kind_raw),
            })?;
            let key_count = r.u16()? as usize;
            r.u16()?;
            let mut keyframes = Vec::with_capacity(key_count);
            for _ in 0..key_count {
                keyframes.push(Keyframe {
                    frame: r.f32()?,
                    value: r.f32()?,
                    tangent: r.f32()?,
                });
            }
            tracks.push(AnimationTrack {
                target,
                kind,
                keyframes,
            });
        }

        scene.animations.push(Animation {
            name,
            frame_count,
            looping,
            tracks,
        });
    }
    Ok(())
}

fn read_vec3(r: &mut BinReader<'_>) -> Result<Vec3> {
    Ok(Vec3::new(r.f32()?, r.f32()?, r.f32()?))
}
