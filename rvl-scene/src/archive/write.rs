//! Scene archive serializer
//!
//! Layout is two-pass throughout: sections are emitted with zeroed offset
//! fields and patched once their targets exist, and every name reference
//! funnels through one archive-wide `NameTable` that is pooled and resolved
//! after the last section. The table and the per-section dictionaries are
//! constructed fresh per call; sharing them across archives would
//! cross-contaminate name pools.

use glam::Vec3;
use hashbrown::HashMap;

use super::*;
use crate::dict::Dictionary;
use crate::error::{Result, SceneError};
use crate::io::BinWriter;
use crate::model::{
    rotation_to_fixed, write_color, write_vec2s, write_vec3s, DisplayCommand, Mesh, Scene,
    KIND_COLOR, KIND_NORMAL, KIND_POSITION, KIND_TEXCOORD,
};
use crate::names::{write_name_forward, NameTable};

impl Scene {
    /// Serialize the scene to one archive image.
    ///
    /// # Errors
    /// * `SectionTooLarge` - a count overflows its serialized field width
    /// * `UnsupportedFeature` - a construct the format cannot express
    /// * `MissingReference` - a dangling cross-section reference
    pub fn write(&self) -> Result<Vec<u8>> {
        self.validate_for_write()?;
        check_links(self)?;

        let mut w = BinWriter::new();
        let mut names = NameTable::new();

        w.write_u32(ARCHIVE_MAGIC);
        let size_field = w.reserve_u32();
        w.write_u16(ARCHIVE_VERSION);

        let sections = self.present_sections();
        w.write_u16(sections.len() as u16);
        write_name_forward(&mut names, &mut w, 0, &self.name, true);

        let mut dict = Dictionary::new();
        for section in &sections {
            dict.add(section);
        }
        let written = dict.write(&mut w, &mut names);

        for (i, section) in sections.iter().enumerate() {
            w.align(4);
            let start = w.tell();
            match *section {
                SEC_BONES => self.write_bones(&mut w, &mut names),
                SEC_DRAW_MATRICES => self.write_draw_matrices(&mut w),
                SEC_VERTEX_DATA => self.write_vertex_data(&mut w, &mut names)?,
                SEC_MATERIALS => self.write_materials(&mut w, &mut names),
                SEC_MESHES => self.write_meshes(&mut w, &mut names),
                SEC_TEXTURES => self.write_textures(&mut w, &mut names),
                SEC_ANIMATIONS => self.write_animations(&mut w, &mut names),
                _ => unreachable!(),
            }
            written.patch_entry(&mut w, i, start);
        }

        w.align(4);
        names.pool_names();
        let pool_base = w.tell() as u32;
        let pool = names.pool().to_vec();
        w.write_bytes(&pool);
        names.resolve(&mut w, pool_base);

        let total = w.tell() as u32;
        w.write_u32_at(size_field, total);
        Ok(w.into_bytes())
    }

    fn present_sections(&self) -> Vec<&'static str> {
        let mut sections = Vec::new();
        if !self.bones.is_empty() {
            sections.push(SEC_BONES);
        }
        if !self.draw_matrices.is_empty() {
            sections.push(SEC_DRAW_MATRICES);
        }
        if !self.positions.is_empty()
            || !self.normals.is_empty()
            || !self.colors.is_empty()
            || !self.texcoords.is_empty()
        {
            sections.push(SEC_VERTEX_DATA);
        }
        if !self.materials.is_empty() {
            sections.push(SEC_MATERIALS);
        }
        if !self.meshes.is_empty() {
            sections.push(SEC_MESHES);
        }
        if !self.textures.is_empty() {
            sections.push(SEC_TEXTURES);
        }
        if !self.animations.is_empty() {
            sections.push(SEC_ANIMATIONS);
        }
        sections
    }

    fn validate_for_write(&self) -> Result<()> {
        fn width_check(section: &'static str, count: usize) -> Result<()> {
            if count > MAX_U16 {
                return Err(SceneError::SectionTooLarge {
                    section,
                    count,
                    max: MAX_U16,
                });
            }
            Ok(())
        }

        width_check(SEC_BONES, self.bones.len())?;
        let display_total: usize = self.bones.iter().map(|b| b.displays.len()).sum();
        width_check(SEC_BONES, display_total)?;

        width_check(SEC_DRAW_MATRICES, self.draw_matrices.len())?;
        for dm in &self.draw_matrices {
            if dm.weights.is_empty() {
                return Err(SceneError::UnsupportedFeature(
                    "draw matrix with no weights".into(),
                ));
            }
            if dm.weights.len() > 255 {
                return Err(SceneError::SectionTooLarge {
                    section: SEC_DRAW_MATRICES,
                    count: dm.weights.len(),
                    max: 255,
                });
            }
        }

        let buffer_count = self.positions.len()
            + self.normals.len()
            + self.colors.len()
            + self.texcoords.len();
        width_check(SEC_VERTEX_DATA, buffer_count)?;
        for buffer in &self.positions {
            buffer.quant.validate("position")?;
            width_check(SEC_VERTEX_DATA, buffer.data.len())?;
        }
        for buffer in &self.normals {
            buffer.quant.validate("normal")?;
            width_check(SEC_VERTEX_DATA, buffer.data.len())?;
        }
        for buffer in &self.colors {
            width_check(SEC_VERTEX_DATA, buffer.data.len())?;
        }
        for buffer in &self.texcoords {
            buffer.quant.validate("texcoord")?;
            width_check(SEC_VERTEX_DATA, buffer.data.len())?;
        }
        self.check_buffer_names_unique()?;

        width_check(SEC_MATERIALS, self.materials.len())?;

        width_check(SEC_MESHES, self.meshes.len())?;
        for mesh in &self.meshes {
            width_check(SEC_MESHES, mesh.vertices.len())?;
            width_check(SEC_MESHES, mesh.draw_matrices.len())?;
            if mesh.position_buffer.is_empty() {
                return Err(SceneError::UnsupportedFeature(format!(
                    "mesh '{}' has no position buffer",
                    mesh.name
                )));
            }
        }

        width_check(SEC_TEXTURES, self.textures.len())?;
        for texture in &self.textures {
            let needed = texture
                .format
                .encoded_size(texture.width as usize, texture.height as usize);
            if texture.data.len() < needed {
                return Err(SceneError::UnsupportedFeature(format!(
                    "texture '{}' holds {} bytes, format needs {}",
                    texture.name,
                    texture.data.len(),
                    needed
                )));
            }
        }

        width_check(SEC_ANIMATIONS, self.animations.len())?;
        for animation in &self.animations {
            width_check(SEC_ANIMATIONS, animation.tracks.len())?;
            for track in &animation.tracks {
                width_check(SEC_ANIMATIONS, track.keyframes.len())?;
            }
        }

        Ok(())
    }

    fn check_buffer_names_unique(&self) -> Result<()> {
        let mut seen = hashbrown::HashSet::new();
        let all = self
            .positions
            .iter()
            .map(|b| &b.name)
            .chain(self.normals.iter().map(|b| &b.name))
            .chain(self.colors.iter().map(|b| &b.name))
            .chain(self.texcoords.iter().map(|b| &b.name));
        for name in all {
            if !seen.insert(name) {
                return Err(SceneError::UnsupportedFeature(format!(
                    "duplicate vertex buffer name '{}'",
                    name
                )));
            }
        }
        Ok(())
    }

    // =========================================================================
    // Sections
    // =========================================================================

    fn write_bones(&self, w: &mut BinWriter, names: &mut NameTable) {
        let start = w.tell();
        w.write_u32(MAGIC_BONES);
        let size_field = w.reserve_u32();

        let count = self.bones.len();
        w.write_u16(count as u16);
        w.write_u16(0);
        let ofs_records = w.reserve_u32();
        let ofs_lut = w.reserve_u32();
        let ofs_inverse_bind = w.reserve_u32();
        let ofs_displays = w.reserve_u32();

        // Records live in slot order; the LUT says which logical bone
        // occupies each slot
        let mut display_pool: Vec<DisplayCommand> = Vec::new();
        w.write_u32_at(ofs_records, (w.tell() - start) as u32);
        for slot in 0..count {
            let bone = &self.bones[self.joint_at_slot(slot)];
            let record_start = w.tell() as u32;
            write_name_forward(names, w, record_start, &bone.name, false);
            w.write_u16((bone.billboard as u16) << 4);
            w.write_u8(bone.ssc as u8);
            w.write_u8(0xFF);
            write_vec3(w, bone.scale);
            w.write_i16(rotation_to_fixed(bone.rotation.x));
            w.write_i16(rotation_to_fixed(bone.rotation.y));
            w.write_i16(rotation_to_fixed(bone.rotation.z));
            w.write_u16(0xFFFF);
            write_vec3(w, bone.translation);
            w.write_f32(bone.bounding_radius);
            write_vec3(w, bone.aabb.min);
            write_vec3(w, bone.aabb.max);
            w.write_i32(bone.parent);
            w.write_u16(bone.displays.len() as u16);
            w.write_u16(display_pool.len() as u16);
            display_pool.extend_from_slice(&bone.displays);
        }

        w.write_u32_at(ofs_lut, (w.tell() - start) as u32);
        for slot in 0..count {
            let logical = if self.joint_lut.is_empty() {
                slot as u16
            } else {
                self.joint_lut[slot]
            };
            w.write_u16(logical);
        }

        w.align(4);
        w.write_u32_at(ofs_inverse_bind, (w.tell() - start) as u32);
        for slot in 0..count {
            let bone = &self.bones[self.joint_at_slot(slot)];
            for value in bone.inverse_bind {
                w.write_f32(value);
            }
        }

        w.write_u32_at(ofs_displays, (w.tell() - start) as u32);
        for display in &display_pool {
            w.write_u16(display.material);
            w.write_u16(display.mesh);
        }

        w.write_u32_at(size_field, (w.tell() - start) as u32);
    }

    fn write_draw_matrices(&self, w: &mut BinWriter) {
        let start = w.tell();
        w.write_u32(MAGIC_DRAW_MATRICES);
        let size_field = w.reserve_u32();

        // Smooth envelopes dedup into a shared pool; rigid entries index
        // bones directly
        let mut envelope_ids: HashMap<Vec<(u16, u32)>, u16> = HashMap::new();
        let mut envelopes: Vec<usize> = Vec::new();
        let mut kinds: Vec<u8> = Vec::with_capacity(self.draw_matrices.len());
        let mut indices: Vec<u16> = Vec::with_capacity(self.draw_matrices.len());

        for (i, dm) in self.draw_matrices.iter().enumerate() {
            if dm.is_rigid() {
                kinds.push(0);
                indices.push(dm.weights[0].bone);
            } else {
                let id = *envelope_ids.entry(dm.dedup_key()).or_insert_with(|| {
                    envelopes.push(i);
                    (envelopes.len() - 1) as u16
                });
                kinds.push(1);
                indices.push(id);
            }
        }

        w.write_u16(self.draw_matrices.len() as u16);
        w.write_u16(envelopes.len() as u16);
        let ofs_kinds = w.reserve_u32();
        let ofs_indices = w.reserve_u32();
        let ofs_env_sizes = w.reserve_u32();
        let ofs_env_bones = w.reserve_u32();
        let ofs_env_weights = w.reserve_u32();

        w.write_u32_at(ofs_kinds, (w.tell() - start) as u32);
        w.write_bytes(&kinds);

        w.align(2);
        w.write_u32_at(ofs_indices, (w.tell() - start) as u32);
        for index in &indices {
            w.write_u16(*index);
        }

        w.write_u32_at(ofs_env_sizes, (w.tell() - start) as u32);
        for &envelope in &envelopes {
            w.write_u8(self.draw_matrices[envelope].weights.len() as u8);
        }

        w.align(2);
        w.write_u32_at(ofs_env_bones, (w.tell() - start) as u32);
        for &envelope in &envelopes {
            for weight in &self.draw_matrices[envelope].weights {
                w.write_u16(weight.bone);
            }
        }

        w.align(4);
        w.write_u32_at(ofs_env_weights, (w.tell() - start) as u32);
        for &envelope in &envelopes {
            for weight in &self.draw_matrices[envelope].weights {
                w.write_f32(weight.weight);
            }
        }

        w.write_u32_at(size_field, (w.tell() - start) as u32);
    }

    fn write_vertex_data(&self, w: &mut BinWriter, names: &mut NameTable) -> Result<()> {
        let start = w.tell();
        w.write_u32(MAGIC_VERTEX_DATA);
        let size_field = w.reserve_u32();

        let count = self.positions.len()
            + self.normals.len()
            + self.colors.len()
            + self.texcoords.len();
        w.write_u16(count as u16);
        w.write_u16(0);

        let mut dict = Dictionary::new();
        for buffer in &self.positions {
            dict.add(&buffer.name);
        }
        for buffer in &self.normals {
            dict.add(&buffer.name);
        }
        for buffer in &self.colors {
            dict.add(&buffer.name);
        }
        for buffer in &self.texcoords {
            dict.add(&buffer.name);
        }
        let written = dict.write(w, names);

        let mut entry = 0;
        for buffer in &self.positions {
            begin_buffer_record(
                w,
                names,
                &written,
                &mut entry,
                &buffer.name,
                KIND_POSITION,
                buffer.quant.ty as u32,
                buffer.quant.comp_count,
                buffer.quant.shift,
                buffer.quant.stride() as u8,
                buffer.data.len(),
            );
            write_vec3s(&buffer.quant, w, &buffer.data)?;
        }
        for buffer in &self.normals {
            begin_buffer_record(
                w,
                names,
                &written,
                &mut entry,
                &buffer.name,
                KIND_NORMAL,
                buffer.quant.ty as u32,
                buffer.quant.comp_count,
                buffer.quant.shift,
                buffer.quant.stride() as u8,
                buffer.data.len(),
            );
            write_vec3s(&buffer.quant, w, &buffer.data)?;
        }
        for buffer in &self.colors {
            let comp = if buffer.format.has_alpha() { 4 } else { 3 };
            begin_buffer_record(
                w,
                names,
                &written,
                &mut entry,
                &buffer.name,
                KIND_COLOR,
                buffer.format as u32,
                comp,
                0,
                buffer.format.byte_size() as u8,
                buffer.data.len(),
            );
            for &rgba in &buffer.data {
                write_color(buffer.format, w, rgba);
            }
        }
        for buffer in &self.texcoords {
            begin_buffer_record(
                w,
                names,
                &written,
                &mut entry,
                &buffer.name,
                KIND_TEXCOORD,
                buffer.quant.ty as u32,
                buffer.quant.comp_count,
                buffer.quant.shift,
                buffer.quant.stride() as u8,
                buffer.data.len(),
            );
            write_vec2s(&buffer.quant, w, &buffer.data)?;
        }

        w.write_u32_at(size_field, (w.tell() - start) as u32);
        Ok(())
    }

    fn write_materials(&self, w: &mut BinWriter, names: &mut NameTable) {
        let start = w.tell();
        w.write_u32(MAGIC_MATERIALS);
        let size_field = w.reserve_u32();
        w.write_u16(self.materials.len() as u16);
        w.write_u16(0);

        let mut dict = Dictionary::new();
        for material in &self.materials {
            dict.add(&material.name);
        }
        let written = dict.write(w, names);

        for (i, material) in self.materials.iter().enumerate() {
            w.align(4);
            let record = w.tell();
            written.patch_entry(w, i, record);
            write_name_forward(names, w, record as u32, &material.name, false);
            w.write_u32(material.cull as u32);
            w.write_u32(material.textures.len() as u32);
            for texture in &material.textures {
                write_name_forward(names, w, record as u32, &texture.name, false);
            }
        }

        w.write_u32_at(size_field, (w.tell() - start) as u32);
    }

    fn write_meshes(&self, w: &mut BinWriter, names: &mut NameTable) {
        let start = w.tell();
        w.write_u32(MAGIC_MESHES);
        let size_field = w.reserve_u32();
        w.write_u16(self.meshes.len() as u16);
        w.write_u16(0);

        let mut dict = Dictionary::new();
        for mesh in &self.meshes {
            dict.add(&mesh.name);
        }
        let written = dict.write(w, names);

        for (i, mesh) in self.meshes.iter().enumerate() {
            w.align(4);
            let record = w.tell();
            written.patch_entry(w, i, record);
            self.write_mesh_record(w, names, mesh, record as u32);
        }

        w.write_u32_at(size_field, (w.tell() - start) as u32);
    }

    fn write_mesh_record(
        &self,
        w: &mut BinWriter,
        names: &mut NameTable,
        mesh: &Mesh,
        record: u32,
    ) {
        let flags = mesh.attribute_flags();
        write_name_forward(names, w, record, &mesh.name, false);
        w.write_u32(flags);
        write_name_forward(names, w, record, &mesh.position_buffer, false);
        write_name_forward(names, w, record, mesh.normal_buffer.as_deref().unwrap_or(""), false);
        write_name_forward(names, w, record, mesh.color_buffer.as_deref().unwrap_or(""), false);
        write_name_forward(
            names,
            w,
            record,
            mesh.texcoord_buffer.as_deref().unwrap_or(""),
            false,
        );
        w.write_u16(mesh.draw_matrices.len() as u16);
        w.write_u16(mesh.vertices.len() as u16);
        for &dm in &mesh.draw_matrices {
            w.write_u16(dm);
        }
        for vertex in &mesh.vertices {
            w.write_u8(vertex.matrix_slot);
            w.write_u16(vertex.position);
            if mesh.normal_buffer.is_some() {
                w.write_u16(vertex.normal);
            }
            if mesh.color_buffer.is_some() {
                w.write_u16(vertex.color);
            }
            if mesh.texcoord_buffer.is_some() {
                w.write_u16(vertex.texcoord);
            }
        }
    }

    fn write_textures(&self, w: &mut BinWriter, names: &mut NameTable) {
        let start = w.tell();
        w.write_u32(MAGIC_TEXTURES);
        let size_field = w.reserve_u32();
        w.write_u16(self.textures.len() as u16);
        w.write_u16(0);

        let mut dict = Dictionary::new();
        for texture in &self.textures {
            dict.add(&texture.name);
        }
        let written = dict.write(w, names);

        for (i, texture) in self.textures.iter().enumerate() {
            w.align(4);
            let record = w.tell();
            written.patch_entry(w, i, record);
            write_name_forward(names, w, record as u32, &texture.name, true);
            w.write_u16(texture.width);
            w.write_u16(texture.height);
            w.write_u32(texture.format as u32);
            w.write_u32(texture.mip_count);
            w.write_u32(texture.data.len() as u32);
            // Data follows the fixed fields directly
            w.write_i32(0x18);
            w.write_bytes(&texture.data);
        }

        w.write_u32_at(size_field, (w.tell() - start) as u32);
    }

    fn write_animations(&self, w: &mut BinWriter, names: &mut NameTable) {
        let start = w.tell();
        w.write_u32(MAGIC_ANIMATIONS);
        let size_field = w.reserve_u32();
        w.write_u16(self.animations.len() as u16);
        w.write_u16(0);

        let mut dict = Dictionary::new();
        for animation in &self.animations {
            dict.add(&animation.name);
        }
        let written = dict.write(w, names);

        for (i, animation) in self.animations.iter().enumerate() {
            w.align(4);
            let record = w.tell();
            written.patch_entry(w, i, record);
            write_name_forward(names, w, record as u32, &animation.name, false);
            w.write_u16(animation.frame_count);
            w.write_u16(animation.looping as u16);
            w.write_u16(animation.tracks.len() as u16);
            w.write_u16(0);
            for track in &animation.tracks {
                write_name_forward(names, w, record as u32, &track.target, false);
                w.write_u32(track.kind as u32);
                w.write_u16(track.keyframes.len() as u16);
                w.write_u16(0);
                for key in &track.keyframes {
                    w.write_f32(key.frame);
                    w.write_f32(key.value);
                    w.write_f32(key.tangent);
                }
            }
        }

        w.write_u32_at(size_field, (w.tell() - start) as u32);
    }
}

fn write_vec3(w: &mut BinWriter, v: Vec3) {
    w.write_f32(v.x);
    w.write_f32(v.y);
    w.write_f32(v.z);
}

#[allow(clippy::too_many_arguments)]
fn begin_buffer_record(
    w: &mut BinWriter,
    names: &mut NameTable,
    written: &crate::dict::WrittenDict,
    entry: &mut usize,
    name: &str,
    kind: u32,
    ty: u32,
    comp_count: u8,
    shift: u8,
    stride: u8,
    count: usize,
) {
    w.align(4);
    let record = w.tell();
    written.patch_entry(w, *entry, record);
    *entry += 1;

    write_name_forward(names, w, record as u32, name, false);
    w.write_u32(kind);
    w.write_u32(ty);
    w.write_u8(comp_count);
    w.write_u8(shift);
    w.write_u8(stride);
    w.write_u8(0);
    w.write_u16(count as u16);
    w.write_u16(0);
    // Data follows the fixed fields directly
    w.write_i32(0x18);
}
