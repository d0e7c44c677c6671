//! Vertex buffers and quantization
//!
//! On disc, vertex attributes are packed fixed-point or packed-color data;
//! in memory they are plain floats. The quantization descriptor carried by
//! each buffer drives both directions. Buffer kinds are a tagged sum - one
//! struct per attribute class - resolved once at parse time, so no caller
//! ever dispatches on a raw pointer and a kind byte.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SceneError};
use crate::io::{BinReader, BinWriter};

/// Scalar storage type for position/normal/texcoord data (disc encoding
/// 0-4, in that order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementType {
    U8 = 0,
    S8 = 1,
    U16 = 2,
    S16 = 3,
    F32 = 4,
}

impl ElementType {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(ElementType::U8),
            1 => Some(ElementType::S8),
            2 => Some(ElementType::U16),
            3 => Some(ElementType::S16),
            4 => Some(ElementType::F32),
            _ => None,
        }
    }

    pub fn byte_size(self) -> usize {
        match self {
            ElementType::U8 | ElementType::S8 => 1,
            ElementType::U16 | ElementType::S16 => 2,
            ElementType::F32 => 4,
        }
    }
}

/// Packed color storage (disc encoding 0-5). Byte widths follow the GX
/// formats: 2 for the 16-bit packings, 3 for 24-bit, 4 for 32-bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorFormat {
    Rgb565 = 0,
    Rgb8 = 1,
    Rgbx8 = 2,
    Rgba4 = 3,
    Rgba6 = 4,
    Rgba8 = 5,
}

impl ColorFormat {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(ColorFormat::Rgb565),
            1 => Some(ColorFormat::Rgb8),
            2 => Some(ColorFormat::Rgbx8),
            3 => Some(ColorFormat::Rgba4),
            4 => Some(ColorFormat::Rgba6),
            5 => Some(ColorFormat::Rgba8),
            _ => None,
        }
    }

    pub fn byte_size(self) -> usize {
        match self {
            ColorFormat::Rgb565 | ColorFormat::Rgba4 => 2,
            ColorFormat::Rgb8 | ColorFormat::Rgba6 => 3,
            ColorFormat::Rgbx8 | ColorFormat::Rgba8 => 4,
        }
    }

    pub fn has_alpha(self) -> bool {
        matches!(self, ColorFormat::Rgba4 | ColorFormat::Rgba6 | ColorFormat::Rgba8)
    }
}

/// How scalar attribute data is packed on disc.
///
/// Fixed-point types divide the raw integer by `1 << shift`; `F32` ignores
/// the shift and always stores 0 there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quantization {
    pub ty: ElementType,
    pub comp_count: u8,
    pub shift: u8,
}

impl Quantization {
    pub fn f32(comp_count: u8) -> Self {
        Self {
            ty: ElementType::F32,
            comp_count,
            shift: 0,
        }
    }

    pub fn fixed(ty: ElementType, comp_count: u8, shift: u8) -> Self {
        Self {
            ty,
            comp_count,
            shift,
        }
    }

    pub fn stride(&self) -> usize {
        self.ty.byte_size() * self.comp_count as usize
    }

    fn divisor(&self) -> f32 {
        (1u32 << self.shift) as f32
    }

    pub(crate) fn write_scalar(&self, w: &mut BinWriter, value: f32) {
        match self.ty {
            ElementType::F32 => w.write_f32(value),
            ElementType::U8 => w.write_u8((value * self.divisor()).round() as u8),
            ElementType::S8 => w.write_u8((value * self.divisor()).round() as i8 as u8),
            ElementType::U16 => w.write_u16((value * self.divisor()).round() as u16),
            ElementType::S16 => w.write_i16((value * self.divisor()).round() as i16),
        }
    }

    pub(crate) fn read_scalar(&self, r: &mut BinReader<'_>) -> Result<f32> {
        Ok(match self.ty {
            ElementType::F32 => r.f32()?,
            ElementType::U8 => r.u8()? as f32 / self.divisor(),
            ElementType::S8 => r.u8()? as i8 as f32 / self.divisor(),
            ElementType::U16 => r.u16()? as f32 / self.divisor(),
            ElementType::S16 => r.i16()? as f32 / self.divisor(),
        })
    }

    pub(crate) fn validate(&self, kind: &'static str) -> Result<()> {
        if self.shift > 31 {
            return Err(SceneError::UnsupportedFeature(format!(
                "{} buffer shift {} out of range",
                kind, self.shift
            )));
        }
        if self.ty == ElementType::F32 && self.shift != 0 {
            return Err(SceneError::UnsupportedFeature(format!(
                "{} buffer: f32 data cannot carry a fixed-point shift",
                kind
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Buffer kinds
// =============================================================================

/// Disc tags for the buffer kinds stored in the vertex-data section.
pub(crate) const KIND_POSITION: u32 = 0;
pub(crate) const KIND_NORMAL: u32 = 1;
pub(crate) const KIND_COLOR: u32 = 2;
pub(crate) const KIND_TEXCOORD: u32 = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionBuffer {
    pub name: String,
    pub quant: Quantization,
    pub data: Vec<Vec3>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalBuffer {
    pub name: String,
    pub quant: Quantization,
    pub data: Vec<Vec3>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorBuffer {
    pub name: String,
    pub format: ColorFormat,
    /// RGBA, one byte per channel; formats without alpha read back 255.
    pub data: Vec<[u8; 4]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TexCoordBuffer {
    pub name: String,
    pub quant: Quantization,
    pub data: Vec<Vec2>,
}

impl PositionBuffer {
    pub fn f32(name: &str, data: Vec<Vec3>) -> Self {
        Self {
            name: name.to_string(),
            quant: Quantization::f32(3),
            data,
        }
    }
}

impl NormalBuffer {
    /// The customary normal packing: s16 with a 14-bit fractional part.
    pub fn s16(name: &str, data: Vec<Vec3>) -> Self {
        Self {
            name: name.to_string(),
            quant: Quantization::fixed(ElementType::S16, 3, 14),
            data,
        }
    }
}

pub(crate) fn write_vec3s(
    quant: &Quantization,
    w: &mut BinWriter,
    data: &[Vec3],
) -> Result<()> {
    match quant.comp_count {
        3 => {
            if quant.ty == ElementType::F32 {
                // Contiguous floats take the bulk path
                for &f in bytemuck::cast_slice::<Vec3, f32>(data) {
                    w.write_f32(f);
                }
            } else {
                for v in data {
                    quant.write_scalar(w, v.x);
                    quant.write_scalar(w, v.y);
                    quant.write_scalar(w, v.z);
                }
            }
        }
        2 => {
            for v in data {
                quant.write_scalar(w, v.x);
                quant.write_scalar(w, v.y);
            }
        }
        n => {
            return Err(SceneError::UnsupportedFeature(format!(
                "{}-component vec3 buffer",
                n
            )))
        }
    }
    Ok(())
}

pub(crate) fn read_vec3s(
    quant: &Quantization,
    r: &mut BinReader<'_>,
    count: usize,
) -> Result<Vec<Vec3>> {
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let x = quant.read_scalar(r)?;
        let y = quant.read_scalar(r)?;
        let z = if quant.comp_count == 3 {
            quant.read_scalar(r)?
        } else {
            0.0
        };
        out.push(Vec3::new(x, y, z));
    }
    Ok(out)
}

pub(crate) fn write_vec2s(
    quant: &Quantization,
    w: &mut BinWriter,
    data: &[Vec2],
) -> Result<()> {
    match quant.comp_count {
        2 => {
            for v in data {
                quant.write_scalar(w, v.x);
                quant.write_scalar(w, v.y);
            }
        }
        1 => {
            for v in data {
                quant.write_scalar(w, v.x);
            }
        }
        n => {
            return Err(SceneError::UnsupportedFeature(format!(
                "{}-component texcoord buffer",
                n
            )))
        }
    }
    Ok(())
}

pub(crate) fn read_vec2s(
    quant: &Quantization,
    r: &mut BinReader<'_>,
    count: usize,
) -> Result<Vec<Vec2>> {
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let x = quant.read_scalar(r)?;
        let y = if quant.comp_count == 2 {
            quant.read_scalar(r)?
        } else {
            0.0
        };
        out.push(Vec2::new(x, y));
    }
    Ok(out)
}

// =============================================================================
// Color packing
// =============================================================================

fn expand_bits(value: u16, bits: u32) -> u8 {
    // Bit replication so full-scale values expand to exactly 255
    let v = value as u32;
    ((v << (8 - bits) | v >> (2 * bits - 8)) & 0xFF) as u8
}

pub(crate) fn write_color(format: ColorFormat, w: &mut BinWriter, rgba: [u8; 4]) {
    let [r, g, b, a] = rgba;
    match format {
        ColorFormat::Rgb565 => {
            let packed = ((r as u16 >> 3) << 11) | ((g as u16 >> 2) << 5) | (b as u16 >> 3);
            w.write_u16(packed);
        }
        ColorFormat::Rgb8 => {
            w.write_u8(r);
            w.write_u8(g);
            w.write_u8(b);
        }
        ColorFormat::Rgbx8 => {
            w.write_u8(r);
            w.write_u8(g);
            w.write_u8(b);
            w.write_u8(0);
        }
        ColorFormat::Rgba4 => {
            let packed = ((r as u16 >> 4) << 12)
                | ((g as u16 >> 4) << 8)
                | ((b as u16 >> 4) << 4)
                | (a as u16 >> 4);
            w.write_u16(packed);
        }
        ColorFormat::Rgba6 => {
            let packed = ((r as u32 >> 2) << 18)
                | ((g as u32 >> 2) << 12)
                | ((b as u32 >> 2) << 6)
                | (a as u32 >> 2);
            w.write_u8((packed >> 16) as u8);
            w.write_u8((packed >> 8) as u8);
            w.write_u8(packed as u8);
        }
        ColorFormat::Rgba8 => {
            w.write_bytes(&rgba);
        }
    }
}

pub(crate) fn read_color(format: ColorFormat, r: &mut BinReader<'_>) -> Result<[u8; 4]> {
    Ok(match format {
        ColorFormat::Rgb565 => {
            let packed = r.u16()?;
            [
                expand_bits(packed >> 11, 5),
                expand_bits((packed >> 5) & 0x3F, 6),
                expand_bits(packed & 0x1F, 5),
                255,
            ]
        }
        ColorFormat::Rgb8 => [r.u8()?, r.u8()?, r.u8()?, 255],
        ColorFormat::Rgbx8 => {
            let out = [r.u8()?, r.u8()?, r.u8()?, 255];
            r.u8()?;
            out
        }
        ColorFormat::Rgba4 => {
            let packed = r.u16()?;
            [
                expand_bits(packed >> 12, 4),
                expand_bits((packed >> 8) & 0xF, 4),
                expand_bits((packed >> 4) & 0xF, 4),
                expand_bits(packed & 0xF, 4),
            ]
        }
        ColorFormat::Rgba6 => {
            let packed =
                ((r.u8()? as u32) << 16) | ((r.u8()? as u32) << 8) | r.u8()? as u32;
            [
                expand_bits(((packed >> 18) & 0x3F) as u16, 6),
                expand_bits(((packed >> 12) & 0x3F) as u16, 6),
                expand_bits(((packed >> 6) & 0x3F) as u16, 6),
                expand_bits((packed & 0x3F) as u16, 6),
            ]
        }
        ColorFormat::Rgba8 => {
            let b = r.read_bytes(4)?;
            [b[0], b[1], b[2], b[3]]
        }
    })
}
