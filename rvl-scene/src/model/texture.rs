//! Texture metadata
//!
//! Pixel content is opaque here - decoding CMPR blocks or palette formats
//! belongs to a pixel codec, not the container. The only format knowledge
//! the archive needs is encoded-size arithmetic, to size and bounds-check
//! the data spans it carries.

use serde::{Deserialize, Serialize};

/// GX texture formats (disc encoding shown; the gap before Cmpr is real).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextureFormat {
    I4 = 0,
    I8 = 1,
    Ia4 = 2,
    Ia8 = 3,
    Rgb565 = 4,
    Rgb5a3 = 5,
    Rgba8 = 6,
    Cmpr = 14,
}

impl TextureFormat {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(TextureFormat::I4),
            1 => Some(TextureFormat::I8),
            2 => Some(TextureFormat::Ia4),
            3 => Some(TextureFormat::Ia8),
            4 => Some(TextureFormat::Rgb565),
            5 => Some(TextureFormat::Rgb5a3),
            6 => Some(TextureFormat::Rgba8),
            14 => Some(TextureFormat::Cmpr),
            _ => None,
        }
    }

    /// Tile dimensions in texels.
    pub fn block_size(self) -> (usize, usize) {
        match self {
            TextureFormat::I4 | TextureFormat::Cmpr => (8, 8),
            TextureFormat::I8 | TextureFormat::Ia4 => (8, 4),
            TextureFormat::Ia8
            | TextureFormat::Rgb565
            | TextureFormat::Rgb5a3
            | TextureFormat::Rgba8 => (4, 4),
        }
    }

    /// Bytes per tile. RGBA8 tiles span two 32-byte cache lines.
    pub fn block_bytes(self) -> usize {
        match self {
            TextureFormat::Rgba8 => 64,
            _ => 32,
        }
    }

    /// Encoded byte size of one mip level, rounded up to whole tiles.
    pub fn encoded_size(self, width: usize, height: usize) -> usize {
        let (bw, bh) = self.block_size();
        width.div_ceil(bw) * height.div_ceil(bh) * self.block_bytes()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Texture {
    pub name: String,
    pub width: u16,
    pub height: u16,
    pub format: TextureFormat,
    pub mip_count: u32,
    /// Raw encoded texel data, all mip levels concatenated.
    #[serde(with = "serde_bytes_vec")]
    pub data: Vec<u8>,
}

impl Texture {
    pub fn new(name: &str, width: u16, height: u16, format: TextureFormat) -> Self {
        Self {
            name: name.to_string(),
            width,
            height,
            format,
            mip_count: 1,
            data: vec![0; format.encoded_size(width as usize, height as usize)],
        }
    }
}

/// Keeps texel payloads readable in JSON dumps without one array element
/// per byte.
mod serde_bytes_vec {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], ser: S) -> Result<S::Ok, S::Error> {
        let mut hex = String::with_capacity(data.len() * 2);
        for byte in data {
            hex.push_str(&format!("{:02x}", byte));
        }
        ser.serialize_str(&hex)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<u8>, D::Error> {
        let hex = String::deserialize(de)?;
        if hex.len() % 2 != 0 {
            return Err(serde::de::Error::custom("odd-length hex string"));
        }
        (0..hex.len())
            .step_by(2)
            .map(|i| {
                u8::from_str_radix(&hex[i..i + 2], 16)
                    .map_err(|_| serde::de::Error::custom("invalid hex byte"))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoded_size_cmpr() {
        // 8x8 tiles of 32 bytes: half a byte per texel
        assert_eq!(TextureFormat::Cmpr.encoded_size(64, 64), 2048);
        // Dimensions round up to whole tiles
        assert_eq!(TextureFormat::Cmpr.encoded_size(65, 1), 9 * 32);
    }

    #[test]
    fn test_encoded_size_rgba8() {
        assert_eq!(TextureFormat::Rgba8.encoded_size(4, 4), 64);
        assert_eq!(TextureFormat::Rgba8.encoded_size(16, 16), 1024);
    }

    #[test]
    fn test_encoded_size_i4() {
        assert_eq!(TextureFormat::I4.encoded_size(8, 8), 32);
        assert_eq!(TextureFormat::I4.encoded_size(16, 8), 64);
    }

    #[test]
    fn test_new_sizes_data() {
        let tex = Texture::new("grass", 32, 32, TextureFormat::Cmpr);
        assert_eq!(tex.data.len(), 512);
    }

    #[test]
    fn test_from_raw_gap() {
        assert_eq!(TextureFormat::from_raw(6), Some(TextureFormat::Rgba8));
        assert_eq!(TextureFormat::from_raw(7), None);
        assert_eq!(TextureFormat::from_raw(14), Some(TextureFormat::Cmpr));
    }
}
