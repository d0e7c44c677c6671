//! Material data

use serde::{Deserialize, Serialize};

/// Face culling mode (disc encoding 0-3, GX order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CullMode {
    None = 0,
    Front = 1,
    #[default]
    Back = 2,
    All = 3,
}

impl CullMode {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(CullMode::None),
            1 => Some(CullMode::Front),
            2 => Some(CullMode::Back),
            3 => Some(CullMode::All),
            _ => None,
        }
    }
}

/// A texture reference, by name.
///
/// Textures live in their own section; the link stage verifies every
/// reference resolves and fails with `MissingReference` otherwise. Indices
/// are looked up on demand (`Scene::texture_index`) rather than cached
/// here, so the model never holds a stale id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureRef {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    pub cull: CullMode,
    pub textures: Vec<TextureRef>,
}

impl Material {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_texture(mut self, texture: &str) -> Self {
        self.textures.push(TextureRef {
            name: texture.to_string(),
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let mat = Material::named("mat_0").with_texture("grass");
        assert_eq!(mat.cull, CullMode::Back);
        assert_eq!(mat.textures[0].name, "grass");
    }

    #[test]
    fn test_cull_from_raw() {
        assert_eq!(CullMode::from_raw(0), Some(CullMode::None));
        assert_eq!(CullMode::from_raw(4), None);
    }
}
