//! Bone (joint) data

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// How the runtime orients a bone's subtree toward the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BillboardMode {
    #[default]
    None = 0,
    /// Face the camera around all axes
    Billboard = 1,
    /// Face the camera around the Y axis only
    BillboardY = 2,
}

impl BillboardMode {
    pub fn from_raw(raw: u16) -> Option<Self> {
        match raw {
            0 => Some(BillboardMode::None),
            1 => Some(BillboardMode::Billboard),
            2 => Some(BillboardMode::BillboardY),
            _ => None,
        }
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

/// A (material, mesh) pair the renderer draws under this bone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayCommand {
    pub material: u16,
    pub mesh: u16,
}

/// One joint of the skeleton.
///
/// Rotation is kept in degrees; on disc each component is a signed 16-bit
/// fixed-point value scaled by `0x7FFF / 180`, so sub-quantum precision
/// does not survive a write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bone {
    pub name: String,
    pub billboard: BillboardMode,
    /// Maya segment-scale-compensation. Legacy archives store 0xFF for
    /// "unset", which reads as false.
    pub ssc: bool,
    pub scale: Vec3,
    pub rotation: Vec3,
    pub translation: Vec3,
    pub bounding_radius: f32,
    pub aabb: Aabb,
    /// Logical index of the parent bone, -1 for roots.
    pub parent: i32,
    /// Ordered logical indices of child bones.
    pub children: Vec<u16>,
    pub displays: Vec<DisplayCommand>,
    /// Inverse bind matrix, 3x4 row-major.
    pub inverse_bind: [f32; 12],
}

pub(crate) const IDENTITY_INVERSE_BIND: [f32; 12] =
    [1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0];

impl Default for Bone {
    fn default() -> Self {
        Self {
            name: String::new(),
            billboard: BillboardMode::None,
            ssc: false,
            scale: Vec3::ONE,
            rotation: Vec3::ZERO,
            translation: Vec3::ZERO,
            bounding_radius: 0.0,
            aabb: Aabb::default(),
            parent: -1,
            children: Vec::new(),
            displays: Vec::new(),
            inverse_bind: IDENTITY_INVERSE_BIND,
        }
    }
}

impl Bone {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }
}

/// Degrees to the disc's s16 fixed-point rotation unit.
pub(crate) fn rotation_to_fixed(degrees: f32) -> i16 {
    (degrees * (0x7FFF as f32) / 180.0).round() as i16
}

/// The disc's s16 fixed-point rotation unit back to degrees.
pub(crate) fn rotation_from_fixed(raw: i16) -> f32 {
    raw as f32 / (0x7FFF as f32) * 180.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_fixed_zero() {
        assert_eq!(rotation_to_fixed(0.0), 0);
        assert_eq!(rotation_from_fixed(0), 0.0);
    }

    #[test]
    fn test_rotation_fixed_quantization() {
        // Quantization error stays under one fixed-point step
        for degrees in [90.0f32, -45.0, 179.9, -180.0] {
            let decoded = rotation_from_fixed(rotation_to_fixed(degrees));
            assert!(
                (decoded - degrees).abs() < 0.006,
                "{} decoded to {}",
                degrees,
                decoded
            );
        }
    }

    #[test]
    fn test_rotation_fixed_stable() {
        // Values already on the grid survive a re-encode exactly
        for raw in [-0x7FFF, -1234, 0, 1, 0x7FFF] {
            let raw = raw as i16;
            assert_eq!(rotation_to_fixed(rotation_from_fixed(raw)), raw);
        }
    }

    #[test]
    fn test_billboard_from_raw() {
        assert_eq!(BillboardMode::from_raw(1), Some(BillboardMode::Billboard));
        assert_eq!(BillboardMode::from_raw(9), None);
    }
}
