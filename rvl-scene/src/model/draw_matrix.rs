//! Draw matrices (skinning envelopes)

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// One bone's contribution to a draw matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoneWeight {
    pub bone: u16,
    pub weight: f32,
}

/// A per-vertex weighted combination of bones.
///
/// A single entry with weight 1.0 is a rigid binding - the vertex follows
/// one bone directly. Multiple entries are a smooth-skinning envelope;
/// identical envelopes are collapsed into a shared pool when serialized.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DrawMatrix {
    pub weights: SmallVec<[BoneWeight; 4]>,
}

impl DrawMatrix {
    pub fn rigid(bone: u16) -> Self {
        Self {
            weights: SmallVec::from_slice(&[BoneWeight { bone, weight: 1.0 }]),
        }
    }

    pub fn smooth(weights: &[(u16, f32)]) -> Self {
        Self {
            weights: weights
                .iter()
                .map(|&(bone, weight)| BoneWeight { bone, weight })
                .collect(),
        }
    }

    pub fn is_rigid(&self) -> bool {
        self.weights.len() == 1 && self.weights[0].weight == 1.0
    }

    /// Key for envelope deduplication. Compares weight bit patterns, not
    /// float equality: -0.0 and 0.0 must stay distinct.
    pub(crate) fn dedup_key(&self) -> Vec<(u16, u32)> {
        self.weights
            .iter()
            .map(|w| (w.bone, w.weight.to_bits()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rigid() {
        let m = DrawMatrix::rigid(7);
        assert!(m.is_rigid());
        assert_eq!(m.weights[0].bone, 7);
    }

    #[test]
    fn test_smooth_not_rigid() {
        let m = DrawMatrix::smooth(&[(0, 0.75), (1, 0.25)]);
        assert!(!m.is_rigid());
    }

    #[test]
    fn test_single_partial_weight_not_rigid() {
        let m = DrawMatrix::smooth(&[(0, 0.5)]);
        assert!(!m.is_rigid());
    }

    #[test]
    fn test_dedup_key_equality() {
        let a = DrawMatrix::smooth(&[(0, 0.5), (1, 0.5)]);
        let b = DrawMatrix::smooth(&[(0, 0.5), (1, 0.5)]);
        let c = DrawMatrix::smooth(&[(1, 0.5), (0, 0.5)]);
        assert_eq!(a.dedup_key(), b.dedup_key());
        assert_ne!(a.dedup_key(), c.dedup_key());
    }
}
