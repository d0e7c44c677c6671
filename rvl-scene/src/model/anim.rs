//! Animation tracks
//!
//! Hermite keyframe tracks targeting one bone SRT channel each. Tracks are
//! grouped into named clips; a clip's tracks may target any mix of bones.

use serde::{Deserialize, Serialize};

/// Which SRT channel of the target bone a track drives (disc encoding 0-8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackKind {
    ScaleX = 0,
    ScaleY = 1,
    ScaleZ = 2,
    RotateX = 3,
    RotateY = 4,
    RotateZ = 5,
    TranslateX = 6,
    TranslateY = 7,
    TranslateZ = 8,
}

impl TrackKind {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(TrackKind::ScaleX),
            1 => Some(TrackKind::ScaleY),
            2 => Some(TrackKind::ScaleZ),
            3 => Some(TrackKind::RotateX),
            4 => Some(TrackKind::RotateY),
            5 => Some(TrackKind::RotateZ),
            6 => Some(TrackKind::TranslateX),
            7 => Some(TrackKind::TranslateY),
            8 => Some(TrackKind::TranslateZ),
            _ => None,
        }
    }
}

/// One Hermite keyframe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub frame: f32,
    pub value: f32,
    pub tangent: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationTrack {
    /// Name of the bone this track drives, resolved at link time.
    pub target: String,
    pub kind: TrackKind,
    pub keyframes: Vec<Keyframe>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Animation {
    pub name: String,
    pub frame_count: u16,
    pub looping: bool,
    pub tracks: Vec<AnimationTrack>,
}

impl Animation {
    pub fn named(name: &str, frame_count: u16) -> Self {
        Self {
            name: name.to_string(),
            frame_count,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_kind_from_raw() {
        assert_eq!(TrackKind::from_raw(0), Some(TrackKind::ScaleX));
        assert_eq!(TrackKind::from_raw(8), Some(TrackKind::TranslateZ));
        assert_eq!(TrackKind::from_raw(9), None);
    }
}
