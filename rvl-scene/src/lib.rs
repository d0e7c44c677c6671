//! Rvl-Scene: scene archive codec for GameCube/Wii 3D assets
//!
//! A scene archive packs a whole 3D scene - skeleton, skinning envelopes,
//! quantized vertex buffers, materials, meshes, textures, animation clips -
//! into one relocatable binary image the console can index in place. This
//! crate parses those images into a value-typed [`Scene`] graph and
//! serializes a graph back to bytes.
//!
//! Everything here is a synchronous pure-data transform: no file I/O, no
//! shared state, no locking. Decoding never mutates its input; encoding
//! builds a fresh buffer per call. Archives can be processed from parallel
//! threads as long as each call gets its own transient state, which the API
//! enforces by constructing name tables and dictionaries internally.
//!
//! On-disc container formats that usually wrap a scene archive live in
//! sibling crates: `rvl-yaz0` (compression) and `rvl-u8` (virtual
//! filesystem). Apply those outside this crate; the archive codec neither
//! knows nor cares whether its bytes were compressed.
//!
//! # Usage
//!
//! ```
//! use rvl_scene::{Bone, Scene};
//!
//! let mut scene = Scene::new("course");
//! scene.bones.push(Bone::named("root"));
//!
//! let bytes = scene.write().unwrap();
//! let (parsed, report) = Scene::parse(&bytes).unwrap();
//! assert_eq!(parsed.bones[0].name, "root");
//! assert!(report.warnings.iter().any(|w| w.contains("materials")));
//! ```

mod archive;
mod dict;
mod error;
mod io;
mod model;
mod names;

pub use archive::ParseReport;
pub use dict::{dict_size, DictNode, Dictionary, WrittenDict};
pub use error::{Result, SceneError};
pub use io::{BinReader, BinWriter};
pub use model::{
    Aabb, Animation, AnimationTrack, BillboardMode, Bone, BoneWeight, ColorBuffer, ColorFormat,
    CullMode, DisplayCommand, DrawMatrix, ElementType, Keyframe, Material, Mesh, NormalBuffer,
    PositionBuffer, Quantization, Scene, TexCoordBuffer, Texture, TextureFormat, TextureRef,
    TrackKind, VertexIndices,
};
pub use names::{NameHandle, NameTable};
