//! Archive round-trip tests
//!
//! Scenes are built with on-grid values (rotations of zero, positions that
//! are exact multiples of the fixed-point quantum) so write-then-parse
//! equality is exact rather than approximate.

use glam::{Vec2, Vec3};
use rvl_scene::{
    Animation, AnimationTrack, Bone, ColorBuffer, ColorFormat, CullMode, DisplayCommand,
    DrawMatrix, ElementType, Keyframe, Material, Mesh, NormalBuffer, PositionBuffer,
    Quantization, Scene, SceneError, TexCoordBuffer, Texture, TextureFormat, TrackKind,
    VertexIndices,
};

fn create_test_scene() -> Scene {
    let mut scene = Scene::new("course");

    let mut root = Bone::named("root");
    root.translation = Vec3::new(0.0, 1.0, 0.0);
    root.bounding_radius = 100.0;
    root.displays.push(DisplayCommand {
        material: 0,
        mesh: 0,
    });
    let mut child = Bone::named("child");
    child.parent = 0;
    child.scale = Vec3::new(2.0, 2.0, 2.0);
    child.ssc = true;
    scene.bones = vec![root, child];
    scene.recompute_hierarchy();

    scene.draw_matrices = vec![DrawMatrix::rigid(0)];

    scene.positions.push(PositionBuffer::f32(
        "pos",
        vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ],
    ));

    scene.materials.push(Material::named("mat_0").with_texture("grass"));

    let mut mesh = Mesh::named("mesh_0");
    mesh.position_buffer = "pos".into();
    mesh.draw_matrices = vec![0];
    mesh.vertices = (0..3)
        .map(|i| VertexIndices {
            matrix_slot: 0,
            position: i,
            ..Default::default()
        })
        .collect();
    scene.meshes.push(mesh);

    scene
        .textures
        .push(Texture::new("grass", 8, 8, TextureFormat::Cmpr));

    scene
}

#[test]
fn roundtrip_example_scenario() {
    let scene = create_test_scene();
    let bytes = scene.write().unwrap();
    let (parsed, _report) = Scene::parse(&bytes).unwrap();

    assert_eq!(parsed.bones.len(), 2);
    assert_eq!(parsed.bones[1].parent, 0);
    assert_eq!(parsed.materials[0].name, "mat_0");
    assert_eq!(parsed.draw_matrices[0].weights.len(), 1);
    assert_eq!(parsed.draw_matrices[0].weights[0].bone, 0);
    assert_eq!(parsed.draw_matrices[0].weights[0].weight, 1.0);

    assert_eq!(parsed, scene);
}

#[test]
fn roundtrip_empty_scene() {
    let scene = Scene::new("empty");
    let bytes = scene.write().unwrap();
    let (parsed, report) = Scene::parse(&bytes).unwrap();
    assert_eq!(parsed, scene);
    // Every optional section reports absent
    assert_eq!(report.warnings.len(), 7);
}

#[test]
fn roundtrip_all_sections() {
    let mut scene = create_test_scene();

    scene.bones[1].displays.push(DisplayCommand {
        material: 0,
        mesh: 0,
    });
    scene.bones[1].inverse_bind = [
        1.0, 0.0, 0.0, -3.5, 0.0, 1.0, 0.0, 0.25, 0.0, 0.0, 1.0, 8.0,
    ];

    // Smooth skinning: two envelopes, one repeated and thus pooled
    scene.draw_matrices.push(DrawMatrix::smooth(&[(0, 0.75), (1, 0.25)]));
    scene.draw_matrices.push(DrawMatrix::smooth(&[(0, 0.75), (1, 0.25)]));
    scene.draw_matrices.push(DrawMatrix::smooth(&[(1, 0.5), (0, 0.5)]));

    // Quantized buffers on the fixed-point grid (shift 6: 1/64 steps)
    scene.positions.push(PositionBuffer {
        name: "pos_packed".into(),
        quant: Quantization::fixed(ElementType::S16, 3, 6),
        data: vec![Vec3::new(1.5, -2.25, 0.015625), Vec3::new(0.0, 64.0, -0.5)],
    });
    scene.normals.push(NormalBuffer {
        name: "nrm".into(),
        quant: Quantization::fixed(ElementType::S16, 3, 14),
        data: vec![Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.5, 0.5, 0.0)],
    });
    scene.colors.push(ColorBuffer {
        name: "clr".into(),
        format: ColorFormat::Rgba8,
        data: vec![[255, 0, 0, 255], [0, 255, 0, 128]],
    });
    scene.texcoords.push(TexCoordBuffer {
        name: "uv".into(),
        quant: Quantization::f32(2),
        data: vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 1.0)],
    });

    scene.materials.push(Material::named("mat_1"));

    let mut anim = Animation::named("walk", 60);
    anim.looping = true;
    anim.tracks.push(AnimationTrack {
        target: "child".into(),
        kind: TrackKind::TranslateY,
        keyframes: vec![
            Keyframe {
                frame: 0.0,
                value: 0.0,
                tangent: 0.0,
            },
            Keyframe {
                frame: 30.0,
                value: 2.5,
                tangent: -0.125,
            },
        ],
    });
    scene.animations.push(anim);

    let bytes = scene.write().unwrap();
    let (parsed, report) = Scene::parse(&bytes).unwrap();
    assert_eq!(parsed, scene);
    assert!(report.warnings.is_empty());
}

#[test]
fn roundtrip_remapped_joint_lut() {
    let mut scene = create_test_scene();
    scene.bones.push(Bone::named("tail"));
    scene.bones[2].parent = 1;
    scene.recompute_hierarchy();
    scene.joint_lut = vec![2, 0, 1];

    let bytes = scene.write().unwrap();
    let (parsed, report) = Scene::parse(&bytes).unwrap();

    // The remap is preserved verbatim, flagged, and every slot-addressed
    // table (records, inverse binds) lands on the right logical bone
    assert_eq!(parsed.joint_lut, vec![2, 0, 1]);
    assert!(report
        .warnings
        .iter()
        .any(|w| w.contains("joint compression")));
    assert_eq!(parsed, scene);
}

#[test]
fn identity_lut_normalizes_to_empty() {
    let mut scene = create_test_scene();
    scene.joint_lut = vec![0, 1];
    let bytes = scene.write().unwrap();
    let (parsed, _) = Scene::parse(&bytes).unwrap();
    assert!(parsed.joint_lut.is_empty());
}

#[test]
fn parse_rejects_bad_magic() {
    let mut bytes = create_test_scene().write().unwrap();
    bytes[0] = b'X';
    assert!(matches!(
        Scene::parse(&bytes),
        Err(SceneError::CorruptArchive { offset: 0, .. })
    ));
}

#[test]
fn parse_rejects_truncated_archive() {
    let bytes = create_test_scene().write().unwrap();
    let truncated = &bytes[..bytes.len() - 10];
    assert!(matches!(
        Scene::parse(truncated),
        Err(SceneError::TruncatedArchive { .. })
    ));
}

#[test]
fn write_rejects_missing_texture() {
    let mut scene = create_test_scene();
    scene.textures.clear();
    match scene.write() {
        Err(SceneError::MissingReference { from, to }) => {
            assert!(from.contains("mat_0"));
            assert!(to.contains("grass"));
        }
        other => panic!("expected MissingReference, got {:?}", other),
    }
}

#[test]
fn write_rejects_oversized_buffer() {
    let mut scene = Scene::new("huge");
    scene
        .positions
        .push(PositionBuffer::f32("pos", vec![Vec3::ZERO; 65536]));
    assert!(matches!(
        scene.write(),
        Err(SceneError::SectionTooLarge {
            section: "vertex_data",
            count: 65536,
            max: 65535,
        })
    ));
}

#[test]
fn write_rejects_f32_with_shift() {
    let mut scene = Scene::new("bad_quant");
    scene.positions.push(PositionBuffer {
        name: "pos".into(),
        quant: Quantization {
            ty: ElementType::F32,
            comp_count: 3,
            shift: 4,
        },
        data: vec![Vec3::ZERO],
    });
    assert!(matches!(
        scene.write(),
        Err(SceneError::UnsupportedFeature(_))
    ));
}

#[test]
fn write_rejects_non_permutation_lut() {
    let mut scene = create_test_scene();
    scene.joint_lut = vec![0, 0];
    assert!(matches!(
        scene.write(),
        Err(SceneError::UnsupportedFeature(_))
    ));
}

#[test]
fn rotation_quantization_is_close() {
    let mut scene = create_test_scene();
    scene.bones[0].rotation = Vec3::new(90.0, -45.0, 10.0);
    let bytes = scene.write().unwrap();
    let (parsed, _) = Scene::parse(&bytes).unwrap();
    let got = parsed.bones[0].rotation;
    assert!((got.x - 90.0).abs() < 0.01);
    assert!((got.y + 45.0).abs() < 0.01);
    assert!((got.z - 10.0).abs() < 0.01);
}

#[test]
fn cull_mode_survives() {
    let mut scene = create_test_scene();
    scene.materials[0].cull = CullMode::None;
    let bytes = scene.write().unwrap();
    let (parsed, _) = Scene::parse(&bytes).unwrap();
    assert_eq!(parsed.materials[0].cull, CullMode::None);
}

#[test]
fn json_dump_roundtrips() {
    let scene = create_test_scene();
    let json = serde_json::to_string(&scene).unwrap();
    let back: Scene = serde_json::from_str(&json).unwrap();
    assert_eq!(back, scene);
}

#[test]
fn wrapped_in_u8_and_yaz0() {
    // The full on-disc stack: scene archive inside a U8 archive, the whole
    // thing Yaz0-compressed
    let scene = create_test_scene();
    let archive = scene.write().unwrap();

    let mut builder = rvl_u8::U8Builder::new();
    builder.add_file("model/course.rscn", archive.clone());
    let packed = rvl_yaz0::encode(&builder.build().write());

    let unpacked = rvl_yaz0::decode(&packed).unwrap();
    let container = rvl_u8::U8Archive::parse(&unpacked).unwrap();
    let inner = container.read_file("model/course.rscn").unwrap();
    assert_eq!(inner, &archive[..]);

    let (parsed, _) = Scene::parse(inner).unwrap();
    assert_eq!(parsed, scene);
}
