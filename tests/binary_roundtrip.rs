//! Integration tests for writing binary models to disk and reading them back
//! through a source resolver.

use std::fs::{self, File};
use std::io::BufWriter;

use mdlx::core::{FloatCurve, Vec3Curve};
use mdlx::mdx::{write_model_with, WriteOptions, WriteStrategy};
use mdlx::prelude::*;

use tempfile::tempdir;

fn footman() -> Model {
    let mut m = Model::new(800);
    m.info.name = "Footman".into();
    m.info.extent = Extent::new(80.0, [-40.0, -40.0, 0.0], [40.0, 40.0, 90.0]);
    m.sequences = vec![Sequence::new("Stand", 0, 200), Sequence::new("Walk", 300, 1100)];
    m.global_sequences = vec![1000];
    m.textures = vec![Texture::from_path("Textures\\Footman.blp")];
    m.materials = vec![Material { layers: vec![Layer::with_texture(0)], ..Default::default() }];
    m.geosets = vec![Geoset {
        vertices: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        normals: vec![[0.0, 0.0, 1.0]; 3],
        face_types: vec![PRIMITIVE_TRIANGLES],
        face_groups: vec![3],
        faces: vec![0, 1, 2],
        vertex_groups: vec![0; 3],
        matrix_group_sizes: vec![1],
        matrix_indices: vec![0],
        sequence_extents: vec![Extent::default(); 2],
        uv_sets: vec![vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]],
        ..Default::default()
    }];

    let mut root = Bone::new("root", 0);
    root.geoset_id = Some(0);
    root.node.translation = Vec3Curve::new(Interpolation::Linear);
    root.node.translation.push(0, [0.0, 0.0, 0.0]).push(100, [10.0, 0.0, 0.0]);
    let mut child = Bone::new("arm", 1);
    child.node.parent_id = Some(0);
    m.bones = vec![root, child];

    let mut ga = GeosetAnimation { geoset_id: Some(0), ..Default::default() };
    ga.alpha_track = FloatCurve::new(Interpolation::Linear);
    ga.alpha_track.push(0, [1.0]).push(1000, [0.0]);
    ga.alpha_track.global_sequence_id = Some(0);
    m.geoset_animations = vec![ga];
    m.pivot_points = vec![[0.0; 3], [0.0, 0.0, 50.0]];
    m
}

#[test]
fn test_roundtrip_through_resolver() {
    let dir = tempdir().expect("Failed to create temp dir");
    let m = footman();
    {
        let file = File::create(dir.path().join("Footman.mdx")).expect("Failed to create file");
        write_model(BufWriter::new(file), &m).expect("Failed to write model");
    }

    for use_mmap in [true, false] {
        let sources = PrioritySources::new().with_root(dir.path()).with_mmap(use_mmap);
        let back = load_model(&sources, "Footman.mdx").expect("Failed to read model");
        assert_eq!(back, m, "mmap={}", use_mmap);
    }
}

#[test]
fn test_buffered_file_matches_seekable_file() {
    let dir = tempdir().expect("Failed to create temp dir");
    let m = footman();
    for (name, strategy) in [("a.mdx", WriteStrategy::Seekable), ("b.mdx", WriteStrategy::Buffered)] {
        let file = File::create(dir.path().join(name)).expect("Failed to create file");
        write_model_with(file, &m, &WriteOptions { strategy }).expect("Failed to write model");
    }
    let a = fs::read(dir.path().join("a.mdx")).expect("Failed to read a");
    let b = fs::read(dir.path().join("b.mdx")).expect("Failed to read b");
    assert_eq!(a, b);
}

#[test]
fn test_text_detour_keeps_binary_identical() {
    let dir = tempdir().expect("Failed to create temp dir");
    let m = footman();
    let mut direct = Vec::new();
    mdlx::mdx::write_model_buffered(&mut direct, &m).expect("Failed to write model");

    fs::write(dir.path().join("Footman.mdl"), render_model(&m).expect("Failed to render")).expect("Failed to write text");
    let sources = PrioritySources::new().with_root(dir.path());
    let via_text = load_model(&sources, "Footman.mdl").expect("Failed to parse text");
    let mut again = Vec::new();
    mdlx::mdx::write_model_buffered(&mut again, &via_text).expect("Failed to write model");

    assert_eq!(direct, again);
}

#[test]
fn test_sample_after_reload() {
    let dir = tempdir().expect("Failed to create temp dir");
    {
        let file = File::create(dir.path().join("rig.mdx")).expect("Failed to create file");
        write_model(file, &footman()).expect("Failed to write model");
    }
    let sources = PrioritySources::new().with_root(dir.path());
    let m = load_model(&sources, "rig.mdx").expect("Failed to read model");

    assert_eq!(m.translation_at(0, 50).expect("sample"), Vec3::new(5.0, 0.0, 0.0));
    // The arm has no curve of its own and inherits from the root.
    assert_eq!(m.translation_at(1, 100).expect("sample"), Vec3::new(10.0, 0.0, 0.0));
    assert_eq!(m.scaling_at(1, 100).expect("sample"), Vec3::ONE);

    let alpha = &m.geoset_animations[0].alpha_track;
    // Global sequence of 1000 frames: 1500 wraps to 500.
    assert_eq!(m.sample_curve(alpha, 1500).expect("sample"), Some([0.5]));
}
