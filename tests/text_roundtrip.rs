//! Integration tests for the text form on disk and for converting between
//! the two forms.

use std::fs::{self, File};

use mdlx::core::Vec3Curve;
use mdlx::mdl::{write_text, TextOptions};
use mdlx::prelude::*;

use tempfile::tempdir;

const PEASANT: &str = r#"// Exported by hand
Version {
	FormatVersion 800,
}
Model "Peasant" {
	NumGeosets 1,
	NumBones 2,
	BlendTime 150,
	MinimumExtent { -20, -20, 0 },
	MaximumExtent { 20, 20, 70 },
}
Sequences 2 {
	Anim "Stand" {
		Interval { 0, 1000 },
	}
	Anim "Death" {
		Interval { 2000, 3000 },
		NonLooping,
	}
}
Textures 1 {
	Bitmap {
		Image "Textures\Peasant.blp",
	}
}
Materials 1 {
	Material {
		Layer {
			FilterMode None,
			static TextureID 0,
		}
	}
}
Geoset {
	Vertices 3 {
		{ 0, 0, 0 },
		{ 1, 0, 0 },
		{ 0, 1, 0 },
	}
	Normals 3 {
		{ 0, 0, 1 },
		{ 0, 0, 1 },
		{ 0, 0, 1 },
	}
	TVertices 3 {
		{ 0, 0 },
		{ 1, 0 },
		{ 0, 1 },
	}
	VertexGroup {
		0,
		0,
		0,
	}
	Faces 1 3 {
		Triangles {
			{ 0, 1, 2 },
		}
	}
	Groups 1 1 {
		Matrices { 0 },
	}
	MaterialID 0,
}
Bone "Pelvis" {
	ObjectId 0,
	GeosetId 0,
	Translation 2 {
		Linear,
		0: { 0, 0, 0 },
		1000: { 0, 0, 10 },
	}
}
Bone "Head" {
	ObjectId 1,
	Parent 0,
}
PivotPoints 2 {
	{ 0, 0, 0 },
	{ 0, 0, 60 },
}
"#;

#[test]
fn test_handwritten_file() {
    let dir = tempdir().expect("Failed to create temp dir");
    fs::write(dir.path().join("Peasant.mdl"), PEASANT).expect("Failed to write text");

    let sources = PrioritySources::new().with_root(dir.path());
    let m = load_model(&sources, "Peasant.mdl").expect("Failed to parse model");

    assert_eq!(m.info.name, "Peasant");
    assert_eq!(m.sequences.len(), 2);
    assert!(m.sequences[1].non_looping());
    assert_eq!(m.textures[0].path, "Textures\\Peasant.blp");
    assert_eq!(m.geosets[0].faces, vec![0, 1, 2]);
    assert_eq!(m.geosets[0].face_types, vec![PRIMITIVE_TRIANGLES]);
    assert_eq!(m.pivot_of(1), [0.0, 0.0, 60.0]);

    let head = m.parent_of(1).expect("Head should have a parent");
    assert_eq!(head.node().name, "Pelvis");
    // Head has no translation and inherits the pelvis curve.
    assert_eq!(m.translation_at(1, 500).expect("sample"), Vec3::new(0.0, 0.0, 5.0));
}

#[test]
fn test_mdl_to_mdx_and_back() {
    let dir = tempdir().expect("Failed to create temp dir");
    let m = parse_model(PEASANT).expect("Failed to parse model");

    {
        let file = File::create(dir.path().join("Peasant.mdx")).expect("Failed to create file");
        write_model(file, &m).expect("Failed to write model");
    }
    let sources = PrioritySources::new().with_root(dir.path());
    let binary = load_model(&sources, "Peasant.mdx").expect("Failed to read model");
    assert_eq!(binary, m);

    // Rendering the model read from binary reproduces the canonical text.
    assert_eq!(render_model(&binary).expect("Failed to render"), render_model(&m).expect("Failed to render"));
}

#[test]
fn test_write_text_file_is_stable() {
    let dir = tempdir().expect("Failed to create temp dir");
    let mut m = Model::new(800);
    m.info.name = "Crate".into();
    let mut bone = Bone::new("lid", 0);
    bone.node.scaling = Vec3Curve::new(Interpolation::Bezier);
    bone.node.scaling.push_with_tangents(0, [1.0; 3], [1.0; 3], [1.0; 3]);
    bone.node.scaling.push_with_tangents(400, [2.0; 3], [1.5; 3], [2.0; 3]);
    m.bones = vec![bone];
    m.pivot_points = vec![[0.0; 3]];

    let options = TextOptions { header_comment: false, indent: "  ".into() };
    let path = dir.path().join("Crate.mdl");
    write_text(File::create(&path).expect("Failed to create file"), &m, &options).expect("Failed to write text");

    let text = fs::read_to_string(&path).expect("Failed to read text");
    assert!(!text.contains("Exported by"));
    assert!(text.contains("\n  ObjectId 0,"));

    let back = parse_model(&text).expect("Failed to parse text");
    assert_eq!(back, m);
    assert_eq!(mdlx::mdl::render_model_with(&back, &options).expect("Failed to render"), text);
}
