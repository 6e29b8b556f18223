use super::*;
use crate::core::{FloatCurve, Interpolation, Node, NodeFlags, UintCurve, Vec3Curve};
use crate::model::*;
use crate::util::{Error, Extent, Result, Tag};
use std::io::{Cursor, Write};
use tempfile::NamedTempFile;

fn sample_model(version: u32) -> Model {
    let mut m = Model::new(version);
    m.info = ModelInfo {
        name: "Footman".into(),
        animation_file: String::new(),
        extent: Extent::new(80.0, [-40.0, -40.0, 0.0], [40.0, 40.0, 90.0]),
        blend_time: 150,
    };
    m.sequences = vec![Sequence::new("Stand", 0, 200), {
        let mut s = Sequence::new("Death", 300, 1300);
        s.set_non_looping(true);
        s.rarity = 0.5;
        s
    }];
    m.global_sequences = vec![1000];
    m.textures = vec![Texture::replaceable(1), Texture::from_path("Textures\\Footman.blp")];

    let mut layer = Layer::with_texture(1);
    layer.filter_mode = FilterMode::Transparent;
    layer.texture_id_track = UintCurve::new(Interpolation::DontInterpolate);
    layer.texture_id_track.push(0, [0]).push(100, [1]);
    layer.emissive_gain = 0.75;
    m.materials = vec![Material { priority_plane: 0, flags: 0, shader: "Shader_SD".into(), layers: vec![layer] }];

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
    let mut ga = GeosetAnimation { geoset_id: Some(0), ..Default::default() };
    ga.alpha_track = FloatCurve::new(Interpolation::Linear);
    ga.alpha_track.push(300, [1.0]).push(1300, [0.0]);
    ga.alpha_track.global_sequence_id = Some(0);
    m.geoset_animations = vec![ga];

    let mut root = Bone::new("root", 0);
    root.geoset_id = Some(0);
    root.node.translation = Vec3Curve::new(Interpolation::Linear);
    root.node.translation.push(0, [0.0; 3]).push(100, [10.0, 0.0, 0.0]);
    root.node.rotation.interpolation = Interpolation::Hermite;
    root.node.rotation.push_with_tangents(0, [0.0, 0.0, 0.0, 1.0], [0.0; 4], [0.0; 4]);
    m.bones = vec![root];

    let mut helper = Helper { node: Node::new("Mount", 1, NodeFlags::empty()) };
    helper.node.parent_id = Some(0);
    m.helpers = vec![helper];

    m.attachments = vec![Attachment {
        node: Node::new("Origin Ref", 2, NodeFlags::ATTACHMENT),
        path: String::new(),
        attachment_id: 0,
        visibility: FloatCurve::default(),
    }];
    m.pivot_points = vec![[0.0; 3], [0.0, 0.0, 50.0], [0.0; 3], [0.0; 3]];
    m.event_objects = vec![EventObject {
        node: Node::new("SNDxFOOT", 3, NodeFlags::EVENT_OBJECT),
        track: Some(EventTrack { global_sequence_id: None, frames: vec![120, 360] }),
    }];
    m.cameras = vec![Camera { name: "Portrait".into(), far_clip: 1000.0, near_clip: 8.0, ..Default::default() }];
    m
}

fn encode(m: &Model) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    write_model(&mut out, m).unwrap();
    out.into_inner()
}

/// Walk the top-level chunk headers of a file.
fn top_level_tags(bytes: &[u8]) -> Vec<Tag> {
    let mut tags = Vec::new();
    let mut at = 4;
    while at + 8 <= bytes.len() {
        let tag = Tag([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
        let size = u32::from_le_bytes(bytes[at + 4..at + 8].try_into().unwrap()) as usize;
        tags.push(tag);
        at += 8 + size;
    }
    tags
}

fn chunk(tag: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = tag.to_vec();
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
    out
}

fn minimal_file() -> Vec<u8> {
    encode(&Model::new(800))
}

#[test]
fn test_minimal_model_layout() {
    let bytes = minimal_file();
    assert_eq!(&bytes[..4], b"MDLX");
    assert_eq!(bytes.len(), 4 + 12 + 8 + 372);
    assert_eq!(top_level_tags(&bytes), vec![VERS, MODL]);
}

#[test]
fn test_roundtrip_v800() -> Result<()> {
    let m = sample_model(800);
    let bytes = encode(&m);
    let back = read_model(Cursor::new(&bytes))?;
    // Version-gated fields fall back to defaults below 801.
    let mut expected = m.clone();
    expected.materials[0].shader.clear();
    expected.materials[0].layers[0].emissive_gain = 1.0;
    assert_eq!(back, expected);
    Ok(())
}

#[test]
fn test_roundtrip_v1000() -> Result<()> {
    let mut m = sample_model(1000);
    m.geosets[0].tangents = vec![[1.0, 0.0, 0.0, 1.0]; 3];
    m.geosets[0].skin = vec![0, 0, 0, 0, 255, 0, 0, 0];
    m.materials[0].layers[0].fresnel_opacity = 0.5;
    let back = read_model(Cursor::new(encode(&m)))?;
    assert_eq!(back, m);
    Ok(())
}

#[test]
fn test_rewrite_is_bit_identical() -> Result<()> {
    let first = encode(&sample_model(900));
    let second = encode(&read_model(Cursor::new(&first))?);
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn test_chunk_order_and_omission() {
    let bytes = encode(&sample_model(800));
    let tags = top_level_tags(&bytes);
    assert_eq!(tags, vec![VERS, MODL, SEQS, GLBS, MTLS, TEXS, GEOS, GEOA, BONE, HELP, ATCH, PIVT, CAMS, EVTS]);
    let positions: Vec<usize> =
        tags.iter().map(|t| CHUNK_ORDER.iter().position(|o| o == t).unwrap()).collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_buffered_matches_seekable() -> Result<()> {
    let m = sample_model(800);
    let mut buffered = Vec::new();
    let n = write_model_buffered(&mut buffered, &m)?;
    assert_eq!(n as usize, buffered.len());
    assert_eq!(buffered, encode(&m));

    let mut via_options = Cursor::new(Vec::new());
    write_model_with(&mut via_options, &m, &WriteOptions { strategy: WriteStrategy::Buffered })?;
    assert_eq!(via_options.into_inner(), buffered);
    Ok(())
}

#[test]
fn test_write_at_stream_offset() -> Result<()> {
    let m = Model::new(800);
    let mut out = Cursor::new(vec![0xEEu8; 10]);
    out.set_position(10);
    let n = write_model(&mut out, &m)?;
    let bytes = out.into_inner();
    assert_eq!(bytes.len() as u64, 10 + n);
    assert_eq!(&bytes[10..14], b"MDLX");
    // Backpatched VERS size lands relative to the offset.
    assert_eq!(u32::from_le_bytes(bytes[18..22].try_into().unwrap()), 4);
    Ok(())
}

#[test]
fn test_file_roundtrip() -> Result<()> {
    let mut temp = NamedTempFile::new()?;
    let m = sample_model(800);
    write_model(temp.as_file_mut(), &m)?;
    temp.flush()?;
    let back = read_model(std::fs::File::open(temp.path())?)?;
    assert_eq!(back.bones, m.bones);
    assert_eq!(back.geosets, m.geosets);
    Ok(())
}

#[test]
fn test_invalid_magic() {
    let err = read_model(Cursor::new(b"MDLY\0\0\0\0".to_vec())).unwrap_err();
    assert!(matches!(err, Error::InvalidMagic { found } if found == Tag::new(b"MDLY")));
}

#[test]
fn test_unknown_chunk_skipped_by_declared_size() -> Result<()> {
    let mut bytes = minimal_file();
    let tail = bytes.split_off(16);
    bytes.extend(chunk(b"FAFX", &[1, 2, 3, 4, 5]));
    bytes.extend(tail);
    let m = read_model(Cursor::new(bytes))?;
    assert_eq!(m, Model::new(800));
    Ok(())
}

#[test]
fn test_unknown_chunk_with_bad_size_resynchronizes() -> Result<()> {
    let mut bytes = minimal_file();
    let tail = bytes.split_off(16);
    bytes.extend_from_slice(b"JUNK");
    bytes.extend_from_slice(&1000u32.to_le_bytes());
    bytes.extend_from_slice(&[0xAB; 3]);
    bytes.extend(tail);
    let m = read_model(Cursor::new(bytes))?;
    assert_eq!(m.info, ModelInfo::default());
    Ok(())
}

#[test]
fn test_unknown_chunk_strict() {
    let mut bytes = minimal_file();
    bytes.extend(chunk(b"FAFX", &[0; 4]));
    let options = ReadOptions { resynchronize: false, ..Default::default() };
    let err = read_model_with(Cursor::new(bytes), &options).unwrap_err();
    assert!(matches!(err, Error::UnknownChunk { offset: 396, .. }));
}

#[test]
fn test_trailing_garbage_reaches_end() -> Result<()> {
    let mut bytes = minimal_file();
    bytes.extend_from_slice(b"????\xff\xff\xff\xff\x01\x02");
    assert_eq!(read_model(Cursor::new(bytes))?, Model::new(800));
    Ok(())
}

#[test]
fn test_understated_chunk_size() {
    let mut m = Model::new(800);
    m.sequences = vec![Sequence::new("Stand", 0, 100)];
    let mut bytes = encode(&m);
    // SEQS follows VERS and MODL; claim 8 extra bytes and supply them.
    let at = 4 + 12 + 380 + 4;
    bytes[at..at + 4].copy_from_slice(&140u32.to_le_bytes());
    bytes.extend_from_slice(&[0; 8]);
    let err = read_model(Cursor::new(bytes)).unwrap_err();
    assert!(matches!(err, Error::SizeMismatch { declared: 140, consumed: 132, .. }));
}

#[test]
fn test_header_chunk_trailing_fields_are_skipped() {
    let mut m = Model::new(800);
    m.info.name = "Footman".into();
    m.sequences = vec![Sequence::new("Stand", 0, 100)];
    let mut bytes = encode(&m);
    // MODL follows VERS; grow it by four unknown bytes.
    let at = 4 + 12 + 4;
    bytes[at..at + 4].copy_from_slice(&376u32.to_le_bytes());
    let modl_end = at + 4 + 372;
    let rest = bytes.split_off(modl_end);
    bytes.extend_from_slice(&[0xAA; 4]);
    bytes.extend_from_slice(&rest);
    assert_eq!(read_model(Cursor::new(bytes)).unwrap(), m);
}

#[test]
fn test_header_chunk_overrun_is_size_mismatch() {
    let mut bytes = encode(&Model::new(800));
    let at = 4 + 12 + 4;
    bytes[at..at + 4].copy_from_slice(&368u32.to_le_bytes());
    let err = read_model(Cursor::new(bytes)).unwrap_err();
    assert!(matches!(err, Error::SizeMismatch { declared: 368, consumed: 372, .. }), "{:?}", err);
}

#[test]
fn test_overstated_chunk_size_is_truncation() {
    let mut bytes = minimal_file();
    bytes[20..24].copy_from_slice(&4000u32.to_le_bytes());
    assert!(matches!(read_model(Cursor::new(bytes)), Err(Error::TruncatedInput { .. })));
}

#[test]
fn test_oversized_member() {
    let mut m = Model::new(800);
    m.helpers = vec![Helper { node: Node::new("a", 0, NodeFlags::empty()) }, Helper { node: Node::new("b", 1, NodeFlags::empty()) }];
    let mut bytes = encode(&m);
    let at = bytes.len() - 2 * 96 - 4;
    // HELP budget one byte short of the two members.
    bytes[at..at + 4].copy_from_slice(&191u32.to_le_bytes());
    bytes.pop();
    let err = read_model(Cursor::new(bytes)).unwrap_err();
    assert!(matches!(err, Error::OversizedMember { remaining: 95, consumed: 96, .. }));
}

#[test]
fn test_truncated_file() {
    let bytes = encode(&sample_model(800));
    for cut in [3, 10, 200, bytes.len() - 1] {
        let err = read_model(Cursor::new(&bytes[..cut])).unwrap_err();
        assert!(err.is_structural(), "cut at {}: {:?}", cut, err);
    }
}
