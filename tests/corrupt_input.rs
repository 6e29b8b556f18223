//! Integration tests for damaged and missing inputs.

use std::fs;
use std::io::Cursor;

use mdlx::mdx::{read_model_with, ReadOptions};
use mdlx::prelude::*;

use tempfile::tempdir;

fn small_model() -> Model {
    let mut m = Model::new(800);
    m.info.name = "Box".into();
    m.sequences = vec![Sequence::new("Stand", 0, 1000)];
    m.global_sequences = vec![500, 250];
    m
}

fn encode(m: &Model) -> Vec<u8> {
    let mut out = Vec::new();
    mdlx::mdx::write_model_buffered(&mut out, m).expect("Failed to write model");
    out
}

/// Insert a foreign chunk right after VERS (4 magic + 12 bytes).
fn with_foreign_chunk(bytes: &[u8], payload_len: usize) -> Vec<u8> {
    let mut out = bytes[..16].to_vec();
    out.extend_from_slice(b"FAFX");
    out.extend_from_slice(&(payload_len as u32).to_le_bytes());
    out.extend(std::iter::repeat(0xAB).take(payload_len));
    out.extend_from_slice(&bytes[16..]);
    out
}

#[test]
fn test_truncated_file_from_disk() {
    let dir = tempdir().expect("Failed to create temp dir");
    let bytes = encode(&small_model());
    fs::write(dir.path().join("cut.mdx"), &bytes[..bytes.len() - 3]).expect("Failed to write file");

    let sources = PrioritySources::new().with_root(dir.path());
    let err = load_model(&sources, "cut.mdx").unwrap_err();
    assert!(err.is_structural(), "{:?}", err);
    assert!(matches!(err, Error::TruncatedInput { .. }), "{:?}", err);
}

#[test]
fn test_text_file_passed_as_binary() {
    let dir = tempdir().expect("Failed to create temp dir");
    fs::write(dir.path().join("wrong.mdx"), render_model(&small_model()).expect("Failed to render")).expect("Failed to write file");

    let sources = PrioritySources::new().with_root(dir.path());
    let err = load_model(&sources, "wrong.mdx").unwrap_err();
    assert!(matches!(err, Error::InvalidMagic { .. }), "{:?}", err);
}

#[test]
fn test_foreign_chunk_is_skipped() {
    let m = small_model();
    let bytes = with_foreign_chunk(&encode(&m), 40);

    let back = read_model(Cursor::new(&bytes)).expect("Failed to read model");
    assert_eq!(back, m);

    let strict = ReadOptions { resynchronize: false, ..Default::default() };
    let err = read_model_with(Cursor::new(&bytes), &strict).unwrap_err();
    assert!(matches!(err, Error::UnknownChunk { offset: 16, .. }), "{:?}", err);
    assert!(!err.is_structural());
}

#[test]
fn test_missing_file_is_unavailable() {
    let dir = tempdir().expect("Failed to create temp dir");
    let sources = PrioritySources::new().with_root(dir.path());
    let err = load_model(&sources, "Nope.mdx").unwrap_err();
    assert!(matches!(err, Error::StreamUnavailable(_)), "{:?}", err);
}

#[test]
fn test_broken_text_reports_line() {
    let dir = tempdir().expect("Failed to create temp dir");
    let text = "Version {\n\tFormatVersion 800,\n}\nModel \"Box\" {\n\tBlendTime 150,\n";
    fs::write(dir.path().join("open.mdl"), text).expect("Failed to write file");

    let sources = PrioritySources::new().with_root(dir.path());
    let err = load_model(&sources, "open.mdl").unwrap_err();
    assert!(matches!(err, Error::Grammar { line: 6, .. }), "{:?}", err);
}
