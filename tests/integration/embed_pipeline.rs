//! Exercises `core::embed`'s public entry points end to end. The stub
//! registry ships with zero-length placeholder blobs until real stubs are
//! built (`src/core/stub/mod.rs`), so `press_self_extracting`/
//! `press_data_only` can only be checked against `StubUnavailable` here;
//! `update_in_place` doesn't consult the registry at all (it rewrites the
//! stub bytes the caller already hands it), so it's the one path this suite
//! can drive to a real success.

use std::fs;

use binpress::config::Config;
use binpress::core::compress::Algorithm;
use binpress::core::embed::{press_data_only, press_self_extracting, update_in_place};
use binpress::core::payload::{find_magic, parse_payload};
use binpress::core::stub::StubSelection;
use binpress::error::BinpressError;

use crate::common::fixtures::synthetic_elf64;

#[test]
fn press_self_extracting_reports_stub_unavailable_with_empty_registry() {
    let dir = tempfile::tempdir().unwrap();
    let input_path = dir.path().join("app");
    fs::write(&input_path, synthetic_elf64()).unwrap();
    let output_path = dir.path().join("app.packed");

    let result = press_self_extracting(
        &input_path,
        &output_path,
        &StubSelection::default(),
        Algorithm::Lzma,
        &Config::default(),
    );

    assert!(matches!(result, Err(BinpressError::StubUnavailable { .. })));
    assert!(!output_path.exists());
}

#[test]
fn press_data_only_reports_stub_unavailable_with_empty_registry() {
    let dir = tempfile::tempdir().unwrap();
    let input_path = dir.path().join("app");
    fs::write(&input_path, synthetic_elf64()).unwrap();
    let data_path = dir.path().join("app.data");

    let result = press_data_only(
        &input_path,
        &data_path,
        &StubSelection::default(),
        Algorithm::Lzma,
        &Config::default(),
    );

    assert!(matches!(result, Err(BinpressError::StubUnavailable { .. })));
}

#[test]
fn update_in_place_reframes_without_touching_the_stub_registry() {
    let dir = tempfile::tempdir().unwrap();
    let stub_source_path = dir.path().join("already-packed");
    fs::write(&stub_source_path, synthetic_elf64()).unwrap();

    let input_path = dir.path().join("new-payload-contents");
    let new_contents = b"updated application bytes".repeat(10);
    fs::write(&input_path, &new_contents).unwrap();

    let output_path = dir.path().join("repacked");
    update_in_place(&stub_source_path, &input_path, &output_path, Algorithm::Lzma, &Config::default()).unwrap();

    let out = fs::read(&output_path).unwrap();
    let offset = find_magic(&out).expect("magic marker missing after update_in_place");
    let (header, compressed) = parse_payload(&out[offset..]).unwrap();
    assert_eq!(header.uncompressed_size, new_contents.len() as u64);
    let decompressed =
        binpress::core::compress::decompress(Algorithm::Lzma, compressed, header.uncompressed_size).unwrap();
    assert_eq!(decompressed, new_contents);
}

#[test]
fn update_in_place_rejects_oversized_replacement_input() {
    let dir = tempfile::tempdir().unwrap();
    let stub_source_path = dir.path().join("already-packed");
    fs::write(&stub_source_path, synthetic_elf64()).unwrap();

    let input_path = dir.path().join("too-big");
    fs::write(&input_path, b"this payload is larger than the configured ceiling").unwrap();

    let mut config = Config::default();
    config.max_uncompressed = 4;

    let output_path = dir.path().join("repacked");
    let result = update_in_place(&stub_source_path, &input_path, &output_path, Algorithm::Lzma, &config);
    assert!(result.is_err());
    assert!(!output_path.exists());
}
