//! Frames a payload and runs it through each format rewriter against a
//! synthetic stub, then re-derives the payload the way the runtime stub
//! would: scan for the magic marker, parse the header, decompress.

use std::fs;

use binpress::config::Config;
use binpress::core::compress::{compress, Algorithm};
use binpress::core::payload::{build_payload, find_magic, parse_payload};
use binpress::core::rewrite::{elf, macho, pe};

use crate::common::fixtures::{synthetic_elf64, synthetic_macho64, synthetic_pe32_plus};

fn framed_payload(original: &[u8]) -> Vec<u8> {
    let compressed = compress(Algorithm::Lzma, original).unwrap();
    build_payload(&compressed, original.len() as u64, 0, 0, 0, Algorithm::Lzma.tag(), None).unwrap()
}

fn assert_round_trips(output: &[u8], original: &[u8]) {
    let offset = find_magic(output).expect("magic marker not found in rewritten binary");
    let (header, compressed) = parse_payload(&output[offset..]).unwrap();
    assert_eq!(header.uncompressed_size, original.len() as u64);
    let decompressed =
        binpress::core::compress::decompress(Algorithm::Lzma, compressed, header.uncompressed_size).unwrap();
    assert_eq!(decompressed, original);
}

#[test]
fn elf_rewrite_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("packed-elf");
    let original = b"hello from the packed elf payload".repeat(8);
    let framed = framed_payload(&original);

    elf::rewrite(&synthetic_elf64(), &framed, &output_path).unwrap();

    let out = fs::read(&output_path).unwrap();
    assert_round_trips(&out, &original);
}

#[test]
fn macho_rewrite_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("packed-macho");
    let original = b"hello from the packed mach-o payload".repeat(8);
    let framed = framed_payload(&original);
    let config = Config::default();

    macho::rewrite(&synthetic_macho64(), &framed, &output_path, &config).unwrap();

    let out = fs::read(&output_path).unwrap();
    assert_round_trips(&out, &original);
}

#[test]
fn pe_rewrite_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("packed.exe");
    let original = b"hello from the packed pe payload".repeat(8);
    let framed = framed_payload(&original);

    pe::rewrite(&synthetic_pe32_plus(), &framed, &output_path).unwrap();

    let out = fs::read(&output_path).unwrap();
    assert_round_trips(&out, &original);
}

#[test]
fn macho_update_removes_previous_segment_before_reframing() {
    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("packed-macho-v1");
    let config = Config::default();

    let first = b"version one payload bytes".repeat(4);
    macho::rewrite(&synthetic_macho64(), &framed_payload(&first), &output_path, &config).unwrap();
    let stub_with_payload = fs::read(&output_path).unwrap();

    let second = b"version two, a longer replacement payload".repeat(6);
    let updated_path = dir.path().join("packed-macho-v2");
    macho::rewrite(&stub_with_payload, &framed_payload(&second), &updated_path, &config).unwrap();

    let out = fs::read(&updated_path).unwrap();
    assert_round_trips(&out, &second);
}
