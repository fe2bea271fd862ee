//! `Cli::run`'s `-o`/`-d`/`-u` dispatch (`src/cli.rs`), including the
//! argument-conflict rejections that never reach `core::embed`.

use std::fs;

use binpress::cli::Cli;
use binpress::error::BinpressError;

use clap::Parser;

use crate::common::fixtures::synthetic_elf64;

#[test]
fn rejects_when_no_mode_flag_is_given() {
    let dir = tempfile::tempdir().unwrap();
    let input_path = dir.path().join("app");
    fs::write(&input_path, synthetic_elf64()).unwrap();

    let cli = Cli::parse_from(["binpress", input_path.to_str().unwrap()]);
    let result = cli.run();
    assert!(matches!(result, Err(BinpressError::ArgError(_))));
}

#[test]
fn rejects_data_only_combined_with_output() {
    let dir = tempfile::tempdir().unwrap();
    let input_path = dir.path().join("app");
    fs::write(&input_path, synthetic_elf64()).unwrap();

    let cli = Cli::parse_from([
        "binpress",
        input_path.to_str().unwrap(),
        "-o",
        dir.path().join("out").to_str().unwrap(),
        "-d",
        dir.path().join("data").to_str().unwrap(),
    ]);
    let result = cli.run();
    assert!(matches!(result, Err(BinpressError::ArgError(_))));
}

#[test]
fn update_flag_dispatches_through_to_a_real_rewrite() {
    let dir = tempfile::tempdir().unwrap();
    let stub_source_path = dir.path().join("already-packed");
    fs::write(&stub_source_path, synthetic_elf64()).unwrap();

    let new_payload_path = dir.path().join("new-payload");
    fs::write(&new_payload_path, b"cli-driven replacement payload").unwrap();

    let output_path = dir.path().join("repacked");
    let cli = Cli::parse_from([
        "binpress",
        new_payload_path.to_str().unwrap(),
        "-u",
        stub_source_path.to_str().unwrap(),
        "-o",
        output_path.to_str().unwrap(),
        "--algorithm",
        "lzma",
    ]);

    cli.run().unwrap();
    assert!(output_path.exists());
}

#[test]
fn update_flag_without_output_rewrites_the_source_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let stub_source_path = dir.path().join("already-packed");
    let original_stub = synthetic_elf64();
    fs::write(&stub_source_path, &original_stub).unwrap();

    let new_payload_path = dir.path().join("new-payload");
    fs::write(&new_payload_path, b"in-place replacement payload").unwrap();

    let cli = Cli::parse_from([
        "binpress",
        new_payload_path.to_str().unwrap(),
        "-u",
        stub_source_path.to_str().unwrap(),
        "--algorithm",
        "lzma",
    ]);

    cli.run().unwrap();
    let rewritten = fs::read(&stub_source_path).unwrap();
    assert_ne!(rewritten, original_stub);
}

#[test]
fn parses_data_only_and_update_flags() {
    let cli = Cli::parse_from(["binpress", "app", "-d", "app.data"]);
    assert_eq!(cli.data_only.as_deref().unwrap().to_str().unwrap(), "app.data");

    let cli = Cli::parse_from(["binpress", "payload", "-u", "app.packed"]);
    assert_eq!(cli.update.as_deref().unwrap().to_str().unwrap(), "app.packed");
}
