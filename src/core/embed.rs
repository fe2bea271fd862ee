//! Embedder driver (`spec.md` §4.8): the state machine wiring stub
//! selection, compression, framing, and rewriting together.
//!
//! `SELECT_STUB -> READ_INPUT -> SIZE_CHECK -> COMPRESS -> FRAME ->
//! WRITE_TEMP_STUB -> DISPATCH_REWRITER -> CLEANUP_TEMP -> SUCCESS`. Cleanup
//! always runs, success or failure, the way weaver's `core/merger/mod.rs`
//! wraps its whole pipeline in a `work_dir` that gets torn down on every
//! exit path rather than just the happy one.

use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::core::binary::detector::{self, DetectedBinary};
use crate::core::compress::{self, Algorithm};
use crate::core::payload;
use crate::core::rewrite::rewrite_for_platform;
use crate::core::stub::{self, EmbeddedStub, StubSelection};
use crate::error::{BinpressError, Result};

fn read_input(input_path: &Path) -> Result<Vec<u8>> {
    fs::read(input_path).map_err(|e| BinpressError::io(input_path, e))
}

fn check_size(data: &[u8], config: &Config) -> Result<()> {
    if data.len() as u64 > config.max_uncompressed {
        return Err(BinpressError::InputError(format!(
            "input is {} bytes, exceeds the {} byte limit",
            data.len(),
            config.max_uncompressed
        )));
    }
    Ok(())
}

fn frame(data: &[u8], algorithm: Algorithm, stub: &EmbeddedStub) -> Result<Vec<u8>> {
    let compressed = compress::compress(algorithm, data)?;
    log::debug!(
        "compressed {} bytes to {} bytes with {:?}",
        data.len(),
        compressed.len(),
        algorithm
    );
    payload::build_payload(
        &compressed,
        data.len() as u64,
        stub.platform.to_byte(),
        stub.arch.to_byte(),
        stub.libc.to_byte(),
        algorithm.tag(),
        None,
    )
}

/// Materializes `stub` to a close-on-exec temp file for the duration of
/// `body`, removing it on every exit path (`CLEANUP_TEMP`).
fn with_temp_stub<T>(config: &Config, stub: &EmbeddedStub, body: impl FnOnce() -> Result<T>) -> Result<T> {
    let temp_path = stub::write_temp_stub(config, stub)?;
    let result = body();
    let _ = stub::cleanup_temp_stub(&temp_path);
    result
}

/// Produces a self-extracting executable: compresses `input_path`,
/// selects and materializes a stub, and dispatches the matching rewriter.
pub fn press_self_extracting(
    input_path: &Path,
    output_path: &Path,
    selection: &StubSelection,
    algorithm: Algorithm,
    config: &Config,
) -> Result<()> {
    let input_data = read_input(input_path)?;
    check_size(&input_data, config)?;
    let detected = detector::detect(&input_data)?;

    let stub = stub::select_stub(&detected, selection)?;
    let framed = frame(&input_data, algorithm, stub)?;

    with_temp_stub(config, stub, || {
        rewrite_for_platform(stub.platform, stub.bytes, &framed, output_path, config)
    })
}

/// Produces a data-only payload blob: the framed payload with no stub
/// attached, meant to be paired with a stub later via [`update_in_place`].
pub fn press_data_only(
    input_path: &Path,
    output_path: &Path,
    selection: &StubSelection,
    algorithm: Algorithm,
    config: &Config,
) -> Result<()> {
    let input_data = read_input(input_path)?;
    check_size(&input_data, config)?;
    let detected = detector::detect(&input_data)?;

    let stub = stub::select_stub(&detected, selection)?;
    let framed = frame(&input_data, algorithm, stub)?;

    crate::io::atomic_write(output_path, &framed, None)
}

/// Re-presses an already-produced self-extracting binary at
/// `stub_source_path` with new input data, swapping the embedded payload in
/// place (or into `output_path`, if different). This is the UPDATE
/// transition of the rewrite state machines: the source already carries a
/// `SMOL`/`__PRESSED_DATA`/`.pressed` from a previous press.
pub fn update_in_place(
    stub_source_path: &Path,
    input_path: &Path,
    output_path: &Path,
    algorithm: Algorithm,
    config: &Config,
) -> Result<()> {
    let stub_bytes = fs::read(stub_source_path).map_err(|e| BinpressError::io(stub_source_path, e))?;
    let existing: DetectedBinary = detector::detect(&stub_bytes)?;

    let input_data = read_input(input_path)?;
    check_size(&input_data, config)?;
    let compressed = compress::compress(algorithm, &input_data)?;
    let framed = payload::build_payload(
        &compressed,
        input_data.len() as u64,
        existing.platform.to_byte(),
        existing.arch.to_byte(),
        existing.libc.map_or(0xFF, |l| l.to_byte()),
        algorithm.tag(),
        None,
    )?;

    rewrite_for_platform(existing.platform, &stub_bytes, &framed, output_path, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn press_self_extracting_rejects_oversized_input() {
        let dir = tempfile::tempdir().unwrap();
        let input_path = dir.path().join("in.bin");
        let mut f = fs::File::create(&input_path).unwrap();
        f.write_all(b"\x7fELF\x02\x01\x01\x00").unwrap(); // enough to pass a size check, not a full parse
        drop(f);

        let mut config = Config::default();
        config.max_uncompressed = 1; // smaller than the file we just wrote

        let output_path = dir.path().join("out");
        let result = press_self_extracting(&input_path, &output_path, &StubSelection::default(), Algorithm::Lzma, &config);
        assert!(result.is_err());
    }
}
