//! Runtime extraction stub (`spec.md` §6.1, §GLOSSARY "Stub"): scans its own
//! on-disk image for the payload magic marker, decompresses the trailing
//! blob, extracts it into a cache directory keyed by the payload's cache
//! key, and execs it.
//!
//! This binary is compiled separately per `(platform, arch, libc)` by a
//! build pipeline out of scope for the embedder (`spec.md` §0); it does not
//! depend on the `binpress` crate and duplicates the small slice of the
//! payload wire format it needs (`common.rs`), the way weaver's
//! `loader-stub` stands alone from the main `weaver` crate.

use std::fs;

mod common;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "windows")]
mod windows;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let self_path = std::env::current_exe()?;
    let image = fs::read(&self_path)?;

    let offset = common::find_magic(&image).ok_or("no payload magic marker found in self image")?;
    let (header, compressed) = common::parse_payload(&image, offset)?;
    common::log(format!(
        "found payload: {} bytes compressed, {} bytes uncompressed",
        header.compressed_size, header.uncompressed_size
    ));

    let decompressed = common::decompress(compressed, header.uncompressed_size)?;

    #[cfg(target_os = "windows")]
    let exe_suffix = ".exe";
    #[cfg(not(target_os = "windows"))]
    let exe_suffix = "";

    let extracted_path = common::extract_to_cache(&decompressed, &header, exe_suffix)?;
    let passthrough_args: Vec<String> = std::env::args().skip(1).collect();

    #[cfg(target_os = "linux")]
    linux::run(&extracted_path, &passthrough_args);
    #[cfg(target_os = "macos")]
    macos::run(&extracted_path, &passthrough_args);
    #[cfg(target_os = "windows")]
    windows::run(&extracted_path, &passthrough_args);

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    return Err("unsupported platform".into());
}
