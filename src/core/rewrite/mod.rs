//! Format-specific rewriters (`spec.md` §4.5–§4.7): each takes a stub's raw
//! bytes and a framed payload and produces a valid executable on disk.
//!
//! None of these use a general-purpose binary-format builder: `spec.md`
//! §4.5/§4.9 is explicit that restructuring tools move program-header
//! tables and load commands in ways that break a stub's self-extraction
//! logic. `goblin` is used only to *read* the stub (locate existing
//! structures); the actual edit happens on a mutable `Vec<u8>` copy of the
//! stub's bytes, grounded in the same "don't trust a general write path"
//! reasoning weaver's mergers apply by shelling out to `objcopy`/`ld`
//! instead of a Rust ELF/Mach-O builder.

pub mod elf;
pub mod macho;
pub mod pe;

use std::path::Path;

use crate::config::Config;
use crate::core::binary::target::Platform;
use crate::error::Result;

/// Dispatches to the rewriter matching the *stub's* platform (`spec.md`
/// §4.8: dispatch is keyed by the stub, not the input binary, which is what
/// makes cross-targeting meaningful).
pub fn rewrite_for_platform(
    platform: Platform,
    stub_bytes: &[u8],
    payload: &[u8],
    output_path: &Path,
    config: &Config,
) -> Result<()> {
    match platform {
        Platform::Linux => elf::rewrite(stub_bytes, payload, output_path),
        Platform::Darwin => macho::rewrite(stub_bytes, payload, output_path, config),
        Platform::Win32 => pe::rewrite(stub_bytes, payload, output_path),
    }
}
