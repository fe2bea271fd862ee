//! Stub Registry (`spec.md` §4.2): the 8 compiled-in opaque stub blobs
//! (`darwin-{x64,arm64}`, `linux-{x64,arm64}-{glibc,musl}`,
//! `win32-{x64,arm64}`) and the target-resolution/temp-materialization
//! logic built on top of them.
//!
//! `spec.md` itself says "exactly nine slots" but only ever enumerates eight
//! `(platform, arch, libc)` tuples; this implementation ships the eight it
//! can actually name (see `DESIGN.md`).

use std::path::PathBuf;

use crate::config::Config;
use crate::core::binary::detector::DetectedBinary;
use crate::core::binary::target::{Arch, Libc, Platform, Target};
use crate::error::BinpressError;
use crate::io;

/// An immutable registry record: `{platform, arch, libc, bytes}`.
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedStub {
    pub platform: Platform,
    pub arch: Arch,
    pub libc: Libc,
    pub bytes: &'static [u8],
}

macro_rules! slot {
    ($platform:expr, $arch:expr, $libc:expr, $path:literal) => {
        EmbeddedStub { platform: $platform, arch: $arch, libc: $libc, bytes: include_bytes!($path) }
    };
}

/// The compiled-in registry. Slots shipped with a zero-length placeholder
/// resolve but are rejected at selection time with `StubUnavailable`.
static REGISTRY: &[EmbeddedStub] = &[
    slot!(Platform::Darwin, Arch::X64, Libc::None, "../../../stubs/darwin-x64.bin"),
    slot!(Platform::Darwin, Arch::Arm64, Libc::None, "../../../stubs/darwin-arm64.bin"),
    slot!(Platform::Linux, Arch::X64, Libc::Glibc, "../../../stubs/linux-x64-glibc.bin"),
    slot!(Platform::Linux, Arch::X64, Libc::Musl, "../../../stubs/linux-x64-musl.bin"),
    slot!(Platform::Linux, Arch::Arm64, Libc::Glibc, "../../../stubs/linux-arm64-glibc.bin"),
    slot!(Platform::Linux, Arch::Arm64, Libc::Musl, "../../../stubs/linux-arm64-musl.bin"),
    slot!(Platform::Win32, Arch::X64, Libc::None, "../../../stubs/win32-x64.bin"),
    slot!(Platform::Win32, Arch::Arm64, Libc::None, "../../../stubs/win32-arm64.bin"),
];

fn lookup(platform: Platform, arch: Arch, libc: Libc) -> Option<&'static EmbeddedStub> {
    REGISTRY.iter().find(|s| s.platform == platform && s.arch == arch && s.libc == libc)
}

/// Overrides layered on top of auto-detection, `spec.md` §4.2 steps 1-4.
#[derive(Debug, Clone, Default)]
pub struct StubSelection {
    pub target: Option<String>,
    pub platform: Option<Platform>,
    pub arch: Option<Arch>,
    pub libc: Option<Libc>,
}

fn unavailable(target: &Target) -> BinpressError {
    BinpressError::StubUnavailable {
        platform: target.platform.map_or_else(|| "?".to_string(), |p| p.to_string()),
        arch: target.arch.map_or_else(|| "?".to_string(), |a| a.to_string()),
        libc_suffix: match target.libc {
            Some(l @ (Libc::Glibc | Libc::Musl)) => format!("-{l}"),
            _ => String::new(),
        },
    }
}

/// Resolves a `Target` from an explicit `--target` string, individual
/// overrides, and detection of `input`, then looks the stub up in the
/// registry. `spec.md` §4.2.
pub fn select_stub(
    input: &DetectedBinary,
    selection: &StubSelection,
) -> Result<&'static EmbeddedStub, BinpressError> {
    let mut target = match &selection.target {
        Some(combined) => Target::parse_combined(combined)?,
        None => Target::default(),
    };

    if target.platform.is_none() {
        target.platform = selection.platform;
    }
    if target.arch.is_none() {
        target.arch = selection.arch;
    }
    if target.libc.is_none() {
        target.libc = selection.libc;
    }

    if target.platform.is_none() {
        target.platform = Some(input.platform);
    }
    if target.arch.is_none() {
        target.arch = Some(input.arch);
    }
    if target.libc.is_none() {
        target.libc = match target.platform {
            Some(Platform::Linux) => input.libc.or(Some(Libc::Glibc)),
            _ => Some(Libc::None),
        };
    }

    if !target.is_resolved() {
        return Err(unavailable(&target));
    }

    let (platform, arch, libc) = (target.platform.unwrap(), target.arch.unwrap(), target.libc.unwrap());
    let stub = lookup(platform, arch, libc).ok_or_else(|| unavailable(&target))?;
    if stub.bytes.is_empty() {
        return Err(unavailable(&target));
    }
    Ok(stub)
}

/// Materializes `stub` to a uniquely named, executable, close-on-exec temp
/// file (`spec.md` §4.2/§4.9).
pub fn write_temp_stub(config: &Config, stub: &EmbeddedStub) -> Result<PathBuf, BinpressError> {
    io::write_temp_stub(&config.temp_dir, stub.bytes)
}

/// Unlinks a temp stub written by [`write_temp_stub`]. Idempotent.
pub fn cleanup_temp_stub(path: &std::path::Path) -> Result<(), BinpressError> {
    io::cleanup_temp_stub(path)
}
