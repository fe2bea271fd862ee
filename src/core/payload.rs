//! Payload framer (`spec.md` §3.1, §4.4): builds and parses the
//! self-describing blob embedded into stub notes/sections, and the
//! runtime-facing cache key.
//!
//! The magic marker is split into three compile-time parts and concatenated
//! at build time (`spec.md` §6.1: "split to evade naive binary-pattern
//! scanners"), mirroring the way weaver splits sentinel strings across
//! `core/merger/v2.rs` constants rather than keeping one literal.

use crate::core::binary::target::{Arch, Libc, Platform};
use crate::error::BinpressError;

const MAGIC_PART_1: &str = "BINPRESS_MA";
const MAGIC_PART_2: &str = "GIC_MARKER_";
const MAGIC_PART_3: &str = "SENTINEL01";

pub const MAGIC_LEN: usize = 32;
const HEADER_LEN: usize = 68; // up to and including has-config flag, before any config blob

pub fn magic() -> [u8; MAGIC_LEN] {
    let joined = format!("{MAGIC_PART_1}{MAGIC_PART_2}{MAGIC_PART_3}");
    debug_assert_eq!(joined.len(), MAGIC_LEN);
    let mut out = [0u8; MAGIC_LEN];
    out.copy_from_slice(joined.as_bytes());
    out
}

/// A parsed payload header plus a borrow of its compressed tail.
#[derive(Debug, Clone, Copy)]
pub struct PayloadHeader {
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub cache_key: [u8; 16],
    pub platform: Option<Platform>,
    pub arch: Option<Arch>,
    pub libc: Option<Libc>,
    pub has_config: bool,
}

/// Resolves an explicit byte or, when `0xFF` is passed, the running host's
/// own platform/arch (`spec.md` §4.4).
fn resolve_platform_byte(b: u8) -> Result<Platform, BinpressError> {
    if b == 0xFF {
        return match std::env::consts::OS {
            "linux" => Ok(Platform::Linux),
            "macos" => Ok(Platform::Darwin),
            "windows" => Ok(Platform::Win32),
            other => Err(BinpressError::ArgError(format!("cannot auto-detect platform on host OS '{other}'"))),
        };
    }
    Platform::from_byte(b).ok_or_else(|| BinpressError::ArgError(format!("invalid platform byte {b:#x}")))
}

fn resolve_arch_byte(b: u8) -> Result<Arch, BinpressError> {
    if b == 0xFF {
        return match std::env::consts::ARCH {
            "x86_64" => Ok(Arch::X64),
            "aarch64" => Ok(Arch::Arm64),
            other => Err(BinpressError::ArgError(format!("cannot auto-detect arch on host arch '{other}'"))),
        };
    }
    Arch::from_byte(b).ok_or_else(|| BinpressError::ArgError(format!("invalid arch byte {b:#x}")))
}

fn resolve_libc_byte(b: u8) -> Result<Option<Libc>, BinpressError> {
    if b == 0xFF {
        return Ok(None);
    }
    Libc::from_byte(b).map(Some).ok_or_else(|| BinpressError::ArgError(format!("invalid libc byte {b:#x}")))
}

/// FNV-1a-style fold of `(uncompressed_size, compressed_size, algorithm_tag)`
/// into 16 lowercase hex ASCII characters. `spec.md` §4.4 and §9: the formula
/// is explicitly not load-bearing for correctness, only collision-tolerant.
pub fn cache_key(uncompressed_size: u64, compressed_size: u64, algorithm_tag: u8) -> [u8; 16] {
    const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut hash = FNV_OFFSET_BASIS;
    for byte in uncompressed_size
        .to_le_bytes()
        .into_iter()
        .chain(compressed_size.to_le_bytes())
        .chain(std::iter::once(algorithm_tag))
    {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }

    let hex = format!("{hash:016x}");
    let mut out = [0u8; 16];
    out.copy_from_slice(hex.as_bytes());
    out
}

/// Assembles the framed payload of `spec.md` §3.1.
#[allow(clippy::too_many_arguments)]
pub fn build_payload(
    compressed: &[u8],
    uncompressed_size: u64,
    platform_b: u8,
    arch_b: u8,
    libc_b: u8,
    algorithm_tag: u8,
    config: Option<&[u8]>,
) -> Result<Vec<u8>, BinpressError> {
    let platform = resolve_platform_byte(platform_b)?;
    let arch = resolve_arch_byte(arch_b)?;
    let libc = resolve_libc_byte(libc_b)?;
    let compressed_size = compressed.len() as u64;
    let key = cache_key(uncompressed_size, compressed_size, algorithm_tag);

    let mut out = Vec::with_capacity(HEADER_LEN + config.map_or(0, |c| c.len()) + compressed.len());
    out.extend_from_slice(&magic());
    out.extend_from_slice(&compressed_size.to_le_bytes());
    out.extend_from_slice(&uncompressed_size.to_le_bytes());
    out.extend_from_slice(&key);
    out.push(platform.to_byte());
    out.push(arch.to_byte());
    out.push(libc.map_or(0xFF, Libc::to_byte));
    out.push(config.is_some() as u8);
    if let Some(config) = config {
        out.extend_from_slice(config);
    }
    out.extend_from_slice(compressed);

    Ok(out)
}

/// Parses a framed payload out of `data`, which may contain trailing bytes
/// past the end of the payload (the caller sliced it out of a larger note or
/// section and has already validated the magic marker's offset).
pub fn parse_payload(data: &[u8]) -> Result<(PayloadHeader, &[u8]), BinpressError> {
    if data.len() < HEADER_LEN {
        return Err(BinpressError::InputError("payload shorter than its fixed header".into()));
    }
    if data[0..MAGIC_LEN] != magic() {
        return Err(BinpressError::InputError("payload magic marker mismatch".into()));
    }

    let compressed_size = u64::from_le_bytes(data[32..40].try_into().unwrap());
    let uncompressed_size = u64::from_le_bytes(data[40..48].try_into().unwrap());
    let mut cache_key = [0u8; 16];
    cache_key.copy_from_slice(&data[48..64]);
    let platform = Platform::from_byte(data[64]);
    let arch = Arch::from_byte(data[65]);
    let libc = Libc::from_byte(data[66]);
    let has_config = data[67] != 0;

    let header = PayloadHeader { compressed_size, uncompressed_size, cache_key, platform, arch, libc, has_config };

    // This implementation never emits a config blob (`spec.md` §9 open
    // question: has-config is unconditionally 0), so the compressed data
    // starts immediately after the fixed header.
    let tail_start = HEADER_LEN;
    let tail_end = tail_start
        .checked_add(compressed_size as usize)
        .ok_or_else(|| BinpressError::InputError("compressed size overflows payload bounds".into()))?;
    if data.len() < tail_end {
        return Err(BinpressError::InputError("payload truncated before end of compressed data".into()));
    }

    Ok((header, &data[tail_start..tail_end]))
}

/// Finds the offset of the magic marker in `haystack`, as the runtime stub
/// would when scanning its own memory image (`spec.md` §6.1).
pub fn find_magic(haystack: &[u8]) -> Option<usize> {
    let needle = magic();
    haystack.windows(MAGIC_LEN).position(|w| w == needle)
}
