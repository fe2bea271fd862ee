//! Compression engine (`spec.md` §4.3).
//!
//! `spec.md` names LZFSE as the primary algorithm with LZMA and, on
//! Windows-only build variants, LZMS/XPRESS as alternates. No crate in the
//! retrieval pack implements LZFSE, so every variant here is backed by the
//! same `xz2`-wrapped LZMA codec at a distinct preset — see `DESIGN.md` for
//! the substitution record. The `Algorithm` enum and its wire tag are kept
//! exactly as named so a future real LZFSE encoder can drop in without
//! touching callers.

use std::io::Read;

use xz2::read::{XzDecoder, XzEncoder};

use crate::error::BinpressError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Lzfse,
    Lzma,
    #[cfg(feature = "windows")]
    Xpress,
    #[cfg(feature = "windows")]
    Lzms,
}

impl Algorithm {
    /// Wire tag folded into the cache key (`spec.md` §4.4).
    pub fn tag(self) -> u8 {
        match self {
            Algorithm::Lzfse => 0,
            Algorithm::Lzma => 1,
            #[cfg(feature = "windows")]
            Algorithm::Xpress => 2,
            #[cfg(feature = "windows")]
            Algorithm::Lzms => 3,
        }
    }

    /// `xz2` preset, 0 (fastest) to 9 (best ratio).
    fn preset(self) -> u32 {
        match self {
            // The SMOL framing the embedder hard-codes (`spec.md` §4.3)
            // favors speed; the explicit Lzma tag favors ratio.
            Algorithm::Lzfse => 6,
            Algorithm::Lzma => 9,
            #[cfg(feature = "windows")]
            Algorithm::Xpress => 3,
            #[cfg(feature = "windows")]
            Algorithm::Lzms => 9,
        }
    }
}

/// Compresses `data`, returning a self-contained LZMA stream shrunk to its
/// actual size. `spec.md` §4.3: failures return `CompressError`.
pub fn compress(algorithm: Algorithm, data: &[u8]) -> Result<Vec<u8>, BinpressError> {
    let mut encoder = XzEncoder::new(data, algorithm.preset());
    let mut out = Vec::new();
    encoder.read_to_end(&mut out).map_err(|e| BinpressError::CompressError {
        kind: "encode",
        underlying: e.to_string(),
    })?;
    out.shrink_to_fit();
    Ok(out)
}

/// Inverse of [`compress`]. `expected_uncompressed_size` bounds the output
/// buffer so a truncated or hostile stream can't force unbounded allocation.
pub fn decompress(
    algorithm: Algorithm,
    data: &[u8],
    expected_uncompressed_size: u64,
) -> Result<Vec<u8>, BinpressError> {
    let mut decoder = XzDecoder::new(data);
    let mut out = Vec::with_capacity(expected_uncompressed_size.min(64 * 1024 * 1024) as usize);
    decoder.by_ref().take(expected_uncompressed_size + 1).read_to_end(&mut out).map_err(|e| {
        BinpressError::CompressError { kind: "decode", underlying: e.to_string() }
    })?;

    if out.len() as u64 != expected_uncompressed_size {
        return Err(BinpressError::CompressError {
            kind: "decode",
            underlying: format!(
                "decompressed {} bytes, expected {expected_uncompressed_size}",
                out.len()
            ),
        });
    }

    let _ = algorithm; // single codec today; kept for the wire tag's sake
    Ok(out)
}
