//! Payload scanning, decompression, and cache-directory extraction shared by
//! every platform's `run`. Duplicates the wire layout of the embedder's
//! `core/payload.rs` rather than depending on the `binpress` crate: this
//! binary is built and shipped independently of it (see the module doc on
//! `main.rs`).

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use xz2::read::XzDecoder;

const MAGIC_PART_1: &str = "BINPRESS_MA";
const MAGIC_PART_2: &str = "GIC_MARKER_";
const MAGIC_PART_3: &str = "SENTINEL01";
const MAGIC_LEN: usize = 32;
const HEADER_LEN: usize = 68;

fn magic() -> [u8; MAGIC_LEN] {
    let joined = format!("{MAGIC_PART_1}{MAGIC_PART_2}{MAGIC_PART_3}");
    let mut out = [0u8; MAGIC_LEN];
    out.copy_from_slice(joined.as_bytes());
    out
}

/// A parsed payload header, stripped of anything the stub doesn't need
/// (platform/arch/libc are the embedder's concern, not the runtime's).
pub struct PayloadHeader {
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub cache_key: [u8; 16],
}

pub fn find_magic(haystack: &[u8]) -> Option<usize> {
    let needle = magic();
    haystack.windows(MAGIC_LEN).position(|w| w == needle)
}

/// Parses the header starting at `offset` in `image`, returning it plus the
/// compressed tail slice.
pub fn parse_payload(image: &[u8], offset: usize) -> Result<(PayloadHeader, &[u8]), String> {
    let data = image.get(offset..).ok_or("magic offset past end of image")?;
    if data.len() < HEADER_LEN {
        return Err("payload shorter than its fixed header".into());
    }

    let compressed_size = u64::from_le_bytes(data[32..40].try_into().unwrap());
    let uncompressed_size = u64::from_le_bytes(data[40..48].try_into().unwrap());
    let mut cache_key = [0u8; 16];
    cache_key.copy_from_slice(&data[48..64]);

    let tail_start = HEADER_LEN;
    let tail_end = tail_start
        .checked_add(compressed_size as usize)
        .ok_or("compressed size overflows payload bounds")?;
    if data.len() < tail_end {
        return Err("payload truncated before end of compressed data".into());
    }

    Ok((PayloadHeader { compressed_size, uncompressed_size, cache_key }, &data[tail_start..tail_end]))
}

pub fn decompress(compressed: &[u8], expected_uncompressed_size: u64) -> Result<Vec<u8>, String> {
    let mut decoder = XzDecoder::new(compressed);
    let mut out = Vec::with_capacity(expected_uncompressed_size.min(64 * 1024 * 1024) as usize);
    decoder
        .by_ref()
        .take(expected_uncompressed_size + 1)
        .read_to_end(&mut out)
        .map_err(|e| format!("lzma decode failed: {e}"))?;

    if out.len() as u64 != expected_uncompressed_size {
        return Err(format!("decompressed {} bytes, expected {expected_uncompressed_size}", out.len()));
    }
    Ok(out)
}

fn cache_key_hex(key: &[u8; 16]) -> String {
    String::from_utf8_lossy(key).into_owned()
}

/// Extracts `decompressed` into `${TMPDIR}/binpress-cache/<cache key>/payload`
/// (`.exe` suffixed on Windows), reusing a prior extraction whose size
/// already matches rather than re-writing it on every launch.
pub fn extract_to_cache(decompressed: &[u8], header: &PayloadHeader, exe_suffix: &str) -> Result<PathBuf, String> {
    let cache_dir = std::env::temp_dir().join("binpress-cache").join(cache_key_hex(&header.cache_key));
    fs::create_dir_all(&cache_dir).map_err(|e| format!("creating cache dir: {e}"))?;

    let extracted_path = cache_dir.join(format!("payload{exe_suffix}"));
    let needs_write = match fs::metadata(&extracted_path) {
        Ok(meta) => meta.len() != decompressed.len() as u64,
        Err(_) => true,
    };

    if needs_write {
        let tmp_path = cache_dir.join(format!(".payload{exe_suffix}.tmp"));
        fs::write(&tmp_path, decompressed).map_err(|e| format!("writing extracted payload: {e}"))?;
        set_executable(&tmp_path)?;
        fs::rename(&tmp_path, &extracted_path).map_err(|e| format!("finalizing extracted payload: {e}"))?;
    }

    Ok(extracted_path)
}

#[cfg(unix)]
fn set_executable(path: &Path) -> Result<(), String> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path).map_err(|e| e.to_string())?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).map_err(|e| e.to_string())
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> Result<(), String> {
    Ok(())
}

pub fn log(msg: impl std::fmt::Display) {
    eprintln!("[binpress-stub] {msg}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_magic_anywhere_in_haystack() {
        let mut haystack = vec![0xAAu8; 40];
        haystack.extend_from_slice(&magic());
        haystack.extend_from_slice(&[0xBB; 10]);
        assert_eq!(find_magic(&haystack), Some(40));
    }

    #[test]
    fn parse_rejects_truncated_header() {
        let short = vec![0u8; HEADER_LEN - 1];
        assert!(parse_payload(&short, 0).is_err());
    }

    #[test]
    fn decompress_rejects_size_mismatch() {
        let mut encoder = xz2::write::XzEncoder::new(Vec::new(), 6);
        use std::io::Write;
        encoder.write_all(b"hello world").unwrap();
        let compressed = encoder.finish().unwrap();
        assert!(decompress(&compressed, 999).is_err());
    }
}
