//! Mach-O rewriter (`spec.md` §4.6): inserts a read-only `SMOL` segment
//! carrying a single `__PRESSED_DATA` section, always immediately before
//! `__LINKEDIT` so `__LINKEDIT` stays the last segment on disk.
//!
//! Grounded on weaver's `core/merger/macos.rs` for the overall shape
//! (OS-specific rewrite path, `run_command`-via-`Command`-without-a-shell
//! for invoking an external tool) and on the Mach-O64 on-disk layout for the
//! actual mutation, hand-rolled over a `Vec<u8>` for the same
//! "don't trust a general write path" reason as the ELF rewriter.
//!
//! Any load command whose fields are absolute file offsets into
//! `__LINKEDIT` (`LC_SYMTAB`, `LC_CODE_SIGNATURE`, and the other
//! `linkedit_data_command`s) is shifted by the size of whatever was
//! inserted or removed before it. `LC_DYSYMTAB` and `LC_DYLD_INFO[_ONLY]`
//! carry several more such fields that this implementation does not yet
//! adjust (TODO: stubs built from a modern `ld` may use them).

use std::path::Path;
use std::process::Command;

use crate::config::Config;
use crate::debug::debug_enabled;
use crate::error::{BinpressError, RewriteStage, Result};
use crate::io;

const HEADER_SIZE: usize = 32;
const MH_MAGIC_64: u32 = 0xfeed_facf;

const LC_SEGMENT_64: u32 = 0x19;
const LC_SYMTAB: u32 = 0x2;
const LC_CODE_SIGNATURE: u32 = 0x1d;
const LC_SEGMENT_SPLIT_INFO: u32 = 0x1e;
const LC_FUNCTION_STARTS: u32 = 0x26;
const LC_DATA_IN_CODE: u32 = 0x29;
const LC_DYLIB_CODE_SIGN_DRS: u32 = 0x2b;
const LC_LINKER_OPTIMIZATION_HINT: u32 = 0x2e;
const LC_DYLD_EXPORTS_TRIE: u32 = 0x8000_0033;
const LC_DYLD_CHAINED_FIXUPS: u32 = 0x8000_0034;

const VM_PROT_READ: i32 = 1;

const SIP_PREFIXES: &[&str] =
    &["/System/", "/usr/bin/", "/usr/sbin/", "/usr/libexec/", "/bin/", "/sbin/"];

fn align4(n: usize) -> usize {
    (n + 3) & !3
}

fn read_u32(buf: &[u8], off: usize) -> u32 {
    u32::from_le_bytes(buf[off..off + 4].try_into().unwrap())
}
fn read_u64(buf: &[u8], off: usize) -> u64 {
    u64::from_le_bytes(buf[off..off + 8].try_into().unwrap())
}
fn write_u32(buf: &mut [u8], off: usize, v: u32) {
    buf[off..off + 4].copy_from_slice(&v.to_le_bytes());
}
fn write_u64(buf: &mut [u8], off: usize, v: u64) {
    buf[off..off + 8].copy_from_slice(&v.to_le_bytes());
}

#[derive(Debug, Clone, Copy)]
struct RawCommand {
    pos: usize,
    cmd: u32,
    cmdsize: usize,
}

fn read_commands(buf: &[u8]) -> Result<Vec<RawCommand>> {
    if buf.len() < HEADER_SIZE || read_u32(buf, 0) != MH_MAGIC_64 {
        return Err(BinpressError::rewrite("macho", RewriteStage::Parse, "not a 64-bit Mach-O stub"));
    }
    let verbose = debug_enabled("smol:macho");
    let ncmds = read_u32(buf, 16) as usize;
    let mut commands = Vec::with_capacity(ncmds);
    let mut pos = HEADER_SIZE;
    for _ in 0..ncmds {
        if pos + 8 > buf.len() {
            return Err(BinpressError::rewrite("macho", RewriteStage::Parse, "load command table truncated"));
        }
        let cmd = read_u32(buf, pos);
        let cmdsize = read_u32(buf, pos + 4) as usize;
        if verbose {
            log::debug!("load command at {pos:#x}: cmd={cmd:#x} cmdsize={cmdsize}");
        }
        commands.push(RawCommand { pos, cmd, cmdsize });
        pos += cmdsize;
    }
    Ok(commands)
}

struct SegmentInfo {
    pos: usize,
    cmdsize: usize,
    vmaddr: u64,
    fileoff: u64,
    filesize: u64,
}

fn segname_at(buf: &[u8], pos: usize) -> &[u8] {
    &buf[pos + 8..pos + 24]
}

fn find_segment(commands: &[RawCommand], buf: &[u8], name: &[u8]) -> Option<SegmentInfo> {
    commands.iter().find_map(|c| {
        if c.cmd != LC_SEGMENT_64 {
            return None;
        }
        let raw_name = segname_at(buf, c.pos);
        if !raw_name.starts_with(name) || raw_name[name.len()..].iter().any(|&b| b != 0) {
            return None;
        }
        Some(SegmentInfo {
            pos: c.pos,
            cmdsize: c.cmdsize,
            vmaddr: read_u64(buf, c.pos + 24),
            fileoff: read_u64(buf, c.pos + 40),
            filesize: read_u64(buf, c.pos + 48),
        })
    })
}

fn find_command(commands: &[RawCommand], cmd: u32) -> Option<RawCommand> {
    commands.iter().copied().find(|c| c.cmd == cmd)
}

/// Shifts every load command field that stores an absolute file offset into
/// `__LINKEDIT` by `delta`, for fields whose original value is `>= threshold`.
fn fixup_body_offsets(buf: &mut [u8], commands: &[RawCommand], threshold: u64, delta: i64) {
    let shift = |v: u64| -> u64 { if v >= threshold { (v as i64 + delta) as u64 } else { v } };
    let shift32 = |v: u32| -> u32 { if v as u64 >= threshold { (v as i64 + delta) as u32 } else { v } };

    for c in commands {
        match c.cmd {
            LC_SEGMENT_64 => {
                let fileoff = read_u64(buf, c.pos + 40);
                write_u64(buf, c.pos + 40, shift(fileoff));
                let vmaddr = read_u64(buf, c.pos + 24);
                write_u64(buf, c.pos + 24, shift(vmaddr));
            }
            LC_SYMTAB => {
                let symoff = read_u32(buf, c.pos + 8);
                write_u32(buf, c.pos + 8, shift32(symoff));
                let stroff = read_u32(buf, c.pos + 16);
                write_u32(buf, c.pos + 16, shift32(stroff));
            }
            LC_CODE_SIGNATURE
            | LC_SEGMENT_SPLIT_INFO
            | LC_FUNCTION_STARTS
            | LC_DATA_IN_CODE
            | LC_DYLIB_CODE_SIGN_DRS
            | LC_LINKER_OPTIMIZATION_HINT
            | LC_DYLD_EXPORTS_TRIE
            | LC_DYLD_CHAINED_FIXUPS => {
                let dataoff = read_u32(buf, c.pos + 8);
                write_u32(buf, c.pos + 8, shift32(dataoff));
            }
            _ => {}
        }
    }
}

fn build_section(name: &[u8; 16], segname: &[u8; 16], addr: u64, size: u64, offset: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(80);
    out.extend_from_slice(name);
    out.extend_from_slice(segname);
    out.extend_from_slice(&addr.to_le_bytes());
    out.extend_from_slice(&size.to_le_bytes());
    out.extend_from_slice(&offset.to_le_bytes());
    out.extend_from_slice(&2u32.to_le_bytes()); // align = 2^2 = 4 bytes
    out.extend_from_slice(&0u32.to_le_bytes()); // reloff
    out.extend_from_slice(&0u32.to_le_bytes()); // nreloc
    out.extend_from_slice(&0u32.to_le_bytes()); // flags = S_REGULAR
    out.extend_from_slice(&0u32.to_le_bytes()); // reserved1
    out.extend_from_slice(&0u32.to_le_bytes()); // reserved2
    out.extend_from_slice(&0u32.to_le_bytes()); // reserved3
    out
}

fn segname_bytes(name: &str) -> [u8; 16] {
    let mut out = [0u8; 16];
    out[..name.len()].copy_from_slice(name.as_bytes());
    out
}

fn build_segment_command(vmaddr: u64, size: u64, fileoff: u64, section: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(72 + section.len());
    out.extend_from_slice(&LC_SEGMENT_64.to_le_bytes());
    out.extend_from_slice(&((72 + section.len()) as u32).to_le_bytes());
    out.extend_from_slice(&segname_bytes("SMOL"));
    out.extend_from_slice(&vmaddr.to_le_bytes());
    out.extend_from_slice(&size.to_le_bytes());
    out.extend_from_slice(&fileoff.to_le_bytes());
    out.extend_from_slice(&size.to_le_bytes());
    out.extend_from_slice(&VM_PROT_READ.to_le_bytes());
    out.extend_from_slice(&VM_PROT_READ.to_le_bytes());
    out.extend_from_slice(&1u32.to_le_bytes()); // nsects
    out.extend_from_slice(&0u32.to_le_bytes()); // flags
    out.extend_from_slice(section);
    out
}

/// ADD_NEW: insert a fresh `SMOL`/`__PRESSED_DATA` immediately before
/// `__LINKEDIT`.
fn add_segment(mut buf: Vec<u8>, payload: &[u8]) -> Result<Vec<u8>> {
    let commands = read_commands(&buf)?;
    let linkedit = find_segment(&commands, &buf, b"__LINKEDIT")
        .ok_or_else(|| BinpressError::rewrite("macho", RewriteStage::Mutate, "stub has no __LINKEDIT segment"))?;

    let mut section_data = payload.to_vec();
    section_data.resize(align4(payload.len()), 0);
    let aligned_len = section_data.len() as u64;

    let new_fileoff = linkedit.fileoff;
    let new_vmaddr = linkedit.vmaddr;
    if new_fileoff > u32::MAX as u64 {
        return Err(BinpressError::rewrite("macho", RewriteStage::Mutate, "payload offset exceeds 32-bit section offset field"));
    }

    fixup_body_offsets(&mut buf, &commands, linkedit.fileoff, aligned_len as i64);

    buf.splice(new_fileoff as usize..new_fileoff as usize, section_data.iter().copied());

    let section = build_section(
        &segname_bytes("__PRESSED_DATA"),
        &segname_bytes("SMOL"),
        new_vmaddr,
        aligned_len,
        new_fileoff as u32,
    );
    let cmd_bytes = build_segment_command(new_vmaddr, aligned_len, new_fileoff, &section);
    let cmd_len = cmd_bytes.len();
    buf.splice(linkedit.pos..linkedit.pos, cmd_bytes);

    let ncmds = read_u32(&buf, 16);
    write_u32(&mut buf, 16, ncmds + 1);
    let sizeofcmds = read_u32(&buf, 20);
    write_u32(&mut buf, 20, sizeofcmds + cmd_len as u32);

    Ok(buf)
}

/// Removes a previously inserted `LC_SEGMENT_64` named `name` (inverse of
/// [`add_segment`]'s insertion), used by the UPDATE transition.
fn remove_segment(mut buf: Vec<u8>, name: &[u8]) -> Result<Vec<u8>> {
    let commands = read_commands(&buf)?;
    let seg = find_segment(&commands, &buf, name)
        .ok_or_else(|| BinpressError::rewrite("macho", RewriteStage::Mutate, "segment to remove not found"))?;

    let threshold = seg.fileoff + seg.filesize;
    fixup_body_offsets(&mut buf, &commands, threshold, -(seg.filesize as i64));

    buf.splice(seg.fileoff as usize..(seg.fileoff + seg.filesize) as usize, std::iter::empty());
    buf.splice(seg.pos..seg.pos + seg.cmdsize, std::iter::empty());

    let ncmds = read_u32(&buf, 16);
    write_u32(&mut buf, 16, ncmds - 1);
    let sizeofcmds = read_u32(&buf, 20);
    write_u32(&mut buf, 20, sizeofcmds - seg.cmdsize as u32);

    Ok(buf)
}

/// Removes a plain `linkedit_data_command` (e.g. `LC_CODE_SIGNATURE`) and
/// the data it points at, after `remove_segment`'s SMOL removal per the
/// CHECK_EXISTING/UPDATE ordering rule in `spec.md` §4.6.
fn remove_linkedit_data_command(mut buf: Vec<u8>, cmd: u32) -> Result<Vec<u8>> {
    let commands = read_commands(&buf)?;
    let found = find_command(&commands, cmd)
        .ok_or_else(|| BinpressError::rewrite("macho", RewriteStage::Mutate, "command to remove not found"))?;
    let dataoff = read_u32(&buf, found.pos + 8) as u64;
    let datasize = read_u32(&buf, found.pos + 12) as u64;

    fixup_body_offsets(&mut buf, &commands, dataoff + datasize, -(datasize as i64));

    buf.splice(dataoff as usize..(dataoff + datasize) as usize, std::iter::empty());
    buf.splice(found.pos..found.pos + found.cmdsize, std::iter::empty());

    let ncmds = read_u32(&buf, 16);
    write_u32(&mut buf, 16, ncmds - 1);
    let sizeofcmds = read_u32(&buf, 20);
    write_u32(&mut buf, 20, sizeofcmds - found.cmdsize as u32);

    Ok(buf)
}

fn reject_sip_protected(path: &Path) -> Result<()> {
    let as_str = path.to_string_lossy();
    if SIP_PREFIXES.iter().any(|prefix| as_str.starts_with(prefix)) {
        return Err(BinpressError::SipProtected(path.to_path_buf()));
    }
    Ok(())
}

/// Ad-hoc code-signs `path` with a direct exec (no shell). Failures are
/// logged and non-fatal (`spec.md` §4.6/§5).
fn sign(path: &Path) {
    match Command::new("codesign").args(["--force", "--sign", "-", path.to_string_lossy().as_ref()]).output() {
        Ok(output) if output.status.success() => {
            log::debug!("ad-hoc signed {}", path.display());
        }
        Ok(output) => {
            log::warn!("codesign failed for {}: {}", path.display(), String::from_utf8_lossy(&output.stderr));
        }
        Err(e) => {
            log::warn!("could not invoke codesign for {}: {e}", path.display());
        }
    }
}

pub fn rewrite(stub_bytes: &[u8], payload: &[u8], output_path: &Path, config: &Config) -> Result<()> {
    let _ = config;
    reject_sip_protected(output_path)?;

    let mut buf = stub_bytes.to_vec();
    let commands = read_commands(&buf)?;
    if find_segment(&commands, &buf, b"SMOL").is_some() {
        buf = remove_segment(buf, b"SMOL")?;
        let commands = read_commands(&buf)?;
        if find_command(&commands, LC_CODE_SIGNATURE).is_some() {
            buf = remove_linkedit_data_command(buf, LC_CODE_SIGNATURE)?;
        }
    }
    buf = add_segment(buf, payload)?;

    io::atomic_write(output_path, &buf, Some(0o755))?;
    io::fsync_and_verify(output_path)?;
    sign(output_path);
    Ok(())
}
