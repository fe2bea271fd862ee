//! ELF rewriter (`spec.md` §4.5): raw append of a `PT_NOTE` program-header
//! entry whose descriptor is the framed payload.
//!
//! Grounded on weaver's `goblin`-based ELF reading
//! (`core/binary/detector/arch.rs` walks `elf.header`/`elf.program_headers`)
//! generalized from read-only classification to a minimal in-place edit: we
//! parse with `goblin::elf::Elf::parse` to find a reusable note slot or the
//! free space for a new program-header entry, then edit the raw `Vec<u8>`
//! directly rather than asking a builder to re-serialize the file.

use std::path::Path;

use goblin::elf::program_header::PT_NOTE;
use goblin::elf::Elf;

use crate::error::{BinpressError, RewriteStage};
use crate::io;

const PHDR_SIZE: u64 = 56;
const NOTE_NAME: &[u8] = b"BINPRESS\0\0\0\0"; // padded to a multiple of 4 already
const NOTE_TYPE: u32 = 0x5052_4553; // "PRES" ASCII, arbitrary but stable

fn align4(n: usize) -> usize {
    (n + 3) & !3
}

/// Builds an ELF note (`Elf64_Nhdr` + name + desc, each padded to 4 bytes).
fn build_note(desc: &[u8]) -> Vec<u8> {
    let namesz = NOTE_NAME.len() as u32;
    let descsz = desc.len() as u32;
    let mut note = Vec::with_capacity(12 + align4(NOTE_NAME.len()) + align4(desc.len()));
    note.extend_from_slice(&namesz.to_le_bytes());
    note.extend_from_slice(&descsz.to_le_bytes());
    note.extend_from_slice(&NOTE_TYPE.to_le_bytes());
    note.extend_from_slice(NOTE_NAME);
    note.resize(12 + align4(NOTE_NAME.len()), 0);
    note.extend_from_slice(desc);
    note.resize(note.len() + (align4(desc.len()) - desc.len()), 0);
    note
}

fn read_u16(buf: &[u8], off: usize) -> u16 {
    u16::from_le_bytes(buf[off..off + 2].try_into().unwrap())
}
fn read_u64(buf: &[u8], off: usize) -> u64 {
    u64::from_le_bytes(buf[off..off + 8].try_into().unwrap())
}
fn write_u16(buf: &mut [u8], off: usize, v: u16) {
    buf[off..off + 2].copy_from_slice(&v.to_le_bytes());
}
fn write_u32(buf: &mut [u8], off: usize, v: u32) {
    buf[off..off + 4].copy_from_slice(&v.to_le_bytes());
}
fn write_u64(buf: &mut [u8], off: usize, v: u64) {
    buf[off..off + 8].copy_from_slice(&v.to_le_bytes());
}

pub fn rewrite(stub_bytes: &[u8], payload: &[u8], output_path: &Path) -> crate::error::Result<()> {
    let buf = embed_note(stub_bytes, payload)?;
    io::atomic_write(output_path, &buf, Some(0o755))?;
    io::fsync_and_verify(output_path)?;
    Ok(())
}

fn embed_note(stub_bytes: &[u8], payload: &[u8]) -> crate::error::Result<Vec<u8>> {
    let elf = Elf::parse(stub_bytes).map_err(|e| {
        BinpressError::rewrite("elf", RewriteStage::Parse, format!("not a valid ELF64 stub: {e}"))
    })?;

    let e_phoff = read_u64(stub_bytes, 32) as usize;
    let e_phentsize = read_u16(stub_bytes, 54) as usize;
    let e_phnum = read_u16(stub_bytes, 56) as usize;
    if e_phentsize as u64 != PHDR_SIZE {
        return Err(BinpressError::rewrite(
            "elf",
            RewriteStage::CheckExisting,
            "unexpected e_phentsize, stub is not a standard ELF64",
        ));
    }

    let note = build_note(payload);
    let mut buf = stub_bytes.to_vec();

    // CHECK_EXISTING: reuse an unused (zero-sized) PT_NOTE slot if one exists.
    let reusable = elf
        .program_headers
        .iter()
        .enumerate()
        .find(|(_, ph)| ph.p_type == PT_NOTE && ph.p_filesz == 0);

    let phdr_index = if let Some((idx, _)) = reusable {
        idx
    } else {
        // ADD_NEW: need room for one more phdr entry between the end of the
        // existing table and the first segment's file content.
        let phdr_table_end = e_phoff + e_phnum * e_phentsize as usize;
        let first_segment_offset = elf
            .program_headers
            .iter()
            .filter(|ph| ph.p_filesz > 0)
            .map(|ph| ph.p_offset)
            .min()
            .unwrap_or(buf.len() as u64) as usize;

        if phdr_table_end + e_phentsize as usize > first_segment_offset {
            return Err(BinpressError::rewrite(
                "elf",
                RewriteStage::Mutate,
                "ElfNoNoteSlot: no reusable PT_NOTE and no room to append a program header",
            ));
        }

        // Make space for the new entry's bytes and bump e_phnum; the new
        // entry itself is zero-filled until we set its fields below.
        buf.splice(phdr_table_end..phdr_table_end, std::iter::repeat(0u8).take(e_phentsize));
        write_u16(&mut buf, 56, (e_phnum + 1) as u16);
        e_phnum
    };

    let note_offset = buf.len() as u64;
    buf.extend_from_slice(&note);

    let entry_off = e_phoff + phdr_index * e_phentsize;
    write_u32(&mut buf, entry_off, PT_NOTE);
    write_u32(&mut buf, entry_off + 4, 0); // p_flags
    write_u64(&mut buf, entry_off + 8, note_offset); // p_offset
    write_u64(&mut buf, entry_off + 16, note_offset); // p_vaddr (unmapped note, offset is a safe placeholder)
    write_u64(&mut buf, entry_off + 24, note_offset); // p_paddr
    write_u64(&mut buf, entry_off + 32, note.len() as u64); // p_filesz
    write_u64(&mut buf, entry_off + 40, note.len() as u64); // p_memsz
    write_u64(&mut buf, entry_off + 48, 4); // p_align

    extend_covering_load_segment(&mut buf, &elf, note_offset + note.len() as u64)?;

    Ok(buf)
}

/// `spec.md` §4.5 (b): whichever `PT_LOAD` reaches furthest into the file
/// must be grown to cover the newly appended note, or the note falls outside
/// every segment's file range (Testable Invariant #5).
fn extend_covering_load_segment(buf: &mut [u8], elf: &Elf, new_end: u64) -> crate::error::Result<()> {
    let e_phoff = read_u64(buf, 32) as usize;
    let e_phentsize = read_u16(buf, 54) as usize;

    let (load_index, load_offset, old_filesz, old_memsz) = elf
        .program_headers
        .iter()
        .enumerate()
        .filter(|(_, ph)| ph.p_type == goblin::elf::program_header::PT_LOAD)
        .max_by_key(|(_, ph)| ph.p_offset + ph.p_filesz)
        .map(|(idx, ph)| (idx, ph.p_offset, ph.p_filesz, ph.p_memsz))
        .ok_or_else(|| {
            BinpressError::rewrite("elf", RewriteStage::Mutate, "no PT_LOAD segment to extend over appended note")
        })?;

    let new_filesz = new_end - load_offset;
    let delta = new_filesz - old_filesz;

    let entry_off = e_phoff + load_index * e_phentsize;
    write_u64(buf, entry_off + 32, new_filesz);
    write_u64(buf, entry_off + 40, old_memsz + delta);

    Ok(())
}
