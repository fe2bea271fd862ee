const PHDR_SIZE: u64 = 56;

fn write_u16(buf: &mut [u8], off: usize, v: u16) {
    buf[off..off + 2].copy_from_slice(&v.to_le_bytes());
}
fn write_u32(buf: &mut [u8], off: usize, v: u32) {
    buf[off..off + 4].copy_from_slice(&v.to_le_bytes());
}
fn write_u64(buf: &mut [u8], off: usize, v: u64) {
    buf[off..off + 8].copy_from_slice(&v.to_le_bytes());
}

/// A minimal ELF64 executable: one `PT_LOAD` covering the whole file and one
/// already-zero-sized `PT_NOTE` (a reusable slot for the embedder's note).
pub fn synthetic_elf64() -> Vec<u8> {
    let phoff = 64usize;
    let phdr_count = 2;
    let first_segment_offset = phoff + phdr_count * PHDR_SIZE as usize;

    let mut buf = vec![0u8; first_segment_offset + 32];
    buf[0..4].copy_from_slice(b"\x7fELF");
    buf[4] = 2; // ELFCLASS64
    buf[5] = 1; // ELFDATA2LSB
    buf[6] = 1;
    write_u16(&mut buf, 16, 2); // e_type = ET_EXEC
    write_u16(&mut buf, 18, 0x3e); // EM_X86_64
    write_u32(&mut buf, 20, 1);
    write_u64(&mut buf, 32, phoff as u64);
    write_u16(&mut buf, 52, 64);
    write_u16(&mut buf, 54, PHDR_SIZE as u16);
    write_u16(&mut buf, 56, phdr_count as u16);

    // PT_LOAD
    write_u32(&mut buf, phoff, 1);
    write_u64(&mut buf, phoff + 32, buf.len() as u64);
    write_u64(&mut buf, phoff + 40, buf.len() as u64);

    // PT_NOTE, zero-sized (reusable)
    let note_off = phoff + PHDR_SIZE as usize;
    write_u32(&mut buf, note_off, 4); // PT_NOTE
    write_u64(&mut buf, note_off + 8, first_segment_offset as u64);

    buf
}

/// A minimal Mach-O64 executable with a `__LINKEDIT` segment at the tail, the
/// way `add_segment` expects to find it.
pub fn synthetic_macho64() -> Vec<u8> {
    const HEADER_SIZE: usize = 32;

    let mut ncmds = 0u32;
    let mut sizeofcmds = 0u32;
    let mut buf = vec![0u8; HEADER_SIZE];
    buf[0..4].copy_from_slice(&0xfeed_facfu32.to_le_bytes());
    write_u32(&mut buf, 4, 0x0100_0007); // CPU_TYPE_X86_64

    // __TEXT segment, no sections, covering the header.
    let text_off = buf.len();
    buf.resize(buf.len() + 72, 0);
    write_u32(&mut buf, text_off, 0x19); // LC_SEGMENT_64
    write_u32(&mut buf, text_off + 4, 72);
    buf[text_off + 8..text_off + 14].copy_from_slice(b"__TEXT");
    write_u64(&mut buf, text_off + 32, 0); // fileoff
    write_u64(&mut buf, text_off + 40, HEADER_SIZE as u64); // filesize
    ncmds += 1;
    sizeofcmds += 72;

    // __LINKEDIT segment at the very end of the file.
    let linkedit_data = vec![0xCDu8; 64];
    let cmd_off = buf.len();
    buf.resize(buf.len() + 72, 0);
    write_u32(&mut buf, cmd_off, 0x19); // LC_SEGMENT_64
    write_u32(&mut buf, cmd_off + 4, 72);
    buf[cmd_off + 8..cmd_off + 18].copy_from_slice(b"__LINKEDIT");
    let data_fileoff = buf.len() as u64;
    write_u64(&mut buf, cmd_off + 32, data_fileoff);
    write_u64(&mut buf, cmd_off + 40, linkedit_data.len() as u64);
    ncmds += 1;
    sizeofcmds += 72;

    write_u32(&mut buf, 16, ncmds);
    write_u32(&mut buf, 20, sizeofcmds);

    buf.extend_from_slice(&linkedit_data);
    buf
}

/// A minimal PE32+ executable: DOS header, COFF header, PE32+ optional
/// header with generous `SizeOfHeaders` slack, and one `.text` section.
pub fn synthetic_pe32_plus() -> Vec<u8> {
    let pe_offset = 64usize;
    let coff_offset = pe_offset + 4;
    let opt_offset = coff_offset + 20;
    let size_of_opt_header = 240u16;
    let section_table = opt_offset + size_of_opt_header as usize;
    let size_of_headers = 1024u32;
    let pointer_to_raw_data = 0x400u32;
    let text_raw_size = 0x200u32;
    let total_len = (pointer_to_raw_data + text_raw_size) as usize;

    let mut buf = vec![0u8; total_len];
    write_u32(&mut buf, 0x3c, pe_offset as u32);
    buf[pe_offset..pe_offset + 4].copy_from_slice(b"PE\0\0");

    write_u16(&mut buf, coff_offset, 0x8664); // Machine = AMD64
    write_u16(&mut buf, coff_offset + 2, 1); // NumberOfSections
    write_u16(&mut buf, coff_offset + 16, size_of_opt_header);

    write_u16(&mut buf, opt_offset, 0x20b); // PE32+ magic
    write_u32(&mut buf, opt_offset + 32, 0x1000); // SectionAlignment
    write_u32(&mut buf, opt_offset + 36, 0x200); // FileAlignment
    write_u32(&mut buf, opt_offset + 56, 0x2000); // SizeOfImage
    write_u32(&mut buf, opt_offset + 60, size_of_headers); // SizeOfHeaders

    let text_entry = section_table;
    buf[text_entry..text_entry + 5].copy_from_slice(b".text");
    write_u32(&mut buf, text_entry + 8, 0x10);
    write_u32(&mut buf, text_entry + 12, 0x1000);
    write_u32(&mut buf, text_entry + 16, text_raw_size);
    write_u32(&mut buf, text_entry + 20, pointer_to_raw_data);

    buf
}
