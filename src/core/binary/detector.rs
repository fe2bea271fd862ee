//! Binary-format detector (`spec.md` §4.1). Grounded on weaver's
//! `core/binary/detector/{arch,os}.rs` (goblin-based classification) and
//! `models/binary.rs::Platform::detect` (manual magic-byte sniffing), merged
//! into one pass: magic bytes decide the format, then `goblin` is used to
//! pull the fields `spec.md` names (`e_machine`, `cputype`, COFF `Machine`)
//! instead of hand-rolled offset arithmetic.

use goblin::Object;

use crate::core::binary::target::{Arch, Libc, Platform};
use crate::error::BinpressError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryFormat {
    Elf64,
    MachO64,
    MachOFat,
    Pe32Plus,
}

#[derive(Debug, Clone, Copy)]
pub struct DetectedBinary {
    pub format: BinaryFormat,
    pub platform: Platform,
    pub arch: Arch,
    /// `None` unless `format` is `Elf64` and a `PT_INTERP` exists.
    pub libc: Option<Libc>,
}

// Mach-O magic constants (`spec.md` §4.1), as the raw bytes appear on disk.
const MH_MAGIC_64: u32 = 0xfeed_facf;
const MH_CIGAM_64: u32 = 0xcffa_edfe;
const MH_MAGIC_32: u32 = 0xfeed_face;
const MH_CIGAM_32: u32 = 0xcefa_edfe;
const FAT_MAGIC: u32 = 0xcafe_babe;
const FAT_CIGAM: u32 = 0xbeba_feca;

const CPU_ARCH_ABI64: u32 = 0x0100_0000;
const CPU_TYPE_X86_64: u32 = 0x0100_0007;
const CPU_TYPE_ARM64: u32 = 0x0100_000c;

pub fn detect(data: &[u8]) -> Result<DetectedBinary, BinpressError> {
    if data.len() < 4 {
        return Err(BinpressError::InputError("file too small to contain a format magic".into()));
    }

    if data.starts_with(b"\x7fELF") {
        return detect_elf(data);
    }
    if data.starts_with(b"MZ") {
        return detect_pe(data);
    }

    let magic_be = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);

    if magic_be == MH_MAGIC_64 || magic_be == MH_CIGAM_64 {
        return detect_macho_single(data);
    }
    // 32-bit Mach-O: reject explicitly per `spec.md` Non-goals.
    if magic_be == MH_MAGIC_32 || magic_be == MH_CIGAM_32 {
        return Err(BinpressError::InputError("32-bit Mach-O is not supported".into()));
    }
    if magic_be == FAT_MAGIC || magic_be == FAT_CIGAM {
        return detect_macho_fat(data);
    }

    Err(BinpressError::InputError("unrecognized binary format".into()))
}

fn detect_elf(data: &[u8]) -> Result<DetectedBinary, BinpressError> {
    if data.len() < 19 || data[4] != 2 {
        // EI_CLASS != ELFCLASS64
        return Err(BinpressError::InputError("32-bit ELF is not supported".into()));
    }
    let elf = match Object::parse(data) {
        Ok(Object::Elf(elf)) => elf,
        _ => return Err(BinpressError::InputError("malformed ELF64 file".into())),
    };

    use goblin::elf::header::{EM_AARCH64, EM_X86_64};
    let arch = match elf.header.e_machine {
        EM_X86_64 => Arch::X64,
        EM_AARCH64 => Arch::Arm64,
        other => {
            return Err(BinpressError::InputError(format!("unsupported ELF machine type {other}")));
        }
    };

    let libc = elf.interpreter.map(|interp| {
        if interp.contains("musl") {
            Libc::Musl
        } else {
            Libc::Glibc
        }
    });

    Ok(DetectedBinary { format: BinaryFormat::Elf64, platform: Platform::Linux, arch, libc })
}

fn detect_macho_single(data: &[u8]) -> Result<DetectedBinary, BinpressError> {
    if data.len() < 8 {
        return Err(BinpressError::InputError("truncated Mach-O header".into()));
    }
    let macho = match Object::parse(data) {
        Ok(Object::Mach(goblin::mach::Mach::Binary(macho))) => macho,
        _ => return Err(BinpressError::InputError("malformed Mach-O file".into())),
    };
    let cputype = macho.header.cputype();
    if cputype & CPU_ARCH_ABI64 == 0 {
        return Err(BinpressError::InputError("32-bit Mach-O is not supported".into()));
    }
    let arch = match cputype {
        CPU_TYPE_X86_64 => Arch::X64,
        CPU_TYPE_ARM64 => Arch::Arm64,
        other => {
            return Err(BinpressError::InputError(format!("unsupported Mach-O cputype {other:#x}")));
        }
    };

    Ok(DetectedBinary { format: BinaryFormat::MachO64, platform: Platform::Darwin, arch, libc: None })
}

fn detect_macho_fat(data: &[u8]) -> Result<DetectedBinary, BinpressError> {
    match Object::parse(data) {
        Ok(Object::Mach(goblin::mach::Mach::Fat(fat))) => {
            let arches = fat
                .arches()
                .map_err(|e| BinpressError::InputError(format!("malformed fat Mach-O: {e}")))?;
            // `spec.md` Non-goals: "fat/universal binaries use the first
            // architecture slice."
            let first = arches
                .first()
                .ok_or_else(|| BinpressError::InputError("fat Mach-O with zero architectures".into()))?;
            let arch = match first.cputype {
                CPU_TYPE_X86_64 => Arch::X64,
                CPU_TYPE_ARM64 => Arch::Arm64,
                other => {
                    return Err(BinpressError::InputError(format!(
                        "unsupported Mach-O cputype {other:#x} in fat binary's first slice"
                    )));
                }
            };
            Ok(DetectedBinary { format: BinaryFormat::MachOFat, platform: Platform::Darwin, arch, libc: None })
        }
        _ => Err(BinpressError::InputError("malformed fat Mach-O file".into())),
    }
}

fn detect_pe(data: &[u8]) -> Result<DetectedBinary, BinpressError> {
    let pe = match Object::parse(data) {
        Ok(Object::PE(pe)) => pe,
        _ => return Err(BinpressError::InputError("malformed PE file".into())),
    };

    use goblin::pe::header::{COFF_MACHINE_ARM64, COFF_MACHINE_X86_64};
    let arch = match pe.header.coff_header.machine {
        COFF_MACHINE_X86_64 => Arch::X64,
        COFF_MACHINE_ARM64 => Arch::Arm64,
        other => {
            return Err(BinpressError::InputError(format!("unsupported PE machine type {other:#x}")));
        }
    };

    if !pe.is_64 {
        return Err(BinpressError::InputError("32-bit PE is not supported".into()));
    }

    Ok(DetectedBinary { format: BinaryFormat::Pe32Plus, platform: Platform::Win32, arch, libc: None })
}
