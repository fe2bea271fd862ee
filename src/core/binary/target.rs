//! Target descriptor (`spec.md` §3.1): `(platform, arch, libc)`, parsed from a
//! combined `--target` string, individual flags, or auto-detected from the
//! input binary.

use std::fmt;

use crate::error::BinpressError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Linux,
    Darwin,
    Win32,
}

impl Platform {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "linux" => Some(Platform::Linux),
            "darwin" | "macos" => Some(Platform::Darwin),
            // `spec.md` §4.2: normalize "win" -> "win32".
            "win32" | "win" | "windows" => Some(Platform::Win32),
            _ => None,
        }
    }

    /// Payload-header byte encoding (`spec.md` §3.1 offset 64).
    pub fn to_byte(self) -> u8 {
        match self {
            Platform::Linux => 0,
            Platform::Darwin => 1,
            Platform::Win32 => 2,
        }
    }

    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(Platform::Linux),
            1 => Some(Platform::Darwin),
            2 => Some(Platform::Win32),
            _ => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Platform::Linux => "linux",
            Platform::Darwin => "darwin",
            Platform::Win32 => "win32",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    X64,
    Arm64,
}

impl Arch {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "x64" | "x86_64" | "amd64" => Some(Arch::X64),
            "arm64" | "aarch64" => Some(Arch::Arm64),
            _ => None,
        }
    }

    /// Payload-header byte encoding (`spec.md` §3.1 offset 65).
    pub fn to_byte(self) -> u8 {
        match self {
            Arch::X64 => 0,
            Arch::Arm64 => 1,
        }
    }

    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(Arch::X64),
            1 => Some(Arch::Arm64),
            _ => None,
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Arch::X64 => "x64",
            Arch::Arm64 => "arm64",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Libc {
    Glibc,
    Musl,
    /// Not applicable (non-Linux platforms).
    None,
}

impl Libc {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "glibc" => Some(Libc::Glibc),
            "musl" => Some(Libc::Musl),
            _ => None,
        }
    }

    /// Payload-header byte encoding (`spec.md` §3.1 offset 66): 0=glibc,
    /// 1=musl, 255=n/a.
    pub fn to_byte(self) -> u8 {
        match self {
            Libc::Glibc => 0,
            Libc::Musl => 1,
            Libc::None => 255,
        }
    }

    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(Libc::Glibc),
            1 => Some(Libc::Musl),
            255 => Some(Libc::None),
            _ => None,
        }
    }
}

impl fmt::Display for Libc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Libc::Glibc => "glibc",
            Libc::Musl => "musl",
            Libc::None => "none",
        };
        f.write_str(s)
    }
}

/// A fully or partially resolved `(platform, arch, libc)` tuple. `None` fields
/// are filled in later by explicit flags or auto-detection (`spec.md` §4.2).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Target {
    pub platform: Option<Platform>,
    pub arch: Option<Arch>,
    pub libc: Option<Libc>,
}

impl Target {
    /// Parses a combined `platform-arch[-libc]` string, e.g. `linux-x64-musl`
    /// or `darwin-arm64`.
    pub fn parse_combined(s: &str) -> Result<Self, BinpressError> {
        let parts: Vec<&str> = s.split('-').collect();
        let (platform_s, arch_s, libc_s) = match parts.as_slice() {
            [p, a] => (*p, *a, None),
            [p, a, l] => (*p, *a, Some(*l)),
            // `win32-x64` itself splits into 3 parts ("win32", "x64") is fine,
            // but a platform name containing a hyphen (none of ours do) would
            // not be; handle the 2-token win/darwin/linux case above and bail
            // otherwise.
            _ => {
                return Err(BinpressError::ArgError(format!(
                    "invalid --target '{s}', expected platform-arch[-libc]"
                )));
            }
        };

        let platform = Platform::parse(platform_s)
            .ok_or_else(|| BinpressError::ArgError(format!("unknown target platform '{platform_s}'")))?;
        let arch = Arch::parse(arch_s)
            .ok_or_else(|| BinpressError::ArgError(format!("unknown target arch '{arch_s}'")))?;
        let libc = match libc_s {
            Some(l) => Some(
                Libc::parse(l)
                    .ok_or_else(|| BinpressError::ArgError(format!("unknown target libc '{l}'")))?,
            ),
            // A missing libc defaults to auto-detect for linux, `none` otherwise
            // (`spec.md` §4.2 step 1); `none` is resolved here for non-Linux,
            // Linux is left `None` so auto-detection fills it in later.
            None if platform == Platform::Linux => None,
            None => Some(Libc::None),
        };

        Ok(Target { platform: Some(platform), arch: Some(arch), libc })
    }

    pub fn is_resolved(&self) -> bool {
        self.platform.is_some() && self.arch.is_some() && self.libc.is_some()
    }
}
