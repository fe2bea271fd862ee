//! `Target::parse_combined` and the per-field `parse`/`to_byte`/`from_byte`
//! round trips, exercised from outside the crate the way a caller building a
//! `--target` string would hit them.

use binpress::core::binary::target::{Arch, Libc, Platform, Target};

#[test]
fn parses_two_part_target_leaving_libc_unresolved_on_linux() {
    let target = Target::parse_combined("linux-x64").unwrap();
    assert_eq!(target.platform, Some(Platform::Linux));
    assert_eq!(target.arch, Some(Arch::X64));
    assert_eq!(target.libc, None);
    assert!(!target.is_resolved());
}

#[test]
fn parses_two_part_target_defaulting_libc_to_none_off_linux() {
    let target = Target::parse_combined("darwin-arm64").unwrap();
    assert_eq!(target.platform, Some(Platform::Darwin));
    assert_eq!(target.arch, Some(Arch::Arm64));
    assert_eq!(target.libc, Some(Libc::None));
    assert!(target.is_resolved());
}

#[test]
fn parses_three_part_target_with_explicit_libc() {
    let target = Target::parse_combined("linux-arm64-musl").unwrap();
    assert_eq!(target.platform, Some(Platform::Linux));
    assert_eq!(target.arch, Some(Arch::Arm64));
    assert_eq!(target.libc, Some(Libc::Musl));
    assert!(target.is_resolved());
}

#[test]
fn normalizes_win_aliases() {
    for alias in ["win32", "win", "windows"] {
        let target = Target::parse_combined(&format!("{alias}-x64")).unwrap();
        assert_eq!(target.platform, Some(Platform::Win32));
    }
}

#[test]
fn rejects_unknown_platform_arch_or_libc() {
    assert!(Target::parse_combined("plan9-x64").is_err());
    assert!(Target::parse_combined("linux-riscv64").is_err());
    assert!(Target::parse_combined("linux-x64-bionic").is_err());
}

#[test]
fn rejects_malformed_token_count() {
    assert!(Target::parse_combined("linux").is_err());
    assert!(Target::parse_combined("linux-x64-musl-extra").is_err());
}

#[test]
fn platform_byte_encoding_round_trips() {
    for p in [Platform::Linux, Platform::Darwin, Platform::Win32] {
        assert_eq!(Platform::from_byte(p.to_byte()), Some(p));
    }
    assert_eq!(Platform::from_byte(0xFF), None);
}

#[test]
fn arch_byte_encoding_round_trips() {
    for a in [Arch::X64, Arch::Arm64] {
        assert_eq!(Arch::from_byte(a.to_byte()), Some(a));
    }
    assert_eq!(Arch::from_byte(0xFF), None);
}

#[test]
fn libc_byte_encoding_round_trips_including_sentinel() {
    assert_eq!(Libc::from_byte(Libc::Glibc.to_byte()), Some(Libc::Glibc));
    assert_eq!(Libc::from_byte(Libc::Musl.to_byte()), Some(Libc::Musl));
    assert_eq!(Libc::from_byte(Libc::None.to_byte()), Some(Libc::None));
    assert_eq!(Libc::None.to_byte(), 0xFF);
}
