use std::ffi::CString;
use std::path::Path;

use nix::unistd::execv;

use crate::common::log;

/// Ad-hoc codesigns `path` (required on Apple Silicon: an unsigned binary is
/// killed before `main` is reached) and replaces this process with it.
///
/// On Apple Silicon (M1/M2/M3), all executable code must be signed before it
/// can run; ad-hoc signing (`--sign -`) doesn't need a developer certificate
/// and is enough to satisfy that check for a locally-extracted binary.
pub fn run(path: &Path, args: &[String]) -> ! {
    let _ = std::process::Command::new("codesign")
        .args(["--sign", "-", "--force", &path.to_string_lossy()])
        .output();

    let path_c = CString::new(path.to_string_lossy().as_bytes()).expect("extracted path has no interior NUL");
    let mut argv: Vec<CString> = Vec::with_capacity(args.len() + 1);
    argv.push(path_c.clone());
    argv.extend(args.iter().map(|a| CString::new(a.as_bytes()).expect("arg has no interior NUL")));

    let _ = execv(&path_c, &argv);
    log("execv failed, giving up");
    std::process::exit(1);
}
