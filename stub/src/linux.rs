use std::ffi::CString;
use std::path::Path;

use nix::unistd::execv;

use crate::common::log;

/// Replaces this process with the extracted binary at `path`, passing
/// through this process's own argv/envp. Never returns on success.
pub fn run(path: &Path, args: &[String]) -> ! {
    let path_c = CString::new(path.to_string_lossy().as_bytes()).expect("extracted path has no interior NUL");
    let mut argv: Vec<CString> = Vec::with_capacity(args.len() + 1);
    argv.push(path_c.clone());
    argv.extend(args.iter().map(|a| CString::new(a.as_bytes()).expect("arg has no interior NUL")));

    let _ = execv(&path_c, &argv);
    log("execv failed, giving up");
    std::process::exit(1);
}
