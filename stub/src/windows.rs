use std::path::Path;

use crate::common::log;

/// Windows has no in-place `exec`; spawns the extracted binary, waits for
/// it, and propagates its exit code.
pub fn run(path: &Path, args: &[String]) -> ! {
    let status = std::process::Command::new(path).args(args).status();
    match status {
        Ok(status) => std::process::exit(status.code().unwrap_or(1)),
        Err(e) => {
            log(format!("failed to launch extracted binary: {e}"));
            std::process::exit(1);
        }
    }
}
