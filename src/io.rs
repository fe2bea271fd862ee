//! Atomic file I/O and directory scaffolding (`spec.md` §4.9).
//!
//! Every write of an output binary goes through [`atomic_write`], and every
//! stub the [`crate::core::stub`] registry hands out is materialized through
//! [`write_temp_file`]/[`cleanup_temp_file`]. Consolidating these here means
//! every rewriter shares one durability primitive instead of re-deriving
//! "create, write, fsync, unlink-on-error" three times (once per format), the
//! way weaver scatters `fs::create_dir_all` / `set_mode` / `TempDir` calls
//! across `core/merger/{mod,linux}.rs`.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{BinpressError, Result};

/// `mkdir -p`, idempotent.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| BinpressError::io(parent, e))?;
        }
    }
    Ok(())
}

/// Writes `bytes` to `path` atomically in effect: create/truncate, write with
/// an EINTR-safe loop (handled internally by `Write::write_all`), fsync, and
/// unlink the partial file on any failure before propagating the error.
pub fn atomic_write(path: &Path, bytes: &[u8], mode: Option<u32>) -> Result<()> {
    ensure_parent_dir(path)?;

    let write_result = (|| -> Result<()> {
        let mut file = File::create(path).map_err(|e| BinpressError::io(path, e))?;
        file.write_all(bytes).map_err(|e| BinpressError::io(path, e))?;
        file.sync_all().map_err(|e| BinpressError::io(path, e))?;
        #[cfg(unix)]
        if let Some(mode) = mode {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(mode);
            fs::set_permissions(path, perms).map_err(|e| BinpressError::io(path, e))?;
        }
        #[cfg(not(unix))]
        let _ = mode;
        Ok(())
    })();

    if write_result.is_err() {
        let _ = fs::remove_file(path);
    }
    write_result
}

/// Sets the executable bit (unix) or is a no-op (other platforms, where every
/// file with a recognized extension is already "executable").
pub fn set_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(path).map_err(|e| BinpressError::io(path, e))?.permissions();
        perms.set_mode(0o755);
        fs::set_permissions(path, perms).map_err(|e| BinpressError::io(path, e))?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}

/// Opens `path` read-only and calls `fsync` on it, then `stat`s it to make
/// sure it exists and is non-empty. This is the post-write VERIFY stage
/// `spec.md` §4.6/§4.7 asks every rewriter to perform.
pub fn fsync_and_verify(path: &Path) -> Result<()> {
    let file = File::open(path).map_err(|e| BinpressError::io(path, e))?;
    file.sync_all().map_err(|e| BinpressError::io(path, e))?;
    let meta = fs::metadata(path).map_err(|e| BinpressError::io(path, e))?;
    if meta.len() == 0 {
        return Err(BinpressError::VerifyError {
            path: path.to_path_buf(),
            reason: "output file is zero-sized".to_string(),
        });
    }
    Ok(())
}

/// Writes `bytes` to a uniquely named file under `temp_dir`, named
/// `binpress_stub_XXXXXX` per `spec.md` §6.4, sets it executable, and sets
/// close-on-exec on unix. Returns the path; the caller owns cleanup via
/// [`cleanup_temp_file`].
pub fn write_temp_stub(temp_dir: &Path, bytes: &[u8]) -> Result<PathBuf> {
    fs::create_dir_all(temp_dir).map_err(|e| BinpressError::io(temp_dir, e))?;

    let named = tempfile::Builder::new()
        .prefix("binpress_stub_")
        .tempfile_in(temp_dir)
        .map_err(|e| BinpressError::io(temp_dir, e))?;

    let path = named.path().to_path_buf();
    // Persist past the NamedTempFile guard: ownership of cleanup moves to the
    // caller (cleanup_temp_stub), matching `spec.md`'s explicit
    // write/cleanup pair rather than RAII-on-drop.
    let (mut file, path) = named
        .keep()
        .map(|(f, p)| (f, p))
        .map_err(|e| BinpressError::io(&path, e.error))?;

    file.write_all(bytes).map_err(|e| BinpressError::io(&path, e))?;
    file.sync_all().map_err(|e| BinpressError::io(&path, e))?;
    drop(file);

    set_executable(&path)?;
    set_close_on_exec(&path)?;

    Ok(path)
}

/// Unlinks a temp stub. Idempotent: a missing file is not an error.
pub fn cleanup_temp_stub(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(BinpressError::io(path, e)),
    }
}

#[cfg(unix)]
fn set_close_on_exec(path: &Path) -> Result<()> {
    use std::os::unix::io::AsRawFd;
    let file = File::open(path).map_err(|e| BinpressError::io(path, e))?;
    let fd = file.as_raw_fd();
    // SAFETY: `fd` is a valid, open file descriptor owned by `file` for the
    // duration of this call.
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFD);
        if flags >= 0 {
            libc::fcntl(fd, libc::F_SETFD, flags | libc::FD_CLOEXEC);
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn set_close_on_exec(_path: &Path) -> Result<()> {
    Ok(())
}
