//! Error taxonomy shared by every component of the embedder.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BinpressError>;

/// The stage of a format-specific rewrite that failed, for `RewriteError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteStage {
    Parse,
    CheckExisting,
    Mutate,
    Write,
    Fsync,
    Verify,
    Sign,
}

impl std::fmt::Display for RewriteStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RewriteStage::Parse => "parse",
            RewriteStage::CheckExisting => "check-existing",
            RewriteStage::Mutate => "mutate",
            RewriteStage::Write => "write",
            RewriteStage::Fsync => "fsync",
            RewriteStage::Verify => "verify",
            RewriteStage::Sign => "sign",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum BinpressError {
    #[error("argument error: {0}")]
    ArgError(String),

    #[error("input error: {0}")]
    InputError(String),

    #[error("no stub available for target {platform}-{arch}{libc_suffix}")]
    StubUnavailable {
        platform: String,
        arch: String,
        libc_suffix: String,
    },

    #[error("compression error ({kind}): {underlying}")]
    CompressError { kind: &'static str, underlying: String },

    #[error("rewrite error ({format}, stage={stage}): {message}")]
    RewriteError {
        format: &'static str,
        stage: RewriteStage,
        message: String,
    },

    #[error("I/O error on {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("refusing to write under SIP-protected path: {0}")]
    SipProtected(PathBuf),

    #[error("verification failed for {path}: {reason}")]
    VerifyError { path: PathBuf, reason: String },
}

impl BinpressError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BinpressError::IoError { path: path.into(), source }
    }

    pub fn rewrite(format: &'static str, stage: RewriteStage, message: impl Into<String>) -> Self {
        BinpressError::RewriteError { format, stage, message: message.into() }
    }

    /// Process exit code for this error, per the CLI contract (`spec.md` §6.2): always 1.
    pub fn exit_code(&self) -> i32 {
        1
    }
}
