//! Synthetic stub binaries shared across the integration suite: minimal but
//! structurally valid ELF64/Mach-O64/PE32+ files, built the same way each
//! rewriter's own unit tests build its fixture (`src/core/rewrite/*.rs`),
//! just exposed here for tests that exercise the rewriters from outside the
//! crate.

pub mod fixtures;
