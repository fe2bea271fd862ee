pub mod detector;
pub mod target;

pub use detector::{BinaryFormat, DetectedBinary};
pub use target::{Arch, Libc, Platform, Target};
