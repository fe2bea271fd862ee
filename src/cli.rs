//! Command-line surface (`spec.md` §6.2), built with `clap`'s derive API the
//! way weaver's sibling binaries in this pack do, rather than hand-rolled
//! `std::env::args()` parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::config::Config;
use crate::core::binary::target::{Arch, Libc, Platform};
use crate::core::compress::Algorithm;
use crate::core::embed;
use crate::core::stub::StubSelection;
use crate::error::{BinpressError, Result};

fn parse_platform(s: &str) -> std::result::Result<Platform, String> {
    Platform::parse(s).ok_or_else(|| format!("unknown platform '{s}'"))
}

fn parse_arch(s: &str) -> std::result::Result<Arch, String> {
    Arch::parse(s).ok_or_else(|| format!("unknown arch '{s}'"))
}

fn parse_libc(s: &str) -> std::result::Result<Libc, String> {
    Libc::parse(s).ok_or_else(|| format!("unknown libc '{s}'"))
}

#[derive(Parser, Debug)]
#[command(name = "binpress", version, about = "Compress a binary and embed it in a self-extracting stub")]
pub struct Cli {
    /// Input binary to press, or (with `--update` alone) the new payload for
    /// an existing self-extracting binary.
    pub input: PathBuf,

    /// Write a self-extracting executable here.
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Write a stub-less framed payload blob here.
    #[arg(short = 'd', long, value_name = "PATH")]
    pub data_only: Option<PathBuf>,

    /// Re-press an existing self-extracting binary at PATH in place, or
    /// (combined with `--output`) write the result to `--output` instead.
    #[arg(short = 'u', long, value_name = "PATH")]
    pub update: Option<PathBuf>,

    /// Combined `platform-arch[-libc]` target, e.g. `linux-x64-musl`.
    #[arg(long)]
    pub target: Option<String>,

    #[arg(long = "target-platform", value_parser = parse_platform)]
    pub platform: Option<Platform>,

    #[arg(long = "target-arch", value_parser = parse_arch)]
    pub arch: Option<Arch>,

    #[arg(long = "target-libc", value_parser = parse_libc)]
    pub libc: Option<Libc>,

    #[arg(long, value_enum, default_value = "lzfse")]
    pub algorithm: AlgorithmArg,

    #[command(flatten)]
    pub verbosity: clap_verbosity_flag::Verbosity,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum AlgorithmArg {
    Lzfse,
    Lzma,
    #[cfg(feature = "windows")]
    Xpress,
    #[cfg(feature = "windows")]
    Lzms,
}

impl From<AlgorithmArg> for Algorithm {
    fn from(a: AlgorithmArg) -> Self {
        match a {
            AlgorithmArg::Lzfse => Algorithm::Lzfse,
            AlgorithmArg::Lzma => Algorithm::Lzma,
            #[cfg(feature = "windows")]
            AlgorithmArg::Xpress => Algorithm::Xpress,
            #[cfg(feature = "windows")]
            AlgorithmArg::Lzms => Algorithm::Lzms,
        }
    }
}

impl Cli {
    fn selection(&self) -> StubSelection {
        StubSelection {
            target: self.target.clone(),
            platform: self.platform,
            arch: self.arch,
            libc: self.libc,
        }
    }

    /// Runs the mode implied by `-o`/`-d`/`-u`. `spec.md` §6.2: at least one
    /// of the three must be given.
    pub fn run(&self) -> Result<()> {
        let config = Config::from_env();
        let algorithm: Algorithm = self.algorithm.into();

        match (&self.output, &self.data_only, &self.update) {
            (None, None, None) => Err(BinpressError::ArgError(
                "one of --output, --data-only, or --update is required".to_string(),
            )),
            (output, None, Some(update_path)) => {
                let destination = output.as_ref().unwrap_or(update_path);
                embed::update_in_place(update_path, &self.input, destination, algorithm, &config)
            }
            (Some(output), None, None) => {
                embed::press_self_extracting(&self.input, output, &self.selection(), algorithm, &config)
            }
            (None, Some(data_path), None) => {
                embed::press_data_only(&self.input, data_path, &self.selection(), algorithm, &config)
            }
            _ => Err(BinpressError::ArgError(
                "--data-only cannot be combined with --output or --update".to_string(),
            )),
        }
    }
}
