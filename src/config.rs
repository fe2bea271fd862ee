use std::env;
use std::path::PathBuf;

/// Build/run-time tunables. Mirrors weaver's `Config::from_env` shape but scoped
/// to what a single-shot embedder process needs (`spec.md` §3.1, §6.3).
#[derive(Debug, Clone)]
pub struct Config {
    /// Ceiling on the input binary size (`MAX_UNCOMPRESSED`, `spec.md` §3.1).
    pub max_uncompressed: u64,
    pub temp_dir: PathBuf,
}

const DEFAULT_MAX_UNCOMPRESSED: u64 = 512 * 1024 * 1024;

impl Config {
    pub fn from_env() -> Self {
        Self {
            max_uncompressed: env::var("BINPRESS_MAX_UNCOMPRESSED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_UNCOMPRESSED),
            temp_dir: env::var("BINPRESS_TEMP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| env::temp_dir()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_uncompressed: DEFAULT_MAX_UNCOMPRESSED,
            temp_dir: env::temp_dir(),
        }
    }
}
