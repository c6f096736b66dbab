//! Process-wide, non-queue configuration: verbosity and the `ROOT`
//! directory override. Not persisted — distinct from [`crate::model::Config`],
//! which is the durable queue configuration record.

use std::path::PathBuf;

const DEFAULT_ROOT: &str = ".queuectl";
const ROOT_ENV_VAR: &str = "QUEUECTL_ROOT";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub verbose: u8,
    pub root: PathBuf,
}

impl AppConfig {
    /// Resolve `ROOT` from an explicit CLI flag, falling back to the
    /// `QUEUECTL_ROOT` environment variable, falling back to `./.queuectl`
    /// (spec §6, "Root directory").
    pub fn new(verbose: u8, root_flag: Option<PathBuf>) -> Self {
        let root = root_flag
            .or_else(|| std::env::var_os(ROOT_ENV_VAR).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT));

        Self { verbose, root }
    }

    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new(0, None)
    }
}
