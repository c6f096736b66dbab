//! Logging initialization, mirroring `prodigy::app::logging::init_logging`.

use super::AppConfig;

/// Initialize `tracing` for the application. Safe to call more than once
/// per process in tests; subsequent calls are no-ops.
pub fn init_logging(config: &AppConfig) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_level())),
        )
        .with_target(config.verbose >= 2)
        .try_init();
}
