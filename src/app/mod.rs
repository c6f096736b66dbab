//! Application-level ambient concerns: process configuration and logging
//! setup. Modeled on the teacher's `app::config`/`app::logging` split.

pub mod config;
pub mod logging;

pub use config::AppConfig;
pub use logging::init_logging;
