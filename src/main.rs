//! queuectl: a single-host background job queue.
//!
//! A thin composition layer: parse arguments, resolve configuration,
//! initialize logging, route to a command handler.

use clap::Parser;
use queuectl::app::{init_logging, AppConfig};
use queuectl::cli::{execute_command, Cli};
use tracing::error;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let app_config = AppConfig::new(cli.verbose, cli.root);
    init_logging(&app_config);

    if let Err(e) = execute_command(&app_config, cli.command).await {
        error!("{e:#}");
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
