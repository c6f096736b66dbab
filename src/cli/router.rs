//! Command routing, mirroring `prodigy::cli::router::execute_command`: one
//! match over `Commands` delegating to `cli::commands`.

use crate::app::AppConfig;
use crate::cli::args::Commands;
use crate::cli::commands::*;
use anyhow::Result;

pub async fn execute_command(app: &AppConfig, command: Commands) -> Result<()> {
    match command {
        Commands::Enqueue { json } => run_enqueue_command(app, json),
        Commands::Worker { command } => run_worker_command(app, command).await,
        Commands::Status => run_status_command(app),
        Commands::List { state, limit } => run_list_command(app, state, limit),
        Commands::Dlq { command } => run_dlq_command(app, command),
        Commands::Config { command } => run_config_command(app, command),
    }
}
