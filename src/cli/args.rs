//! CLI argument structures, laid out the way `prodigy::cli::args` shapes
//! `Cli`/`Commands`/nested `Subcommand` enums.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// A single-host background job queue: enqueue shell commands, run workers
/// that execute them with retry/backoff, and manage the dead letter queue.
#[derive(Parser)]
#[command(name = "queuectl")]
#[command(about = "queuectl - a single-host background job queue", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Root directory for queue state (defaults to ./.queuectl or $QUEUECTL_ROOT)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Submit a job described by a JSON object
    Enqueue {
        /// `{"id": "...", "command": "...", "max_retries": 3}`
        json: String,
    },

    /// Start one or more worker processes and supervise until signaled
    Worker {
        #[command(subcommand)]
        command: WorkerCommands,
    },

    /// Print queue statistics
    Status,

    /// List jobs in the active set
    List {
        /// Filter by state: pending, processing, completed, failed, dead
        #[arg(long)]
        state: Option<String>,

        /// Limit the number of jobs printed
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Inspect the Dead Letter Queue
    Dlq {
        #[command(subcommand)]
        command: DlqCommands,
    },

    /// Inspect or update the queue configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum WorkerCommands {
    /// Spawn `--count` worker processes and supervise them until signaled
    Start {
        #[arg(long, default_value = "1")]
        count: u32,
    },
}

#[derive(Subcommand)]
pub enum DlqCommands {
    /// List items in the Dead Letter Queue
    List {
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Re-admit an item from the DLQ back into the active set
    Retry {
        id: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the current configuration
    Show,

    /// Set a single configuration key
    Set {
        /// One of: max-retries, backoff-base, backoff-max-delay
        key: String,
        value: String,
    },
}
