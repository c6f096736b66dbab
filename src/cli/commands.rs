//! Per-command handlers. Each function owns one `Commands` variant's
//! implementation, constructing the `QueueService`/`Worker` it needs from
//! the resolved [`AppConfig`]. Mirrors `prodigy::cli::commands`'s one
//! function per subcommand layout.

use crate::app::AppConfig;
use crate::cli::args::{ConfigCommands, DlqCommands, WorkerCommands};
use crate::cli::render;
use crate::clock::SystemClock;
use crate::model::{JobSpec, JobState};
use crate::queue::{JobFilter, ListFilter, QueueService};
use crate::runner::ShellCommandRunner;
use crate::store::Store;
use crate::worker::{install_signal_handlers, StopSignal, Worker};
use anyhow::{bail, Context, Result};
use std::sync::Arc;

fn open_queue(app: &AppConfig) -> QueueService {
    let store = Store::new(app.root.clone());
    QueueService::new(store, Arc::new(SystemClock))
}

pub fn run_enqueue_command(app: &AppConfig, json: String) -> Result<()> {
    let spec: JobSpec =
        serde_json::from_str(&json).context("job spec must be a valid JSON object")?;
    let queue = open_queue(app);
    let job = queue.enqueue(spec)?;
    println!("enqueued {} ({})", job.id, job.state);
    Ok(())
}

pub fn run_status_command(app: &AppConfig) -> Result<()> {
    let queue = open_queue(app);
    render::print_stats(&queue.stats()?);
    Ok(())
}

pub fn run_list_command(app: &AppConfig, state: Option<String>, limit: Option<usize>) -> Result<()> {
    let queue = open_queue(app);
    let state_filter = match state {
        None => None,
        Some(s) if s == "failed" => Some(JobFilter::Failed),
        Some(s) => {
            let state: JobState = s
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))
                .context("invalid --state value")?;
            Some(JobFilter::State(state))
        }
    };
    let jobs = queue.list(ListFilter {
        state: state_filter,
        limit,
    })?;
    render::print_jobs(&jobs);
    Ok(())
}

pub fn run_dlq_command(app: &AppConfig, command: DlqCommands) -> Result<()> {
    let queue = open_queue(app);
    match command {
        DlqCommands::List { limit } => {
            render::print_jobs(&queue.dlq_list(limit)?);
        }
        DlqCommands::Retry { id } => {
            let job = queue.dlq_requeue(&id)?;
            println!("requeued {} ({})", job.id, job.state);
        }
    }
    Ok(())
}

pub fn run_config_command(app: &AppConfig, command: ConfigCommands) -> Result<()> {
    let store = Store::new(app.root.clone());
    match command {
        ConfigCommands::Show => {
            let config = store.load_config()?;
            println!("max_retries:       {}", config.max_retries);
            println!("backoff_base:      {}", config.backoff_base);
            println!("backoff_max_delay: {}", config.backoff_max_delay);
        }
        ConfigCommands::Set { key, value } => {
            let mut config = store.load_config()?;
            match key.as_str() {
                "max-retries" => {
                    config.max_retries = value.parse().context("max-retries must be an integer")?;
                }
                "backoff-base" => {
                    config.backoff_base = value.parse().context("backoff-base must be a number")?;
                }
                "backoff-max-delay" => {
                    config.backoff_max_delay =
                        value.parse().context("backoff-max-delay must be an integer")?;
                }
                other => bail!("unknown config key: {other}"),
            }
            config.validate().map_err(|e| anyhow::anyhow!(e))?;
            store.save_config(&config)?;
            println!("updated {key}");
        }
    }
    Ok(())
}

/// Spawn `count` independent worker OS processes (spec §4.4, "Multiple
/// independent worker processes race for jobs") and wait for all of them.
/// Each child re-invokes this same binary as `queuectl worker start
/// --count 1`, so the only thing shared between workers is the filesystem
/// under `--root`, exactly like real-world deployment.
pub async fn run_worker_command(app: &AppConfig, command: WorkerCommands) -> Result<()> {
    match command {
        WorkerCommands::Start { count } if count > 1 => spawn_worker_processes(app, count).await,
        WorkerCommands::Start { .. } => run_single_worker(app).await,
    }
}

async fn spawn_worker_processes(app: &AppConfig, count: u32) -> Result<()> {
    let exe = std::env::current_exe().context("resolving current executable")?;
    let mut children = Vec::new();
    for _ in 0..count {
        let mut cmd = tokio::process::Command::new(&exe);
        cmd.arg("--root").arg(&app.root);
        for _ in 0..app.verbose {
            cmd.arg("-v");
        }
        cmd.args(["worker", "start", "--count", "1"]);
        children.push(cmd.spawn().context("spawning worker process")?);
    }
    for mut child in children {
        child.wait().await.context("waiting on worker process")?;
    }
    Ok(())
}

async fn run_single_worker(app: &AppConfig) -> Result<()> {
    let queue = Arc::new(open_queue(app));
    let runner = Arc::new(ShellCommandRunner);
    let stop = StopSignal::new();
    install_signal_handlers(stop.clone())?;

    let worker = Worker::new(queue, runner, stop);
    worker.run().await.context("worker loop")?;
    Ok(())
}
