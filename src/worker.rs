//! The supervised poll loop that drains the queue (spec §4.4).

use crate::queue::QueueService;
use crate::runner::{CommandRunner, RunOutcome};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

pub const POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const EXECUTION_TIMEOUT: Duration = Duration::from_secs(300);

/// Shared cooperative-shutdown flag. A signal handler flips `stop` and
/// notifies `wake` so a worker blocked in the poll sleep returns
/// immediately instead of waiting out the rest of `POLL_INTERVAL` (spec §9,
/// "a condition-variable or self-pipe pattern is required").
#[derive(Clone)]
pub struct StopSignal {
    stop: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self {
            stop: Arc::new(AtomicBool::new(false)),
            wake: Arc::new(Notify::new()),
        }
    }

    pub fn is_stopping(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    pub fn trigger(&self) {
        self.stop.store(true, Ordering::SeqCst);
        self.wake.notify_waiters();
    }

    /// Sleep for `duration`, waking early if `trigger` is called meanwhile.
    async fn interruptible_sleep(&self, duration: Duration) {
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = self.wake.notified() => {}
        }
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// A single worker process's poll loop (spec §4.4, "Main loop").
pub struct Worker {
    queue: Arc<QueueService>,
    runner: Arc<dyn CommandRunner>,
    stop: StopSignal,
    poll_interval: Duration,
    execution_timeout: Duration,
}

impl Worker {
    pub fn new(queue: Arc<QueueService>, runner: Arc<dyn CommandRunner>, stop: StopSignal) -> Self {
        Self {
            queue,
            runner,
            stop,
            poll_interval: POLL_INTERVAL,
            execution_timeout: EXECUTION_TIMEOUT,
        }
    }

    #[cfg(test)]
    pub fn with_intervals(mut self, poll_interval: Duration, execution_timeout: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.execution_timeout = execution_timeout;
        self
    }

    /// Run the recovery sweep, then the poll loop, until `stop` is
    /// triggered. In-flight attempts are finished, never aborted (spec
    /// §4.4 step 3).
    pub async fn run(&self) -> crate::error::Result<()> {
        let recovered = self.queue.recover_crashed()?;
        if !recovered.is_empty() {
            info!(count = recovered.len(), "recovered crashed jobs on startup");
        }

        while !self.stop.is_stopping() {
            match self.queue.claim_next()? {
                None => {
                    self.stop.interruptible_sleep(self.poll_interval).await;
                }
                Some(claim) => {
                    let command = claim.job.command.clone();
                    let job_id = claim.job.id.clone();
                    debug!(job_id = %job_id, command = %command, "executing claimed job");

                    let outcome = self.runner.run(&command, self.execution_timeout).await;
                    match outcome {
                        RunOutcome::Success => {
                            self.queue.mark_succeeded(claim)?;
                        }
                        RunOutcome::Failed(error_text) => {
                            warn!(job_id = %job_id, error = %error_text, "job attempt failed");
                            self.queue.mark_failed(claim, error_text)?;
                        }
                        RunOutcome::Timeout => {
                            warn!(job_id = %job_id, "job attempt timed out");
                            self.queue.mark_failed(claim, "timeout".to_string())?;
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

/// Install SIGINT/SIGTERM handlers that trigger cooperative shutdown.
/// Grounded in `cook/signal_handler.rs`'s use of `signal_hook::iterator`,
/// but unlike that handler (which calls `std::process::exit` directly),
/// this one only flips the shared `StopSignal` so the poll loop can finish
/// its in-flight attempt before exiting.
pub fn install_signal_handlers(stop: StopSignal) -> anyhow::Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    std::thread::spawn(move || {
        for sig in signals.forever() {
            info!(signal = sig, "received shutdown signal");
            stop.trigger();
        }
    });
    Ok(())
}
