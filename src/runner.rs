//! The external process runner: an opaque "run this command, give me exit
//! status and error text" collaborator (spec §1/§4.4). Grounded in the
//! teacher's `subprocess::runner::{ProcessRunner, TokioProcessRunner}` and
//! `subprocess::mock::MockProcessRunner`, trimmed to the single
//! responsibility this spec names — streaming output, git/Claude-specific
//! runners, and the builder API are out of scope here.

use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

/// Outcome of a single command execution attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    /// Non-zero exit. Carries the human-readable cause used to populate
    /// `error_message` (spec §4.4 step "c").
    Failed(String),
    Timeout,
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command` through a shell, bounded by `timeout`.
    async fn run(&self, command: &str, timeout: Duration) -> RunOutcome;
}

/// Production runner: spawns `sh -c <command>`.
pub struct ShellCommandRunner;

#[async_trait]
impl CommandRunner for ShellCommandRunner {
    async fn run(&self, command: &str, attempt_timeout: Duration) -> RunOutcome {
        let mut child = match Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => return RunOutcome::Failed(format!("spawn failed: {e}")),
        };

        let wait = timeout(attempt_timeout, child.wait_with_output());
        match wait.await {
            Ok(Ok(output)) => {
                if output.status.success() {
                    RunOutcome::Success
                } else {
                    let code = output.status.code().unwrap_or(-1);
                    let stderr_tail = stderr_tail(&output.stderr);
                    let message = if stderr_tail.is_empty() {
                        format!("exit status {code}")
                    } else {
                        format!("exit status {code}: {stderr_tail}")
                    };
                    RunOutcome::Failed(message)
                }
            }
            Ok(Err(e)) => RunOutcome::Failed(format!("runner error: {e}")),
            Err(_) => RunOutcome::Timeout,
        }
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().collect();
    lines
        .iter()
        .rev()
        .take(5)
        .rev()
        .cloned()
        .collect::<Vec<_>>()
        .join("\n")
}

/// Deterministic runner for tests: records which commands were run and
/// returns a scripted outcome keyed by command string, or `Success` if the
/// command wasn't scripted.
#[cfg(any(test, feature = "test-util"))]
pub struct MockCommandRunner {
    outcomes: std::sync::Mutex<std::collections::HashMap<String, Vec<RunOutcome>>>,
}

#[cfg(any(test, feature = "test-util"))]
impl MockCommandRunner {
    pub fn new() -> Self {
        Self {
            outcomes: std::sync::Mutex::new(std::collections::HashMap::new()),
        }
    }

    /// Script the sequence of outcomes returned for `command`, consumed in
    /// order; once exhausted, the runner keeps returning the last one.
    pub fn script(&self, command: &str, outcomes: Vec<RunOutcome>) {
        self.outcomes
            .lock()
            .unwrap()
            .insert(command.to_string(), outcomes);
    }
}

#[cfg(any(test, feature = "test-util"))]
impl Default for MockCommandRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-util"))]
#[async_trait]
impl CommandRunner for MockCommandRunner {
    async fn run(&self, command: &str, _timeout: Duration) -> RunOutcome {
        let mut outcomes = self.outcomes.lock().unwrap();
        match outcomes.get_mut(command) {
            Some(queue) if queue.len() > 1 => queue.remove(0),
            Some(queue) => queue[0].clone(),
            None => RunOutcome::Success,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn shell_runner_reports_success_for_true() {
        let runner = ShellCommandRunner;
        let outcome = runner.run("true", Duration::from_secs(5)).await;
        assert_eq!(outcome, RunOutcome::Success);
    }

    #[tokio::test]
    async fn shell_runner_reports_failure_with_exit_code_for_false() {
        let runner = ShellCommandRunner;
        let outcome = runner.run("false", Duration::from_secs(5)).await;
        match outcome {
            RunOutcome::Failed(msg) => assert!(msg.contains("exit status")),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn shell_runner_reports_timeout_for_long_sleep() {
        let runner = ShellCommandRunner;
        let outcome = runner
            .run("sleep 5", Duration::from_millis(50))
            .await;
        assert_eq!(outcome, RunOutcome::Timeout);
    }

    #[tokio::test]
    async fn mock_runner_replays_scripted_outcomes_in_order() {
        let runner = MockCommandRunner::new();
        runner.script(
            "__fail_then_ok__",
            vec![
                RunOutcome::Failed("first".to_string()),
                RunOutcome::Success,
            ],
        );

        let first = runner.run("__fail_then_ok__", Duration::from_secs(1)).await;
        assert_eq!(first, RunOutcome::Failed("first".to_string()));
        let second = runner.run("__fail_then_ok__", Duration::from_secs(1)).await;
        assert_eq!(second, RunOutcome::Success);
    }
}
