//! The central data model: `Job`, `JobState`, and `Config`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The state a job occupies in the state machine (spec §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Processing,
    Completed,
    /// Never persisted; see `JobFilter::Failed` for the filter-only alias
    /// this spec keeps for backward compatibility with the documented CLI
    /// surface (`--state failed`).
    Failed,
    Dead,
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobState::Pending => "pending",
            JobState::Processing => "processing",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Dead => "dead",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for JobState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobState::Pending),
            "processing" => Ok(JobState::Processing),
            "completed" => Ok(JobState::Completed),
            "failed" => Ok(JobState::Failed),
            "dead" => Ok(JobState::Dead),
            other => Err(format!("unknown job state: {other}")),
        }
    }
}

/// A job tracked by the queue. See spec §3 for the field-by-field contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub command: String,
    pub state: JobState,
    pub attempts: u32,
    pub max_retries: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_retry_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Why a job was retired to the DLQ. Always `"max_retries_exhausted"`
    /// today; kept as an `Option<String>` since nothing else in this spec
    /// produces a dead job yet (no operator-forced retirement command).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dlq_reason: Option<String>,
}

impl Job {
    /// Whether `attempts <= max_retries + 1` (invariant I3) still holds.
    /// Checked via `debug_assert!` at `Store::update` and
    /// `QueueService::mark_failed`, the two places a job's `attempts` count
    /// can grow.
    pub fn within_attempt_budget(&self) -> bool {
        self.attempts <= self.max_retries + 1
    }
}

/// The queue-wide configuration record (spec §3, "Config").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub max_retries: u32,
    pub backoff_base: f64,
    pub backoff_max_delay: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: 2.0,
            backoff_max_delay: 3600,
        }
    }
}

impl Config {
    /// Validate field constraints from spec §3 ("Config" table).
    pub fn validate(&self) -> Result<(), String> {
        if self.backoff_base <= 1.0 {
            return Err("backoff_base must be > 1.0".to_string());
        }
        if self.backoff_max_delay < 1 {
            return Err("backoff_max_delay must be >= 1".to_string());
        }
        Ok(())
    }
}

/// Caller-supplied specification for `QueueService::enqueue`.
#[derive(Debug, Clone, Deserialize)]
pub struct JobSpec {
    pub id: String,
    pub command: String,
    pub max_retries: Option<u32>,
}
