//! Pure, stateless scheduling decisions (spec §4.2).
//!
//! Nothing here touches the filesystem or the clock's wall time directly —
//! `now` always arrives as a parameter so these functions stay trivially
//! testable.

use crate::model::{Config, Job, JobState};
use chrono::{DateTime, Utc};

/// The decision the scheduler makes after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retirement {
    /// `attempts < max_retries`: return to `pending` with a scheduled retry.
    Retry,
    /// `attempts >= max_retries`: move to the DLQ.
    Retire,
}

/// Compute `delay_seconds = min(backoff_base ^ (attempts - 1), backoff_max_delay)`.
///
/// `attempts` must be `>= 1` (the count after the failed attempt that just
/// concluded). The exponent is `attempts - 1` so the very first failure
/// backs off by exactly one base-unit second.
pub fn backoff_delay_seconds(attempts: u32, config: &Config) -> u64 {
    debug_assert!(attempts >= 1);
    let exponent = (attempts - 1) as i32;
    let raw = config.backoff_base.powi(exponent);
    // Saturate rather than overflow for pathologically large attempt counts.
    let capped = if raw.is_finite() {
        raw.min(config.backoff_max_delay as f64)
    } else {
        config.backoff_max_delay as f64
    };
    capped.max(0.0) as u64
}

/// Compute the `next_retry_at` instant for a job that just failed its
/// `attempts`-th attempt.
pub fn next_retry_at(attempts: u32, now: DateTime<Utc>, config: &Config) -> DateTime<Utc> {
    now + chrono::Duration::seconds(backoff_delay_seconds(attempts, config) as i64)
}

/// Decide whether a job that has just failed its `attempts`-th attempt
/// should retry or retire to the DLQ. The threshold is inclusive on
/// `attempts`: `attempts >= max_retries` retires.
pub fn retirement(attempts: u32, max_retries: u32) -> Retirement {
    if attempts >= max_retries {
        Retirement::Retire
    } else {
        Retirement::Retry
    }
}

/// A job is claimable iff `state == pending` and (`next_retry_at` is null
/// or in the past).
pub fn is_claimable(job: &Job, now: DateTime<Utc>) -> bool {
    job.state == JobState::Pending && job.next_retry_at.map(|at| at <= now).unwrap_or(true)
}
