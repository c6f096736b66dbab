//! The state-machine layer gluing [`crate::store::Store`] and
//! [`crate::scheduler`] together (spec §4.3).

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::model::{Config, Job, JobSpec, JobState};
use crate::scheduler;
use crate::store::error::StoreError;
use crate::store::lock::LockHandle;
use crate::store::Store;
use std::sync::Arc;

/// Filter accepted by `list` (spec §4.3). `Failed` is kept as an alias for
/// "pending with a non-null `error_message`" rather than dropped, since the
/// documented CLI surface (spec §6) still lists `failed` as a valid
/// `--state` value (§9 Open Question, resolved — see DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobFilter {
    State(JobState),
    Failed,
}

#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub state: Option<JobFilter>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct Stats {
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub dead: usize,
}

/// A claimed job together with the held per-job lock. The lock is released
/// by `mark_succeeded`/`mark_failed`; if a caller drops this without
/// calling either, the lock still releases on `Drop`, but the job is left
/// stranded in `processing` until the next recovery sweep.
pub struct Claim {
    pub job: Job,
    lock: LockHandle,
}

impl Claim {
    fn into_lock(self) -> LockHandle {
        self.lock
    }
}

pub struct QueueService {
    store: Store,
    clock: Arc<dyn Clock>,
}

impl QueueService {
    pub fn new(store: Store, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    fn config(&self) -> Result<Config> {
        Ok(self.store.load_config()?)
    }

    /// Add a new job in state `pending` (spec §4.3, `enqueue`).
    pub fn enqueue(&self, spec: JobSpec) -> Result<Job> {
        if spec.id.trim().is_empty() {
            return Err(Error::Validation("id must not be empty".to_string()));
        }
        if spec.command.trim().is_empty() {
            return Err(Error::Validation("command must not be empty".to_string()));
        }
        if let Some(max_retries) = spec.max_retries {
            // max_retries is u32 so it can't be negative; this guards the
            // JSON boundary where a caller could pass a negative literal
            // that serde would otherwise reject earlier in the CLI layer.
            let _ = max_retries;
        }

        let config = self.config()?;
        let now = self.clock.now();
        let job = Job {
            id: spec.id,
            command: spec.command,
            state: JobState::Pending,
            attempts: 0,
            max_retries: spec.max_retries.unwrap_or(config.max_retries),
            created_at: now,
            updated_at: now,
            next_retry_at: None,
            error_message: None,
            dlq_reason: None,
        };

        self.store.add(job.clone()).map_err(store_to_queue_error)?;
        Ok(job)
    }

    /// Claim the oldest eligible job, double-checking under its lock to
    /// close the TOCTOU window between the eligibility snapshot and the
    /// lock acquisition (spec §4.3, `claim_next`).
    pub fn claim_next(&self) -> Result<Option<Claim>> {
        let now = self.clock.now();
        let mut candidates: Vec<Job> = self
            .store
            .load_active()?
            .into_iter()
            .filter(|job| scheduler::is_claimable(job, now))
            .collect();
        candidates.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

        for candidate in candidates {
            let lock = match self.store.try_lock_job(&candidate.id) {
                Ok(lock) => lock,
                Err(StoreError::LockBusy(_)) => continue,
                Err(e) => return Err(store_to_queue_error(e)),
            };

            // Re-read under the lock: another worker may have settled this
            // job between the snapshot above and acquiring the lock.
            let fresh = self
                .store
                .load_active()?
                .into_iter()
                .find(|job| job.id == candidate.id);

            let Some(mut fresh) = fresh else {
                drop(lock);
                continue;
            };

            if !scheduler::is_claimable(&fresh, now) {
                drop(lock);
                continue;
            }

            fresh.state = JobState::Processing;
            fresh.updated_at = now;
            self.store.update(fresh.clone()).map_err(store_to_queue_error)?;

            return Ok(Some(Claim { job: fresh, lock }));
        }

        Ok(None)
    }

    /// Record a successful attempt and release the claim's lock.
    pub fn mark_succeeded(&self, claim: Claim) -> Result<Job> {
        let now = self.clock.now();
        let mut job = claim.job;
        job.attempts += 1;
        job.state = JobState::Completed;
        job.next_retry_at = None;
        job.error_message = None;
        job.updated_at = now;

        self.store.update(job.clone()).map_err(store_to_queue_error)?;
        let _ = claim.lock.release();
        Ok(job)
    }

    /// Record a failed attempt, consult the scheduler for retry-vs-retire,
    /// and release the claim's lock.
    pub fn mark_failed(&self, claim: Claim, error_text: String) -> Result<Job> {
        let now = self.clock.now();
        let mut job = claim.job;
        job.attempts += 1;
        job.error_message = Some(error_text);
        job.updated_at = now;
        debug_assert!(job.within_attempt_budget(), "I3 violated: {job:?}");

        match scheduler::retirement(job.attempts, job.max_retries) {
            scheduler::Retirement::Retire => {
                job.dlq_reason = Some("max_retries_exhausted".to_string());
                self.store.move_to_dlq(job.clone()).map_err(store_to_queue_error)?;
            }
            scheduler::Retirement::Retry => {
                let config = self.config()?;
                job.state = JobState::Pending;
                job.next_retry_at = Some(scheduler::next_retry_at(job.attempts, now, &config));
                self.store.update(job.clone()).map_err(store_to_queue_error)?;
            }
        }

        let _ = claim.lock.release();
        Ok(job)
    }

    /// Read-only snapshot over the active set.
    pub fn list(&self, filter: ListFilter) -> Result<Vec<Job>> {
        let mut jobs = self.store.load_active()?;
        if let Some(state_filter) = filter.state {
            jobs.retain(|job| match state_filter {
                JobFilter::State(state) => job.state == state,
                JobFilter::Failed => {
                    job.state == JobState::Pending && job.error_message.is_some()
                }
            });
        }
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        if let Some(limit) = filter.limit {
            jobs.truncate(limit);
        }
        Ok(jobs)
    }

    /// Counts per state across the active set, plus DLQ size.
    pub fn stats(&self) -> Result<Stats> {
        let active = self.store.load_active()?;
        let dead = self.store.load_dlq()?.len();
        let mut stats = Stats {
            dead,
            ..Stats::default()
        };
        for job in active {
            match job.state {
                JobState::Pending => stats.pending += 1,
                JobState::Processing => stats.processing += 1,
                JobState::Completed => stats.completed += 1,
                JobState::Failed | JobState::Dead => {}
            }
        }
        Ok(stats)
    }

    /// Read-only snapshot over the DLQ, most recently failed first.
    pub fn dlq_list(&self, limit: Option<usize>) -> Result<Vec<Job>> {
        let mut jobs = self.store.load_dlq()?;
        jobs.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        if let Some(limit) = limit {
            jobs.truncate(limit);
        }
        Ok(jobs)
    }

    /// Re-admit a job from the DLQ back into the active set as `pending`.
    pub fn dlq_requeue(&self, id: &str) -> Result<Job> {
        self.store.requeue_from_dlq(id).map_err(store_to_queue_error)
    }

    /// Startup recovery sweep (spec §5, "Crash recovery"): scan for jobs
    /// stuck in `processing` whose lock is free (their owning worker died)
    /// and resolve them as if they had just failed.
    pub fn recover_crashed(&self) -> Result<Vec<Job>> {
        let stuck: Vec<Job> = self
            .store
            .load_active()?
            .into_iter()
            .filter(|job| job.state == JobState::Processing)
            .collect();

        let mut recovered = Vec::new();
        for job in stuck {
            let lock = match self.store.try_lock_job(&job.id) {
                Ok(lock) => lock,
                Err(StoreError::LockBusy(_)) => continue, // still owned by a live worker
                Err(e) => return Err(store_to_queue_error(e)),
            };

            let claim = Claim { job, lock };
            let recovered_job = self.mark_failed(claim, "worker crashed".to_string())?;
            recovered.push(recovered_job);
        }
        Ok(recovered)
    }
}

impl Claim {
    /// Release the held lock without recording any outcome. Used by the
    /// worker loop's `finally`-style guarantee when an attempt could not
    /// even be dispatched to the runner.
    pub fn release_without_outcome(self) {
        let _ = self.into_lock().release();
    }
}

fn store_to_queue_error(err: StoreError) -> Error {
    match err {
        StoreError::Io(e) => Error::Io(e),
        StoreError::Serialization(e) => Error::Serialization(e),
        StoreError::NotFound(id) => Error::NotFound(id),
        StoreError::DuplicateId(id) => Error::DuplicateId(id),
        StoreError::LockBusy(path) => {
            // Should never reach the CLI boundary; claim_next consumes
            // LockBusy internally. Surfacing it as NotFound would be
            // misleading, so this is the one place it escapes as Io.
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::WouldBlock,
                format!("lock busy: {path}"),
            ))
        }
    }
}
