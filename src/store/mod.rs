//! Durable, crash-safe persistence of the job collection, the DLQ, and the
//! configuration record (spec §4.1).

pub mod error;
pub mod lock;

use crate::model::{Config, Job, JobState};
use error::{StoreError, StoreResult};
use lock::LockHandle;
use std::path::{Path, PathBuf};

const ACTIVE_FILE: &str = "jobs.json";
const DLQ_FILE: &str = "dlq.json";
const CONFIG_FILE: &str = "config.json";
const ROOT_LOCK_FILE: &str = ".root.lock";

/// The on-disk store, rooted at an explicit directory (no process-global
/// state, per spec §9's re-architecture point).
pub struct Store {
    root: PathBuf,
}

impl Store {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn active_path(&self) -> PathBuf {
        self.root.join(ACTIVE_FILE)
    }

    fn dlq_path(&self) -> PathBuf {
        self.root.join(DLQ_FILE)
    }

    fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    fn lock_path(&self, id: &str) -> PathBuf {
        self.root.join("locks").join(format!("{id}.lock"))
    }

    fn root_lock_path(&self) -> PathBuf {
        self.root.join("locks").join(ROOT_LOCK_FILE)
    }

    /// Write `<path>.tmp` then rename over `path`. Rename is the durability
    /// boundary: readers observe either the pre- or post-state, never a
    /// torn file.
    fn atomic_write(&self, path: &Path, contents: &[u8]) -> StoreResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, contents)?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    fn read_json<T: serde::de::DeserializeOwned + Default>(&self, path: &Path) -> StoreResult<T> {
        if !path.exists() {
            return Ok(T::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn load_active(&self) -> StoreResult<Vec<Job>> {
        self.read_json(&self.active_path())
    }

    pub fn save_active(&self, jobs: &[Job]) -> StoreResult<()> {
        let json = serde_json::to_string_pretty(jobs)?;
        self.atomic_write(&self.active_path(), json.as_bytes())
    }

    pub fn load_dlq(&self) -> StoreResult<Vec<Job>> {
        self.read_json(&self.dlq_path())
    }

    pub fn save_dlq(&self, jobs: &[Job]) -> StoreResult<()> {
        let json = serde_json::to_string_pretty(jobs)?;
        self.atomic_write(&self.dlq_path(), json.as_bytes())
    }

    pub fn load_config(&self) -> StoreResult<Config> {
        self.read_json(&self.config_path())
    }

    pub fn save_config(&self, config: &Config) -> StoreResult<()> {
        let json = serde_json::to_string_pretty(config)?;
        self.atomic_write(&self.config_path(), json.as_bytes())
    }

    /// Acquire the root-level lock that serializes structural operations
    /// (`add`, `move_to_dlq`, `requeue_from_dlq`). Blocks briefly (retries
    /// the non-blocking acquire) since these operations are held only for
    /// the duration of a read-modify-write cycle.
    fn lock_root(&self) -> StoreResult<LockHandle> {
        let path = self.root_lock_path();
        let mut last_err = None;
        for _ in 0..500 {
            match lock::try_lock(&path) {
                Ok(handle) => return Ok(handle),
                Err(StoreError::LockBusy(_)) => {
                    last_err = Some(StoreError::LockBusy(path.display().to_string()));
                    std::thread::sleep(std::time::Duration::from_millis(2));
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or_else(|| StoreError::LockBusy(path.display().to_string())))
    }

    /// Non-blocking exclusive lock over a single job's lock file (spec §4.1,
    /// `try_lock`/`release`).
    pub fn try_lock_job(&self, id: &str) -> StoreResult<LockHandle> {
        lock::try_lock(&self.lock_path(id))
    }

    /// Append `job` to the active set. Fails with `DuplicateId` if the id
    /// already exists in either collection.
    pub fn add(&self, job: Job) -> StoreResult<()> {
        let _root_lock = self.lock_root()?;
        let mut active = self.load_active()?;
        let dlq = self.load_dlq()?;
        if active.iter().any(|j| j.id == job.id) || dlq.iter().any(|j| j.id == job.id) {
            return Err(StoreError::DuplicateId(job.id));
        }
        active.push(job);
        self.save_active(&active)
    }

    /// Replace an existing job in the active set by id. Must be called
    /// while holding that job's per-job lock (spec §4.1, "Mutation
    /// exclusion"); this method does not itself acquire it.
    pub fn update(&self, job: Job) -> StoreResult<()> {
        debug_assert!(job.within_attempt_budget(), "I3 violated: {job:?}");
        let mut active = self.load_active()?;
        let Some(slot) = active.iter_mut().find(|j| j.id == job.id) else {
            return Err(StoreError::NotFound(job.id));
        };
        *slot = job;
        self.save_active(&active)
    }

    /// Remove from the active set, append to the DLQ with `state = dead`
    /// (a single logical operation, spec §4.1).
    pub fn move_to_dlq(&self, mut job: Job) -> StoreResult<()> {
        let _root_lock = self.lock_root()?;
        let mut active = self.load_active()?;
        let Some(pos) = active.iter().position(|j| j.id == job.id) else {
            return Err(StoreError::NotFound(job.id));
        };
        active.remove(pos);

        job.state = JobState::Dead;
        let mut dlq = self.load_dlq()?;
        dlq.push(job);

        self.save_active(&active)?;
        self.save_dlq(&dlq)
    }

    /// Inverse of `move_to_dlq`: remove from the DLQ, append to the active
    /// set as a fresh `pending` job (spec §4.1 / §7, "Dead-letter
    /// semantics"). `created_at` is preserved so the job's original FIFO
    /// position is retained.
    pub fn requeue_from_dlq(&self, id: &str) -> StoreResult<Job> {
        let _root_lock = self.lock_root()?;
        let mut dlq = self.load_dlq()?;
        let Some(pos) = dlq.iter().position(|j| j.id == id) else {
            return Err(StoreError::NotFound(id.to_string()));
        };
        let mut job = dlq.remove(pos);

        let mut active = self.load_active()?;
        if active.iter().any(|j| j.id == job.id) {
            // Put it back; requeueing onto a colliding id is a caller bug.
            dlq.push(job);
            self.save_dlq(&dlq)?;
            return Err(StoreError::DuplicateId(id.to_string()));
        }

        job.state = JobState::Pending;
        job.attempts = 0;
        job.next_retry_at = None;
        job.error_message = None;
        job.dlq_reason = None;
        job.updated_at = chrono::Utc::now();

        active.push(job.clone());

        self.save_dlq(&dlq)?;
        self.save_active(&active)?;
        Ok(job)
    }
}
