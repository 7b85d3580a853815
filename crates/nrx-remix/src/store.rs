//! Job-state store with per-record expiry, and the tracker on top of it
//!
//! The store is a string key/value cache: every write replaces the whole
//! value and resets its expiry. [`JobTracker`] layers the job state
//! machine over it and refuses writes to terminal records.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::error::RemixResult;
use crate::job::{JobRecord, RemixOutcome, Stage};

// ═══════════════════════════════════════════════════════════════════════════════
// STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// Key/value store for serialized job records
pub trait JobStore: Send + Sync {
    fn get(&self, key: &str) -> RemixResult<Option<String>>;

    /// Overwrite `key` wholesale; the record expires `ttl` after this write
    fn put(&self, key: &str, value: String, ttl: Duration) -> RemixResult<()>;

    /// Returns whether a live record was removed
    fn remove(&self, key: &str) -> RemixResult<bool>;
}

struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Every this many writes, `put` sweeps out expired entries
const PURGE_INTERVAL: usize = 64;

/// In-process [`JobStore`]
///
/// Expired entries are invisible to `get` and are swept out on every
/// [`PURGE_INTERVAL`]-th write, so records nobody polls again do not pile up.
#[derive(Default)]
pub struct MemoryJobStore {
    entries: RwLock<HashMap<String, Entry>>,
    writes: AtomicUsize,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every expired entry; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, e| e.is_live(now));
        before - entries.len()
    }

    /// Live entry count
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.read().values().filter(|e| e.is_live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl JobStore for MemoryJobStore {
    fn get(&self, key: &str) -> RemixResult<Option<String>> {
        let now = Instant::now();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(e) if e.is_live(now) => return Ok(Some(e.value.clone())),
                None => return Ok(None),
                Some(_) => {}
            }
        }

        // Expired: drop it unless a writer refreshed it meanwhile
        let mut entries = self.entries.write();
        if entries.get(key).is_some_and(|e| !e.is_live(now)) {
            entries.remove(key);
            log::debug!("Purged expired record {}", key);
        }
        Ok(None)
    }

    fn put(&self, key: &str, value: String, ttl: Duration) -> RemixResult<()> {
        let now = Instant::now();
        let entry = Entry {
            value,
            expires_at: now + ttl,
        };

        let mut entries = self.entries.write();
        entries.insert(key.to_string(), entry);

        let writes = self.writes.fetch_add(1, Ordering::Relaxed) + 1;
        if writes % PURGE_INTERVAL == 0 {
            let before = entries.len();
            entries.retain(|_, e| e.is_live(now));
            let purged = before - entries.len();
            if purged > 0 {
                log::debug!("Purged {} expired job records", purged);
            }
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> RemixResult<bool> {
        let now = Instant::now();
        Ok(self
            .entries
            .write()
            .remove(key)
            .is_some_and(|e| e.is_live(now)))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TRACKER
// ═══════════════════════════════════════════════════════════════════════════════

/// Store key for a job id
pub fn job_key(job_id: &str) -> String {
    format!("job:{}", job_id)
}

/// Job state machine over a [`JobStore`]
#[derive(Clone)]
pub struct JobTracker {
    store: Arc<dyn JobStore>,
    ttl: Duration,
}

impl JobTracker {
    pub fn new(store: Arc<dyn JobStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn status(&self, job_id: &str) -> RemixResult<Option<JobRecord>> {
        match self.store.get(&job_key(job_id))? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Write the accepted record (processing, 0%)
    pub fn create(&self, job_id: &str) -> RemixResult<JobRecord> {
        let record = JobRecord::accepted(job_id);
        self.write(&record)?;
        Ok(record)
    }

    pub fn checkpoint(&self, job_id: &str, stage: Stage) -> RemixResult<()> {
        let Some(current) = self.writable(job_id)? else {
            return Ok(());
        };
        if stage.progress() < current.progress {
            log::warn!(
                "Job {}: ignoring checkpoint {:?} below current progress {}",
                job_id,
                stage,
                current.progress
            );
            return Ok(());
        }

        log::info!("Job {}: {}% {}", job_id, stage.progress(), stage.label());
        self.write(&current.at_stage(stage))
    }

    pub fn complete(&self, job_id: &str, outcome: RemixOutcome) -> RemixResult<()> {
        let Some(current) = self.writable(job_id)? else {
            return Ok(());
        };
        log::info!("Job {}: completed -> {}", job_id, outcome.output_path.display());
        self.write(&current.completed(outcome))
    }

    pub fn fail(&self, job_id: &str, message: &str) -> RemixResult<()> {
        let Some(current) = self.writable(job_id)? else {
            return Ok(());
        };
        log::error!("Job {}: {}", job_id, message);
        self.write(&current.failed(message))
    }

    /// Current record, or a fresh one if it expired; `None` when terminal
    fn writable(&self, job_id: &str) -> RemixResult<Option<JobRecord>> {
        match self.status(job_id)? {
            Some(record) if record.is_terminal() => {
                log::warn!(
                    "Job {}: refusing write to terminal record ({:?})",
                    job_id,
                    record.status
                );
                Ok(None)
            }
            Some(record) => Ok(Some(record)),
            None => Ok(Some(JobRecord::accepted(job_id))),
        }
    }

    fn write(&self, record: &JobRecord) -> RemixResult<()> {
        let json = serde_json::to_string(record)?;
        self.store.put(&job_key(&record.job_id), json, self.ttl)
    }
}
