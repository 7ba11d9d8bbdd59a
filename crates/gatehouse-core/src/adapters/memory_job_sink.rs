//! # In-Memory Job Sink
//!
//! Thread-safe sink that records submitted jobs. Suitable for development
//! and for asserting on submissions in tests. Nothing recorded here is ever
//! executed.
//!
//! The sink is bounded: once `capacity` jobs are held, each new submission
//! drops the oldest one.

use crate::jobs::{Job, JobReceipt, JobSink, JobSinkError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, MutexGuard, PoisonError,
};
use tracing::{debug, warn};

/// Jobs retained by [`InMemoryJobSink::new`]
pub const DEFAULT_CAPACITY: usize = 1000;

/// Records the most recent submitted jobs in submission order
#[derive(Debug, Clone)]
pub struct InMemoryJobSink {
    jobs: Arc<Mutex<VecDeque<Job>>>,
    capacity: usize,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryJobSink {
    /// Create new empty sink holding up to [`DEFAULT_CAPACITY`] jobs
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create new empty sink holding up to `capacity` jobs (at least one)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            jobs: Arc::new(Mutex::new(VecDeque::with_capacity(capacity.min(64)))),
            capacity,
            unavailable: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshot of the retained jobs, oldest first
    pub fn jobs(&self) -> Vec<Job> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Make subsequent submissions fail with [`JobSinkError::Unavailable`]
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Job>> {
        // Every critical section is a single deque operation, so poisoning is ignored
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for InMemoryJobSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobSink for InMemoryJobSink {
    async fn submit(&self, job: Job) -> Result<JobReceipt, JobSinkError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(JobSinkError::Unavailable {
                message: "in-memory sink is marked unavailable".to_string(),
            });
        }

        let receipt = JobReceipt::from(&job);
        let mut jobs = self.lock();
        if jobs.len() >= self.capacity {
            if let Some(dropped) = jobs.pop_front() {
                warn!(
                    job_id = %dropped.id,
                    capacity = self.capacity,
                    "In-memory job sink full; dropping oldest job"
                );
            }
        }
        jobs.push_back(job);
        debug!(job_id = %receipt.job_id, job_kind = %receipt.kind, "Job recorded in memory");
        Ok(receipt)
    }
}

#[cfg(test)]
#[path = "memory_job_sink_tests.rs"]
mod tests;
