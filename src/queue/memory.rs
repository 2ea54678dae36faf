use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{DexflowError, Result};

use super::{Job, JobState, JobStore};

/// In-memory job store.
///
/// Non-durable; stands in for PostgreSQL in tests and local dry runs.
pub struct MemoryJobStore {
    jobs: Mutex<HashMap<i64, Job>>,
    next_id: AtomicI64,
    max_attempts: i32,
}

impl MemoryJobStore {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
            next_id: AtomicI64::new(1),
            max_attempts: max_attempts as i32,
        }
    }

    /// Snapshot a job for assertions.
    pub async fn get(&self, job_id: i64) -> Option<Job> {
        self.jobs.lock().await.get(&job_id).cloned()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn enqueue(&self, order_id: Uuid) -> Result<Job> {
        let now = Utc::now();
        let job = Job {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            order_id,
            attempts: 0,
            max_attempts: self.max_attempts,
            run_at: now,
            state: JobState::Queued,
            last_error: None,
            created_at: now,
            updated_at: now,
        };

        self.jobs.lock().await.insert(job.id, job.clone());
        Ok(job)
    }

    async fn claim_due(&self) -> Result<Option<Job>> {
        let now = Utc::now();
        let mut jobs = self.jobs.lock().await;

        let due_id = jobs
            .values()
            .filter(|job| job.state == JobState::Queued && job.run_at <= now)
            .min_by_key(|job| job.run_at)
            .map(|job| job.id);

        if let Some(id) = due_id {
            if let Some(job) = jobs.get_mut(&id) {
                job.state = JobState::Running;
                job.updated_at = now;
                return Ok(Some(job.clone()));
            }
        }

        Ok(None)
    }

    async fn complete(&self, job_id: i64) -> Result<()> {
        let mut jobs = self.jobs.lock().await;
        let job = jobs
            .get_mut(&job_id)
            .ok_or_else(|| DexflowError::Internal(format!("unknown job {job_id}")))?;
        job.state = JobState::Done;
        job.updated_at = Utc::now();
        Ok(())
    }

    async fn fail(
        &self,
        job_id: i64,
        error: &str,
        retry_at: Option<DateTime<Utc>>,
    ) -> Result<Job> {
        let mut jobs = self.jobs.lock().await;
        let job = jobs
            .get_mut(&job_id)
            .ok_or_else(|| DexflowError::Internal(format!("unknown job {job_id}")))?;

        job.attempts += 1;
        job.last_error = Some(error.to_string());
        job.updated_at = Utc::now();
        match retry_at {
            Some(run_at) => {
                job.state = JobState::Queued;
                job.run_at = run_at;
            }
            None => {
                job.state = JobState::Dead;
            }
        }

        Ok(job.clone())
    }
}
