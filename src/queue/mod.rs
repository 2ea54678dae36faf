//! Durable job queue and worker pool.
//!
//! Intake enqueues one job per order; workers claim due jobs under a
//! concurrency bound and hand them to the executor. A failed delivery is
//! rescheduled with exponential backoff until the attempt ceiling, then the
//! job is marked dead at the infrastructure level (the executor forces the
//! order's own terminal state independently).

pub mod backoff;
mod memory;
mod postgres;
mod worker;

pub use backoff::backoff_delay;
pub use memory::MemoryJobStore;
pub use postgres::PgJobStore;
pub use worker::WorkerPool;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;

/// Job scheduling state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Waiting for its `run_at` time
    Queued,
    /// Claimed by a worker
    Running,
    /// Delivered successfully
    Done,
    /// Retries exhausted
    Dead,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Running => "running",
            JobState::Done => "done",
            JobState::Dead => "dead",
        }
    }
}

impl TryFrom<&str> for JobState {
    type Error = String;

    fn try_from(raw: &str) -> std::result::Result<Self, Self::Error> {
        match raw {
            "queued" => Ok(JobState::Queued),
            "running" => Ok(JobState::Running),
            "done" => Ok(JobState::Done),
            "dead" => Ok(JobState::Dead),
            other => Err(format!("unknown job state: {other}")),
        }
    }
}

/// One durable `{order_id}` work item
#[derive(Debug, Clone)]
pub struct Job {
    pub id: i64,
    pub order_id: Uuid,
    /// Failed deliveries so far; doubles as the attempt index of the next run
    pub attempts: i32,
    pub max_attempts: i32,
    pub run_at: DateTime<Utc>,
    pub state: JobState,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Persistence behind the worker pool.
///
/// The Postgres implementation survives restarts; the in-memory one stands
/// in for it in tests and local dry runs.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Admit a job for the order, runnable immediately.
    async fn enqueue(&self, order_id: Uuid) -> Result<Job>;

    /// Claim the next due job and mark it running. Safe to call from many
    /// workers concurrently; each due job is handed out exactly once.
    async fn claim_due(&self) -> Result<Option<Job>>;

    /// Record a successful delivery.
    async fn complete(&self, job_id: i64) -> Result<()>;

    /// Record a failed delivery: bump the attempt counter, then requeue at
    /// `retry_at` or mark the job dead when no retry remains.
    async fn fail(&self, job_id: i64, error: &str, retry_at: Option<DateTime<Utc>>) -> Result<Job>;
}
