use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::config::QueueConfig;
use crate::executor::{JobContext, OrderExecutor};

use super::{backoff_delay, Job, JobStore};

/// Bounded pool of worker tasks draining the durable job queue.
///
/// At most `concurrency` executions run at once in this process. There is
/// no ordering guarantee across orders; each worker claims whatever job is
/// due next.
pub struct WorkerPool {
    jobs: Arc<dyn JobStore>,
    executor: Arc<OrderExecutor>,
    config: QueueConfig,
    backoff_base_ms: u64,
    shutdown_tx: watch::Sender<bool>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl WorkerPool {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        executor: Arc<OrderExecutor>,
        config: QueueConfig,
        backoff_base_ms: u64,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            jobs,
            executor,
            config,
            backoff_base_ms,
            shutdown_tx,
            handles: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Spawn the worker tasks.
    pub async fn start(&self) {
        let mut handles = self.handles.lock().await;
        for worker_id in 0..self.config.concurrency {
            let jobs = Arc::clone(&self.jobs);
            let executor = Arc::clone(&self.executor);
            let poll_interval = self.config.poll_interval();
            let backoff_base_ms = self.backoff_base_ms;
            let mut shutdown = self.shutdown_tx.subscribe();

            handles.push(tokio::spawn(async move {
                debug!(worker_id, "worker started");
                loop {
                    if *shutdown.borrow() {
                        break;
                    }

                    match jobs.claim_due().await {
                        Ok(Some(job)) => {
                            run_job(&*jobs, &executor, backoff_base_ms, job).await;
                        }
                        Ok(None) => {
                            tokio::select! {
                                _ = sleep(poll_interval) => {}
                                _ = shutdown.changed() => {}
                            }
                        }
                        Err(e) => {
                            error!(worker_id, error = %e, "failed to claim job");
                            tokio::select! {
                                _ = sleep(poll_interval) => {}
                                _ = shutdown.changed() => {}
                            }
                        }
                    }
                }
                debug!(worker_id, "worker stopped");
            }));
        }

        info!(workers = self.config.concurrency, "worker pool started");
    }

    /// Stop the workers and wait for in-flight jobs to finish.
    ///
    /// Idempotent: repeated calls after the first are no-ops.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let _ = self.shutdown_tx.send(true);
        let handles = std::mem::take(&mut *self.handles.lock().await);
        for handle in handles {
            let _ = handle.await;
        }

        info!("worker pool closed");
    }
}

/// Run one claimed job and settle its queue state.
async fn run_job(
    jobs: &dyn JobStore,
    executor: &OrderExecutor,
    backoff_base_ms: u64,
    job: Job,
) {
    let context = JobContext {
        order_id: job.order_id,
        attempt_index: job.attempts as u32,
    };

    match executor.process(context).await {
        Ok(()) => {
            if let Err(e) = jobs.complete(job.id).await {
                error!(job_id = job.id, error = %e, "failed to mark job done");
            }
        }
        Err(e) => {
            let next_attempts = job.attempts + 1;
            let retry_at = if next_attempts < job.max_attempts {
                let delay = backoff_delay(job.attempts as u32, backoff_base_ms);
                debug!(
                    job_id = job.id,
                    order_id = %job.order_id,
                    attempts = next_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "rescheduling failed job"
                );
                Some(Utc::now() + chrono::Duration::milliseconds(delay.as_millis() as i64))
            } else {
                error!(
                    job_id = job.id,
                    order_id = %job.order_id,
                    attempts = next_attempts,
                    "job exhausted retries"
                );
                None
            };

            // A store outage here must not take the worker down.
            if let Err(store_err) = jobs.fail(job.id, &e.to_string(), retry_at).await {
                error!(job_id = job.id, error = %store_err, "failed to record job failure");
            }
        }
    }
}
