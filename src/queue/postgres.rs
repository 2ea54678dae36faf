use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DexflowError, Result};

use super::{Job, JobState, JobStore};

/// PostgreSQL-backed job store; jobs survive process restarts.
#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
    max_attempts: i32,
}

impl PgJobStore {
    pub fn new(pool: PgPool, max_attempts: u32) -> Self {
        Self {
            pool,
            max_attempts: max_attempts as i32,
        }
    }
}

fn row_to_job(row: &PgRow) -> Result<Job> {
    let state: String = row.get("state");

    Ok(Job {
        id: row.get("id"),
        order_id: row.get("order_id"),
        attempts: row.get("attempts"),
        max_attempts: row.get("max_attempts"),
        run_at: row.get("run_at"),
        state: JobState::try_from(state.as_str()).map_err(DexflowError::Internal)?,
        last_error: row.get("last_error"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn enqueue(&self, order_id: Uuid) -> Result<Job> {
        let row = sqlx::query(
            r#"
            INSERT INTO order_jobs (order_id, max_attempts)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(order_id)
        .bind(self.max_attempts)
        .fetch_one(&self.pool)
        .await?;

        let job = row_to_job(&row)?;
        debug!(job_id = job.id, %order_id, "job enqueued");
        Ok(job)
    }

    async fn claim_due(&self) -> Result<Option<Job>> {
        // SKIP LOCKED keeps concurrent workers from claiming the same row.
        let row = sqlx::query(
            r#"
            UPDATE order_jobs SET state = 'running', updated_at = NOW()
            WHERE id = (
                SELECT id FROM order_jobs
                WHERE state = 'queued' AND run_at <= NOW()
                ORDER BY run_at
                FOR UPDATE SKIP LOCKED
                LIMIT 1
            )
            RETURNING *
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_job).transpose()
    }

    async fn complete(&self, job_id: i64) -> Result<()> {
        sqlx::query("UPDATE order_jobs SET state = 'done', updated_at = NOW() WHERE id = $1")
            .bind(job_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn fail(
        &self,
        job_id: i64,
        error: &str,
        retry_at: Option<DateTime<Utc>>,
    ) -> Result<Job> {
        let row = match retry_at {
            Some(run_at) => {
                sqlx::query(
                    r#"
                    UPDATE order_jobs
                    SET state = 'queued', attempts = attempts + 1, last_error = $2,
                        run_at = $3, updated_at = NOW()
                    WHERE id = $1
                    RETURNING *
                    "#,
                )
                .bind(job_id)
                .bind(error)
                .bind(run_at)
                .fetch_one(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    UPDATE order_jobs
                    SET state = 'dead', attempts = attempts + 1, last_error = $2,
                        updated_at = NOW()
                    WHERE id = $1
                    RETURNING *
                    "#,
                )
                .bind(job_id)
                .bind(error)
                .fetch_one(&self.pool)
                .await?
            }
        };

        row_to_job(&row)
    }
}
