//! Postgres-backed job queue for extraction work.
//!
//! Jobs are leased with `FOR UPDATE SKIP LOCKED`, so any number of workers
//! can poll the same table without double-processing. The `started_at`
//! timestamp written at lease time doubles as the lease token: completion
//! re-checks it, and a sweep that reclaimed the job invalidates the token.

use std::fmt;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPool;
use sqlx::FromRow;
use uuid::Uuid;

/// Highest priority; reprocessing requests jump the queue.
pub const PRIORITY_HIGH: i16 = 1;
/// Default priority for freshly submitted documents.
pub const PRIORITY_NORMAL: i16 = 2;
/// Lowest priority, for backfill work.
pub const PRIORITY_LOW: i16 = 3;

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "job_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of run a job asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "job_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    #[default]
    Extraction,
    Reprocessing,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extraction => "extraction",
            Self::Reprocessing => "reprocessing",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row in the `jobs` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub document_id: Uuid,
    pub job_type: JobType,

    /// 1 = high, 3 = low; lower numbers lease first
    pub priority: i16,

    pub status: JobStatus,

    /// Attempts consumed so far, counting the one in flight once it ends
    pub attempts: i32,
    pub max_attempts: i32,
    pub last_error: Option<String>,

    pub created_at: DateTime<Utc>,

    /// Set while a worker holds the job; the lease token
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Job counts by status.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct QueueStats {
    pub pending: i64,
    pub processing: i64,
    pub completed: i64,
    pub failed: i64,
}

/// Handle to the `jobs` table.
#[derive(Clone)]
pub struct JobQueue {
    pool: PgPool,
}

impl JobQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new pending job.
    pub async fn enqueue(
        &self,
        document_id: Uuid,
        job_type: JobType,
        priority: i16,
    ) -> Result<Job> {
        let job = sqlx::query_as::<_, Job>(
            r#"
            INSERT INTO jobs (id, document_id, job_type, priority)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(document_id)
        .bind(job_type)
        .bind(priority)
        .fetch_one(&self.pool)
        .await?;

        Ok(job)
    }

    /// Lease the next pending job, if any.
    ///
    /// Single-row claim: best priority first, oldest first within a
    /// priority. `FOR UPDATE SKIP LOCKED` keeps concurrent workers off the
    /// same row. The `started_at` written here is the lease token that
    /// [`complete_owned`] checks again at persistence time.
    pub async fn lease_next(&self) -> Result<Option<Job>> {
        let job = sqlx::query_as::<_, Job>(
            r#"
            WITH next_job AS (
                SELECT id
                FROM jobs
                WHERE status = 'pending'
                ORDER BY priority, created_at
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            UPDATE jobs
            SET status = 'processing', started_at = NOW()
            WHERE id IN (SELECT id FROM next_job)
            RETURNING *
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(job)
    }

    /// Mark a processing job completed without checking lease ownership.
    ///
    /// Worker code goes through [`complete_owned`] instead; this is for
    /// operational tooling.
    pub async fn complete(&self, job_id: Uuid) -> Result<bool> {
        let rows = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'completed', completed_at = NOW()
            WHERE id = $1 AND status = 'processing'
            "#,
        )
        .bind(job_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows > 0)
    }

    /// Record a failed attempt.
    ///
    /// Every failure consumes an attempt. Jobs with attempts left go back to
    /// pending with the error recorded and the lease cleared; a job on its
    /// last attempt becomes failed, which is terminal.
    ///
    /// Returns `None` when the job was not processing, which means the lease
    /// was already reclaimed out from under the caller.
    pub async fn fail(&self, job_id: Uuid, error: &str) -> Result<Option<Job>> {
        let job = sqlx::query_as::<_, Job>(
            r#"
            UPDATE jobs
            SET attempts = attempts + 1,
                last_error = $2,
                status = CASE WHEN attempts + 1 >= max_attempts
                         THEN 'failed'::job_status ELSE 'pending'::job_status END,
                started_at = NULL,
                completed_at = CASE WHEN attempts + 1 >= max_attempts
                               THEN NOW() ELSE NULL END
            WHERE id = $1 AND status = 'processing'
            RETURNING *
            "#,
        )
        .bind(job_id)
        .bind(error)
        .fetch_optional(&self.pool)
        .await?;

        Ok(job)
    }

    /// Reclaim jobs whose lease expired.
    ///
    /// A job is stuck when it has been processing strictly longer than
    /// `timeout`; a job exactly at the boundary keeps its lease. Recovered
    /// jobs follow the same attempt accounting as [`fail`], with a synthetic
    /// timeout error recorded.
    pub async fn recover_stuck(&self, timeout: Duration) -> Result<Vec<Uuid>> {
        let error = format!("processing timed out after {}s", timeout.as_secs());

        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE jobs
            SET attempts = attempts + 1,
                last_error = $1,
                status = CASE WHEN attempts + 1 >= max_attempts
                         THEN 'failed'::job_status ELSE 'pending'::job_status END,
                started_at = NULL,
                completed_at = CASE WHEN attempts + 1 >= max_attempts
                               THEN NOW() ELSE NULL END
            WHERE status = 'processing'
              AND started_at < NOW() - make_interval(secs => $2)
            RETURNING id
            "#,
        )
        .bind(&error)
        .bind(timeout.as_secs_f64())
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    /// Delete completed jobs older than `older_than`. Returns the number of
    /// rows removed.
    pub async fn purge_completed(&self, older_than: Duration) -> Result<u64> {
        let rows = sqlx::query(
            r#"
            DELETE FROM jobs
            WHERE status = 'completed'
              AND completed_at < NOW() - make_interval(secs => $1)
            "#,
        )
        .bind(older_than.as_secs_f64())
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows)
    }

    /// Job counts by status.
    pub async fn stats(&self) -> Result<QueueStats> {
        let rows: Vec<(JobStatus, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM jobs GROUP BY status")
                .fetch_all(&self.pool)
                .await?;

        let mut stats = QueueStats::default();
        for (status, count) in rows {
            match status {
                JobStatus::Pending => stats.pending = count,
                JobStatus::Processing => stats.processing = count,
                JobStatus::Completed => stats.completed = count,
                JobStatus::Failed => stats.failed = count,
            }
        }

        Ok(stats)
    }

    /// Look up a job by id.
    pub async fn find(&self, job_id: Uuid) -> Result<Option<Job>> {
        let job = sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(job)
    }

    /// The most recently created job for a document.
    pub async fn latest_for_document(&self, document_id: Uuid) -> Result<Option<Job>> {
        let job = sqlx::query_as::<_, Job>(
            "SELECT * FROM jobs WHERE document_id = $1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(job)
    }
}

/// Mark a job completed, but only if the caller still owns the lease.
///
/// The lease is identified by the `started_at` value captured when the job
/// was leased. A sweep that reclaimed the job, or a later re-lease, changed
/// `started_at`; a worker holding a stale token matches zero rows and must
/// discard its result. Takes an executor so the check can share a
/// transaction with result persistence.
pub async fn complete_owned(
    executor: impl sqlx::PgExecutor<'_>,
    job_id: Uuid,
    leased_at: DateTime<Utc>,
) -> Result<bool> {
    let rows = sqlx::query(
        r#"
        UPDATE jobs
        SET status = 'completed', completed_at = NOW()
        WHERE id = $1 AND status = 'processing' AND started_at = $2
        "#,
    )
    .bind(job_id)
    .bind(leased_at)
    .execute(executor)
    .await?
    .rows_affected();

    Ok(rows > 0)
}
