//! Extraction worker: leases jobs and runs the pipeline on them.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use revmine::{DocumentAi, Orchestrator, PipelineError, PipelineOutcome, TherapyLookup};
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::queue::{self, Job, JobQueue};
use crate::store::{self, DocumentStore, PageStore};

/// Knobs for the worker loop.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// How long to sleep when the queue is empty
    pub poll_interval: Duration,

    /// How often to sweep for stuck jobs
    pub sweep_interval: Duration,

    /// How long a job may stay leased before a sweep reclaims it
    pub stuck_timeout: Duration,

    /// Identifier for logs
    pub worker_id: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            sweep_interval: Duration::from_secs(60),
            stuck_timeout: Duration::from_secs(600),
            worker_id: format!("worker-{}", Uuid::new_v4()),
        }
    }
}

impl WorkerConfig {
    /// Create a config with a specific worker id.
    pub fn with_worker_id(worker_id: impl Into<String>) -> Self {
        Self {
            worker_id: worker_id.into(),
            ..Default::default()
        }
    }
}

/// Polls the job queue and runs the extraction pipeline on each leased job.
///
/// One job at a time per worker; run more workers for throughput. The
/// pipeline result and the job completion are persisted in one transaction,
/// fenced by the lease token, so a worker that lost its lease to the
/// stuck-job sweep discards its result instead of clobbering the re-run.
pub struct Worker<A: DocumentAi, T: TherapyLookup> {
    pool: PgPool,
    queue: JobQueue,
    documents: DocumentStore,
    pages: PageStore,
    orchestrator: Orchestrator<A, T>,
    config: WorkerConfig,
}

impl<A: DocumentAi, T: TherapyLookup> Worker<A, T> {
    pub fn new(pool: PgPool, ai: A, therapies: T) -> Self {
        Self::with_config(pool, ai, therapies, WorkerConfig::default())
    }

    pub fn with_config(pool: PgPool, ai: A, therapies: T, config: WorkerConfig) -> Self {
        Self {
            queue: JobQueue::new(pool.clone()),
            documents: DocumentStore::new(pool.clone()),
            pages: PageStore::new(pool.clone()),
            orchestrator: Orchestrator::new(ai, therapies),
            pool,
            config,
        }
    }

    /// Run until the token is cancelled.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        info!(worker_id = %self.config.worker_id, "worker starting");

        // Jobs orphaned by a previous crash of this worker are the most
        // likely stuck jobs, so sweep once before polling.
        if let Err(e) = self.sweep().await {
            error!(error = %e, "startup stuck-job sweep failed");
        }
        let mut last_sweep = Instant::now();

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            if last_sweep.elapsed() >= self.config.sweep_interval {
                if let Err(e) = self.sweep().await {
                    error!(error = %e, "stuck-job sweep failed");
                }
                last_sweep = Instant::now();
            }

            match self.process_next().await {
                Ok(true) => continue,
                Ok(false) => {}
                Err(e) => error!(error = %e, "failed to lease next job"),
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        info!(worker_id = %self.config.worker_id, "worker stopped");
        Ok(())
    }

    /// Lease and process a single job. Returns false when the queue was
    /// empty.
    ///
    /// Pipeline failures are recorded on the job, not returned; the error
    /// path here is queue access itself.
    pub async fn process_next(&self) -> Result<bool> {
        let Some(job) = self.queue.lease_next().await? else {
            return Ok(false);
        };

        self.process_job(job).await;
        Ok(true)
    }

    /// Reclaim jobs whose lease expired.
    pub async fn sweep(&self) -> Result<()> {
        let recovered = self.queue.recover_stuck(self.config.stuck_timeout).await?;
        if !recovered.is_empty() {
            warn!(count = recovered.len(), "recovered stuck jobs");
        }
        Ok(())
    }

    async fn process_job(&self, job: Job) {
        debug!(
            job_id = %job.id,
            document_id = %job.document_id,
            job_type = %job.job_type,
            attempt = job.attempts + 1,
            "processing job"
        );

        match self.run_extraction(&job).await {
            Ok(Some(outcome)) => {
                info!(
                    job_id = %job.id,
                    document_id = %job.document_id,
                    records = outcome.result.records.len(),
                    confidence = outcome.result.confidence,
                    strategy = %outcome.strategy,
                    tokens = outcome.usage.total(),
                    "extraction complete"
                );
            }
            Ok(None) => {
                warn!(job_id = %job.id, "lease lost before persistence, result discarded");
            }
            Err(e) => {
                let fatal = e
                    .downcast_ref::<PipelineError>()
                    .map(PipelineError::is_fatal)
                    .unwrap_or(false);
                warn!(job_id = %job.id, error = %e, fatal, "job failed");

                // Fatal errors recur deterministically on retry; they still
                // burn attempts one at a time until max_attempts marks the
                // job failed.
                if let Err(mark_err) = self.queue.fail(job.id, &format!("{e:#}")).await {
                    error!(job_id = %job.id, error = %mark_err, "failed to record job failure");
                }
            }
        }
    }

    /// Run the pipeline for one leased job and persist the outcome.
    ///
    /// Returns `None` when the lease was lost while the pipeline ran; the
    /// result is discarded rather than written over the re-leased run's
    /// work.
    async fn run_extraction(&self, job: &Job) -> Result<Option<PipelineOutcome>> {
        let leased_at = job.started_at.context("leased job has no started_at")?;

        let row = self
            .documents
            .find(job.document_id)
            .await?
            .with_context(|| format!("job references missing document {}", job.document_id))?;
        let text = self.pages.load(job.document_id).await?;
        let document = row.to_document();

        let outcome = self.orchestrator.process(&document, &text).await?;

        let mut tx = self.pool.begin().await?;
        if !queue::complete_owned(&mut *tx, job.id, leased_at).await? {
            tx.rollback().await?;
            return Ok(None);
        }
        store::upsert_result(&mut *tx, job.document_id, &outcome).await?;
        store::backfill_classification(
            &mut *tx,
            job.document_id,
            outcome.report_type.as_deref(),
            outcome.company_name.as_deref(),
            outcome.reporting_period.as_deref(),
        )
        .await?;
        tx.commit().await?;

        Ok(Some(outcome))
    }
}
