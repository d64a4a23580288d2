//! Document intake and status queries.
//!
//! The operator-facing write path: register page text, queue extraction
//! work, inspect progress, and force a re-run.

use anyhow::{Context, Result};
use revmine::Document;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::queue::{Job, JobQueue, JobType, PRIORITY_HIGH, PRIORITY_NORMAL};
use crate::store::{DocumentRow, DocumentStore, PageStore, ResultsStore, StoredResult};

/// A document submission: provenance plus the extracted page text.
#[derive(Debug, Clone)]
pub struct Submission {
    /// Where the source file lives (object storage key, path, URL)
    pub file_location: String,

    /// Original file name, for operator display
    pub file_name: String,

    /// Company hint; classification can refine it later
    pub company_name: Option<String>,

    /// Page text in page order (element 0 is page 1)
    pub pages: Vec<String>,
}

/// What a submission produced.
#[derive(Debug, Clone)]
pub struct Submitted {
    pub document_id: Uuid,
    pub job_id: Uuid,

    /// True when the content hash matched an existing document
    pub reused_existing: bool,
}

/// Where one document stands in the pipeline.
#[derive(Debug)]
pub struct ExtractionStatus {
    pub document: DocumentRow,

    /// The most recent job, if any was ever queued
    pub job: Option<Job>,

    /// The stored result of the latest successful run
    pub result: Option<StoredResult>,
}

/// Front door for submitting documents and queueing work.
#[derive(Clone)]
pub struct Intake {
    documents: DocumentStore,
    pages: PageStore,
    results: ResultsStore,
    queue: JobQueue,
}

impl Intake {
    pub fn new(pool: PgPool) -> Self {
        Self {
            documents: DocumentStore::new(pool.clone()),
            pages: PageStore::new(pool.clone()),
            results: ResultsStore::new(pool.clone()),
            queue: JobQueue::new(pool),
        }
    }

    /// Register a document and queue an extraction job for it.
    ///
    /// The content hash covers the page text. Resubmitting identical text
    /// reuses the existing document row and queues another job instead of
    /// creating a duplicate; the page rows are rewritten either way, which
    /// also heals a document whose pages never landed.
    pub async fn submit_document(&self, submission: Submission) -> Result<Submitted> {
        let content_hash = Document::hash_content(joined_pages(&submission.pages).as_bytes());

        let (document, reused_existing) = match self.documents.find_by_hash(&content_hash).await? {
            Some(existing) => (existing, true),
            None => {
                let row = self
                    .documents
                    .insert(
                        &submission.file_location,
                        &submission.file_name,
                        &content_hash,
                        submission.company_name.as_deref(),
                    )
                    .await?;
                (row, false)
            }
        };
        self.pages.replace(document.id, &submission.pages).await?;

        let job = self
            .queue
            .enqueue(document.id, JobType::Extraction, PRIORITY_NORMAL)
            .await?;

        info!(
            document_id = %document.id,
            job_id = %job.id,
            reused_existing,
            pages = submission.pages.len(),
            "document submitted"
        );

        Ok(Submitted {
            document_id: document.id,
            job_id: job.id,
            reused_existing,
        })
    }

    /// Current job state and stored result for a document.
    pub async fn extraction_status(&self, document_id: Uuid) -> Result<ExtractionStatus> {
        let document = self
            .documents
            .find(document_id)
            .await?
            .with_context(|| format!("no document with id {document_id}"))?;
        let job = self.queue.latest_for_document(document_id).await?;
        let result = self.results.find(document_id).await?;

        Ok(ExtractionStatus {
            document,
            job,
            result,
        })
    }

    /// Queue a high-priority re-run for an existing document.
    ///
    /// The stored result row is overwritten wholesale when the new run
    /// completes; until then the old result keeps serving status queries.
    pub async fn trigger_reprocess(&self, document_id: Uuid) -> Result<Job> {
        let document = self
            .documents
            .find(document_id)
            .await?
            .with_context(|| format!("no document with id {document_id}"))?;

        let job = self
            .queue
            .enqueue(document.id, JobType::Reprocessing, PRIORITY_HIGH)
            .await?;

        info!(document_id = %document.id, job_id = %job.id, "reprocess queued");
        Ok(job)
    }
}

/// Join page text for hashing. The form feed keeps page boundaries part of
/// the hashed content, so repaginated text hashes differently.
fn joined_pages(pages: &[String]) -> String {
    pages.join("\u{c}")
}
