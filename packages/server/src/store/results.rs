//! Stored pipeline outcomes, one row per document.

use anyhow::Result;
use chrono::{DateTime, Utc};
use revmine::{PipelineOutcome, RevenueRecord, SourceCitation};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// The persisted result of the latest successful run for a document.
///
/// Records and citations are JSONB snapshots of the reconciled output;
/// reprocessing overwrites the whole row.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StoredResult {
    pub document_id: Uuid,
    pub run_id: Uuid,
    pub records: serde_json::Value,
    pub confidence: i16,
    pub citations: serde_json::Value,
    pub strategy: String,
    pub tokens_used: i64,
    pub completed_at: DateTime<Utc>,
}

impl StoredResult {
    /// Deserialize the revenue records.
    pub fn records(&self) -> Result<Vec<RevenueRecord>> {
        Ok(serde_json::from_value(self.records.clone())?)
    }

    /// Deserialize the source citations.
    pub fn citations(&self) -> Result<Vec<SourceCitation>> {
        Ok(serde_json::from_value(self.citations.clone())?)
    }
}

/// Handle to the `extraction_results` table.
#[derive(Clone)]
pub struct ResultsStore {
    pool: PgPool,
}

impl ResultsStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find(&self, document_id: Uuid) -> Result<Option<StoredResult>> {
        let row = sqlx::query_as::<_, StoredResult>(
            "SELECT * FROM extraction_results WHERE document_id = $1",
        )
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn upsert(&self, document_id: Uuid, outcome: &PipelineOutcome) -> Result<()> {
        upsert_result(&self.pool, document_id, outcome).await
    }
}

/// Write (or overwrite) the stored result for a document.
///
/// Takes an executor so the write can share a transaction with the job
/// completion that fences it.
pub async fn upsert_result(
    executor: impl sqlx::PgExecutor<'_>,
    document_id: Uuid,
    outcome: &PipelineOutcome,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO extraction_results
            (document_id, run_id, records, confidence, citations, strategy, tokens_used, completed_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
        ON CONFLICT (document_id) DO UPDATE SET
            run_id = EXCLUDED.run_id,
            records = EXCLUDED.records,
            confidence = EXCLUDED.confidence,
            citations = EXCLUDED.citations,
            strategy = EXCLUDED.strategy,
            tokens_used = EXCLUDED.tokens_used,
            completed_at = EXCLUDED.completed_at
        "#,
    )
    .bind(document_id)
    .bind(outcome.run_id)
    .bind(serde_json::to_value(&outcome.result.records)?)
    .bind(outcome.result.confidence as i16)
    .bind(serde_json::to_value(&outcome.result.citations)?)
    .bind(outcome.strategy.as_str())
    .bind(outcome.usage.total() as i64)
    .execute(executor)
    .await?;

    Ok(())
}
