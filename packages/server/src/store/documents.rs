//! Document rows and classification backfill.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// One row in the `documents` table.
///
/// Immutable after insert except for the classification metadata, which the
/// worker backfills after the first successful run.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DocumentRow {
    pub id: Uuid,
    pub file_location: String,
    pub file_name: String,

    /// SHA-256 of the submitted page text; duplicate-submission key
    pub content_hash: String,

    pub company_name: Option<String>,
    pub report_type: Option<String>,
    pub reporting_period: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl DocumentRow {
    /// Rebuild the pipeline's document value from this row.
    pub fn to_document(&self) -> revmine::Document {
        revmine::Document {
            id: self.id,
            file_location: self.file_location.clone(),
            file_name: self.file_name.clone(),
            content_hash: self.content_hash.clone(),
            company_name: self.company_name.clone(),
            report_type: self.report_type.clone(),
            reporting_period: self.reporting_period.clone(),
            created_at: self.created_at,
        }
    }
}

/// Handle to the `documents` table.
#[derive(Clone)]
pub struct DocumentStore {
    pool: PgPool,
}

impl DocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a document row. Errors on a duplicate content hash; dedup
    /// flows check [`find_by_hash`](Self::find_by_hash) first.
    pub async fn insert(
        &self,
        file_location: &str,
        file_name: &str,
        content_hash: &str,
        company_name: Option<&str>,
    ) -> Result<DocumentRow> {
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            INSERT INTO documents (id, file_location, file_name, content_hash, company_name)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(file_location)
        .bind(file_name)
        .bind(content_hash)
        .bind(company_name)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<DocumentRow>> {
        let row = sqlx::query_as::<_, DocumentRow>("SELECT * FROM documents WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    pub async fn find_by_hash(&self, content_hash: &str) -> Result<Option<DocumentRow>> {
        let row =
            sqlx::query_as::<_, DocumentRow>("SELECT * FROM documents WHERE content_hash = $1")
                .bind(content_hash)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row)
    }
}

/// Write classification metadata onto the document row.
///
/// Fills in only what the run actually produced; a `None` keeps whatever
/// value is already there.
pub async fn backfill_classification(
    executor: impl sqlx::PgExecutor<'_>,
    document_id: Uuid,
    report_type: Option<&str>,
    company_name: Option<&str>,
    reporting_period: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE documents
        SET report_type = COALESCE($2, report_type),
            company_name = COALESCE($3, company_name),
            reporting_period = COALESCE($4, reporting_period)
        WHERE id = $1
        "#,
    )
    .bind(document_id)
    .bind(report_type)
    .bind(company_name)
    .bind(reporting_period)
    .execute(executor)
    .await?;

    Ok(())
}
