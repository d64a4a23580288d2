//! Postgres persistence: documents, page text, therapies, and results.

mod documents;
mod pages;
mod results;
mod therapies;

pub use documents::{backfill_classification, DocumentRow, DocumentStore};
pub use pages::PageStore;
pub use results::{upsert_result, ResultsStore, StoredResult};
pub use therapies::{TherapyRow, TherapyStore};

use anyhow::Result;
use sqlx::PgPool;

/// Create the schema if it does not exist yet. Safe to run on every boot.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    // CREATE TYPE has no IF NOT EXISTS; the DO block swallows the
    // duplicate_object error on re-runs.
    sqlx::query(
        r#"
        DO $$ BEGIN
            CREATE TYPE job_status AS ENUM ('pending', 'processing', 'completed', 'failed');
        EXCEPTION WHEN duplicate_object THEN NULL;
        END $$
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        DO $$ BEGIN
            CREATE TYPE job_type AS ENUM ('extraction', 'reprocessing');
        EXCEPTION WHEN duplicate_object THEN NULL;
        END $$
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id UUID PRIMARY KEY,
            file_location TEXT NOT NULL,
            file_name TEXT NOT NULL,
            content_hash TEXT NOT NULL UNIQUE,
            company_name TEXT,
            report_type TEXT,
            reporting_period TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS document_pages (
            document_id UUID NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
            page_number INT NOT NULL CHECK (page_number >= 1),
            content TEXT NOT NULL,
            PRIMARY KEY (document_id, page_number)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS therapies (
            id UUID PRIMARY KEY,
            name TEXT NOT NULL,
            manufacturer TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            UNIQUE (name, manufacturer)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS jobs (
            id UUID PRIMARY KEY,
            document_id UUID NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
            job_type job_type NOT NULL,
            priority SMALLINT NOT NULL DEFAULT 2,
            status job_status NOT NULL DEFAULT 'pending',
            attempts INT NOT NULL DEFAULT 0,
            max_attempts INT NOT NULL DEFAULT 3,
            last_error TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            started_at TIMESTAMPTZ,
            completed_at TIMESTAMPTZ
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS extraction_results (
            document_id UUID PRIMARY KEY REFERENCES documents(id) ON DELETE CASCADE,
            run_id UUID NOT NULL,
            records JSONB NOT NULL,
            confidence SMALLINT NOT NULL,
            citations JSONB NOT NULL,
            strategy TEXT NOT NULL,
            tokens_used BIGINT NOT NULL DEFAULT 0,
            completed_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_jobs_lease ON jobs (status, priority, created_at)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_therapies_manufacturer ON therapies (LOWER(manufacturer))",
    )
    .execute(pool)
    .await?;

    Ok(())
}
