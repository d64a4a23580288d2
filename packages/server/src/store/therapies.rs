//! Therapy registry backing the pipeline's vocabulary lookups.

use anyhow::Result;
use async_trait::async_trait;
use revmine::{PipelineError, Therapy, TherapyLookup};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// One row in the `therapies` table.
#[derive(Debug, Clone, FromRow)]
pub struct TherapyRow {
    pub id: Uuid,
    pub name: String,
    pub manufacturer: String,
}

/// Postgres-backed therapy registry. Implements the pipeline's
/// [`TherapyLookup`] so workers can resolve vocabularies straight from the
/// database.
#[derive(Clone)]
pub struct TherapyStore {
    pool: PgPool,
}

impl TherapyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Register a therapy for a company. Idempotent on (name, manufacturer).
    pub async fn register(&self, name: &str, manufacturer: &str) -> Result<TherapyRow> {
        let row = sqlx::query_as::<_, TherapyRow>(
            r#"
            INSERT INTO therapies (id, name, manufacturer)
            VALUES ($1, $2, $3)
            ON CONFLICT (name, manufacturer) DO UPDATE SET name = EXCLUDED.name
            RETURNING id, name, manufacturer
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(manufacturer)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    /// All therapies registered for a company, matched case-insensitively.
    pub async fn for_company(&self, company: &str) -> Result<Vec<TherapyRow>> {
        let rows = sqlx::query_as::<_, TherapyRow>(
            r#"
            SELECT id, name, manufacturer
            FROM therapies
            WHERE LOWER(manufacturer) = LOWER($1)
            ORDER BY name
            "#,
        )
        .bind(company)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[async_trait]
impl TherapyLookup for TherapyStore {
    async fn therapies_for_company(&self, company: &str) -> revmine::Result<Vec<Therapy>> {
        let rows = self
            .for_company(company)
            .await
            .map_err(|e| PipelineError::TherapyLookup(e.into()))?;

        Ok(rows
            .into_iter()
            .map(|row| Therapy {
                id: row.id,
                name: row.name,
                manufacturer: row.manufacturer,
            })
            .collect())
    }
}
