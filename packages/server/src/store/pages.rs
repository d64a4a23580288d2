//! Per-page text storage.

use anyhow::Result;
use revmine::PageIndexedText;
use sqlx::PgPool;
use uuid::Uuid;

/// Stores the page-split text of converted documents.
#[derive(Clone)]
pub struct PageStore {
    pool: PgPool,
}

impl PageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Replace all pages for a document in one transaction.
    pub async fn replace(&self, document_id: Uuid, pages: &[String]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM document_pages WHERE document_id = $1")
            .bind(document_id)
            .execute(&mut *tx)
            .await?;

        for (index, content) in pages.iter().enumerate() {
            sqlx::query(
                "INSERT INTO document_pages (document_id, page_number, content) VALUES ($1, $2, $3)",
            )
            .bind(document_id)
            .bind(index as i32 + 1)
            .bind(content)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Load a document's text in page order.
    pub async fn load(&self, document_id: Uuid) -> Result<PageIndexedText> {
        let pages: Vec<String> = sqlx::query_scalar(
            "SELECT content FROM document_pages WHERE document_id = $1 ORDER BY page_number",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(PageIndexedText::new(pages))
    }
}
