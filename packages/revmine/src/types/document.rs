//! Document metadata and page-indexed text.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// A source filing registered with the system.
///
/// Immutable once created, except for the classification metadata
/// (`company_name`, `report_type`, `reporting_period`) which is backfilled
/// after the first successful classification pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier
    pub id: Uuid,

    /// Where the source file lives (object storage key, path, URL)
    pub file_location: String,

    /// Original file name, for operator display
    pub file_name: String,

    /// SHA-256 of the raw file bytes; duplicate-upload key
    pub content_hash: String,

    /// Issuing company, once classified
    pub company_name: Option<String>,

    /// Report kind (annual report, 10-K, quarterly update, ...), once classified
    pub report_type: Option<String>,

    /// Reporting period (e.g. "Q3 2024" or "2024"), once classified
    pub reporting_period: Option<String>,

    /// When the document was registered
    pub created_at: DateTime<Utc>,
}

impl Document {
    /// Create a new document record, hashing the raw file bytes.
    pub fn new(
        file_location: impl Into<String>,
        file_name: impl Into<String>,
        content: &[u8],
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            file_location: file_location.into(),
            file_name: file_name.into(),
            content_hash: Self::hash_content(content),
            company_name: None,
            report_type: None,
            reporting_period: None,
            created_at: Utc::now(),
        }
    }

    /// Calculate the SHA-256 hash of raw file bytes.
    pub fn hash_content(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        format!("{:x}", hasher.finalize())
    }

    /// Set the company name.
    pub fn with_company_name(mut self, name: impl Into<String>) -> Self {
        self.company_name = Some(name.into());
        self
    }

    /// Free-text context handed to extraction calls so amounts can be
    /// attributed ("Acme Corp annual report 2024, FY2024").
    pub fn context_line(&self) -> String {
        let mut parts = Vec::new();
        if let Some(company) = &self.company_name {
            parts.push(company.clone());
        }
        if let Some(report) = &self.report_type {
            parts.push(report.clone());
        }
        if let Some(period) = &self.reporting_period {
            parts.push(period.clone());
        }
        if parts.is_empty() {
            self.file_name.clone()
        } else {
            parts.join(", ")
        }
    }
}

/// Raw page text for one document, indexed by 1-based page number.
///
/// Produced once per document by the PDF conversion collaborator and treated
/// as read-only input everywhere in the pipeline. Pages are contiguous by
/// construction: page `n` lives at vector index `n - 1`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageIndexedText {
    pages: Vec<String>,
}

impl PageIndexedText {
    /// Wrap per-page text in page order (element 0 is page 1).
    pub fn new(pages: Vec<String>) -> Self {
        Self { pages }
    }

    /// Number of pages.
    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    /// Text of a single page (1-based). Returns `None` outside `1..=page_count`.
    pub fn get(&self, page: u32) -> Option<&str> {
        if page == 0 {
            return None;
        }
        self.pages.get(page as usize - 1).map(String::as_str)
    }

    /// Iterate pages as `(page_number, text)` in order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.pages
            .iter()
            .enumerate()
            .map(|(i, text)| (i as u32 + 1, text.as_str()))
    }

    /// Concatenate the text of pages `start..=end` (clamped to document
    /// bounds) separated by blank lines.
    pub fn concat_range(&self, start: u32, end: u32) -> String {
        let last = self.page_count();
        if last == 0 || start > end {
            return String::new();
        }
        let start = start.max(1);
        let end = end.min(last);
        let mut out = Vec::with_capacity((end.saturating_sub(start) + 1) as usize);
        for page in start..=end {
            if let Some(text) = self.get(page) {
                out.push(text);
            }
        }
        out.join("\n\n")
    }

    /// Text of the first `n` pages, for classification.
    pub fn first_pages(&self, n: u32) -> String {
        self.concat_range(1, n)
    }

    /// Full document text.
    pub fn full_text(&self) -> String {
        self.concat_range(1, self.page_count())
    }

    /// Whether the document has any text at all.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_pages() -> PageIndexedText {
        PageIndexedText::new(vec!["one".into(), "two".into(), "three".into()])
    }

    #[test]
    fn test_pages_are_one_based() {
        let text = three_pages();
        assert_eq!(text.get(0), None);
        assert_eq!(text.get(1), Some("one"));
        assert_eq!(text.get(3), Some("three"));
        assert_eq!(text.get(4), None);
    }

    #[test]
    fn test_concat_range_clamps_to_bounds() {
        let text = three_pages();
        assert_eq!(text.concat_range(2, 99), "two\n\nthree");
        assert_eq!(text.concat_range(0, 1), "one");
        assert_eq!(text.concat_range(3, 2), "");
    }

    #[test]
    fn test_first_pages_takes_prefix() {
        let text = three_pages();
        assert_eq!(text.first_pages(2), "one\n\ntwo");
        assert_eq!(text.first_pages(10), text.full_text());
    }

    #[test]
    fn test_content_hash_is_hex_sha256() {
        let hash = Document::hash_content(b"report bytes");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, Document::hash_content(b"report bytes"));
    }

    #[test]
    fn test_context_line_prefers_classified_metadata() {
        let doc = Document::new("s3://bucket/report.pdf", "report.pdf", b"abc");
        assert_eq!(doc.context_line(), "report.pdf");

        let doc = doc.with_company_name("Acme Corp");
        assert_eq!(doc.context_line(), "Acme Corp");
    }
}
