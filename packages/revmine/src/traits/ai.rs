//! AI trait for LLM operations.
//!
//! The DocumentAi trait abstracts the LLM capabilities the pipeline needs:
//! - Classifying a document from its opening pages
//! - Mapping the section structure of a filing
//! - Verifying that a keyword snippet really carries revenue data
//! - Evidence-grounded revenue extraction from a snippet
//!
//! Every response carries the token count the call consumed so the
//! orchestrator can account for spend per phase.

use async_trait::async_trait;

use crate::context::RunContext;
use crate::error::Result;
use crate::types::{DocumentStructure, ExtractionResult, PageIndexedText, Therapy};

/// AI trait for LLM operations.
///
/// Implementations wrap specific LLM providers and handle the specifics of
/// prompting and response parsing. The pipeline only sees typed responses.
#[async_trait]
pub trait DocumentAi: Send + Sync {
    /// Classify a document from a sample of its opening pages.
    ///
    /// Returns the report type (quarterly report, annual report, clinical
    /// study, press release, ...) plus the company name and reporting
    /// period when the sample names them.
    async fn classify(&self, ctx: &RunContext, sample: &str) -> Result<ClassifyResponse>;

    /// Map the explicit section structure of a document.
    ///
    /// Returns the titled sections with their page ranges and a kind per
    /// section, or an unstructured marker when the document has no usable
    /// table of contents or headings.
    async fn analyze_structure(
        &self,
        ctx: &RunContext,
        text: &PageIndexedText,
    ) -> Result<StructureResponse>;

    /// Check whether a keyword snippet actually contains revenue data for
    /// the therapy whose match produced it.
    ///
    /// Keyword hits are cheap and noisy; this call gates the expensive
    /// extraction behind a yes/no with a confidence score and a one-line
    /// reasoning for the operator log.
    async fn verify_revenue(
        &self,
        ctx: &RunContext,
        snippet: &str,
        therapy_name: &str,
    ) -> Result<VerifyResponse>;

    /// Extract revenue facts from a snippet, scoped to known therapies.
    ///
    /// Every returned record cites the pages and quotes backing it. The
    /// focus selects the prompt flavor: plain revenue figures or the
    /// segment commentary found in business sections.
    async fn extract_revenue(
        &self,
        ctx: &RunContext,
        snippet: &str,
        therapies: &[Therapy],
        focus: ExtractionFocus,
    ) -> Result<ExtractResponse>;
}

/// Prompt flavor for an extraction call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionFocus {
    /// Straight revenue figures: tables, statements, line items
    Revenue,

    /// Segment and business commentary where figures hide in prose
    BusinessInsight,
}

impl Default for ExtractionFocus {
    fn default() -> Self {
        Self::Revenue
    }
}

/// Response from document classification.
#[derive(Debug, Clone)]
pub struct ClassifyResponse {
    /// Report type label, e.g. "quarterly report"
    pub report_type: String,

    /// Company the document belongs to, when named in the sample
    pub company_name: Option<String>,

    /// Reporting period, when named in the sample, e.g. "Q3 2024"
    pub reporting_period: Option<String>,

    /// Tokens consumed by the call
    pub tokens_used: u64,
}

/// Response from structure analysis.
#[derive(Debug, Clone)]
pub struct StructureResponse {
    pub structure: DocumentStructure,
    pub tokens_used: u64,
}

/// Response from snippet verification.
#[derive(Debug, Clone)]
pub struct VerifyResponse {
    /// Whether the snippet carries actual revenue data
    pub contains_revenue_data: bool,

    /// Confidence in the judgment, 0-100
    pub confidence: u8,

    /// One-line explanation of the verdict, surfaced in gate logs
    pub reasoning: String,

    pub tokens_used: u64,
}

impl VerifyResponse {
    /// Whether the snippet clears the extraction bar.
    pub fn passes(&self, min_confidence: u8) -> bool {
        self.contains_revenue_data && self.confidence >= min_confidence
    }
}

/// Response from revenue extraction.
#[derive(Debug, Clone)]
pub struct ExtractResponse {
    pub result: ExtractionResult,
    pub tokens_used: u64,
}
