//! LLM prompts for the revenue extraction pipeline.
//!
//! These prompts are designed for evidence-grounded extraction: every
//! reported amount must cite the page and quote that backs it.

use sha2::{Digest, Sha256};

use crate::context::RunContext;
use crate::types::Therapy;

/// Prompt for classifying a document from its opening pages.
pub const CLASSIFY_PROMPT: &str = r#"Classify this document from its opening pages.

Document context: {document_context}

Opening pages:
{sample}

Determine:
1. What kind of document this is
2. Which company it belongs to, if named
3. Which reporting period it covers, if named

Output JSON:
{
    "report_type": "quarterly report" | "annual report" | "clinical study" | "regulatory filing" | "press release" | "other",
    "company_name": "company name or null",
    "reporting_period": "e.g. 'Q3 2024' or '2024', or null"
}"#;

/// Prompt for mapping the section structure of a document.
pub const STRUCTURE_PROMPT: &str = r#"Map the section structure of this document.

Document context: {document_context}

Document text with page markers:
{text}

Identify the titled sections a reader would find in the table of contents or
as headings. For each section report its title, the page it starts on, the
page it ends on (null if it runs to the end of the document), and its kind.

Kinds:
- financial: statements, revenue tables, financial review
- clinical: trial results, study data
- regulatory: approvals, filings, compliance
- pipeline: development programs, upcoming candidates
- business: segment commentary, market discussion, outlook
- other: anything else

Output JSON:
{
    "has_explicit_structure": true | false,
    "sections": [
        {
            "title": "Section title",
            "page_start": 1,
            "page_end": 5,
            "kind": "financial",
            "confidence": 0-100
        }
    ]
}

If the document has no usable headings, output has_explicit_structure: false
with an empty sections array."#;

/// Prompt for verifying that a snippet carries revenue data.
pub const VERIFY_PROMPT: &str = r#"Does this text contain actual revenue data for {therapy_name}?

Document context: {document_context}

Text:
{snippet}

Actual revenue data means reported amounts: sales figures, revenue line
items, product revenue tables. Mentions of {therapy_name} or the word
"revenue" without figures, forward-looking statements, and risk-factor
boilerplate do not count.

Output JSON:
{
    "contains_revenue_data": true | false,
    "confidence": 0-100,
    "reasoning": "one sentence on what decided the verdict"
}"#;

/// Prompt for extracting revenue figures from a snippet.
pub const EXTRACT_REVENUE_PROMPT: &str = r#"Extract therapy revenue figures from this text.

Document context: {document_context}

Known therapies for this company:
{therapies}

Text:
{snippet}

Rules:
1. Report one record per therapy, per period, per region
2. Convert every amount to millions of USD
3. Normalize periods ("third quarter" -> "Q3 2024"; use the document
   context when the text omits the year)
4. Use "Worldwide" when no region is stated
5. For EVERY record, cite the page and exact quote that backs the amount,
   formatted as: Page <n>: "<quote>"
6. Only report amounts the text actually states. Never estimate.

Output JSON:
{
    "records": [
        {
            "therapy_name": "name",
            "period": "Q3 2024",
            "region": "United States",
            "revenue_millions_usd": 120.5,
            "sources": ["Page 6: \"quote backing the amount\""]
        }
    ],
    "confidence": 0-100
}"#;

/// Prompt for extracting revenue hidden in business commentary.
pub const EXTRACT_BUSINESS_PROMPT: &str = r#"Extract therapy revenue figures from this business commentary.

Document context: {document_context}

Known therapies for this company:
{therapies}

Text:
{snippet}

This text is segment or market commentary, so figures may appear in prose
rather than tables ("sales of X grew 12% to $340 million"). Apply the same
rules as for tabular data:
1. Report one record per therapy, per period, per region
2. Convert every amount to millions of USD
3. Normalize periods; use the document context when the text omits the year
4. Use "Worldwide" when no region is stated
5. For EVERY record, cite the page and exact quote, formatted as:
   Page <n>: "<quote>"
6. Only report stated amounts. Growth percentages without a base figure are
   not extractable.

Output JSON:
{
    "records": [
        {
            "therapy_name": "name",
            "period": "Q3 2024",
            "region": "Worldwide",
            "revenue_millions_usd": 340.0,
            "sources": ["Page 12: \"sales of X grew 12% to $340 million\""]
        }
    ],
    "confidence": 0-100
}"#;

/// Generate a hash of the extraction prompt for result provenance.
pub fn extraction_prompt_hash() -> String {
    let mut hasher = Sha256::new();
    hasher.update(EXTRACT_REVENUE_PROMPT.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Format the classification prompt.
pub fn format_classify_prompt(ctx: &RunContext, sample: &str) -> String {
    CLASSIFY_PROMPT
        .replace("{document_context}", &ctx.document_context)
        .replace("{sample}", sample)
}

/// Format the structure prompt with page-marked text.
pub fn format_structure_prompt(ctx: &RunContext, text: &str) -> String {
    STRUCTURE_PROMPT
        .replace("{document_context}", &ctx.document_context)
        .replace("{text}", text)
}

/// Format the verification prompt for one therapy's snippet.
pub fn format_verify_prompt(ctx: &RunContext, snippet: &str, therapy_name: &str) -> String {
    VERIFY_PROMPT
        .replace("{document_context}", &ctx.document_context)
        .replace("{therapy_name}", therapy_name)
        .replace("{snippet}", snippet)
}

/// Format an extraction prompt with the therapy scope.
pub fn format_extract_prompt(
    template: &str,
    ctx: &RunContext,
    snippet: &str,
    therapies: &[Therapy],
) -> String {
    let therapies_text = if therapies.is_empty() {
        "(none registered; report any therapy-level revenue you find)".to_string()
    } else {
        therapies
            .iter()
            .map(|t| format!("- {} ({})", t.name, t.manufacturer))
            .collect::<Vec<_>>()
            .join("\n")
    };

    template
        .replace("{document_context}", &ctx.document_context)
        .replace("{therapies}", &therapies_text)
        .replace("{snippet}", snippet)
}
