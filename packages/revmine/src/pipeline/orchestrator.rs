//! The Orchestrator - main entry point for the extraction library.
//!
//! Drives one document through the fixed phase sequence: classify, look up
//! therapies, analyze structure, pick a strategy, cut sections, run both
//! extraction tracks concurrently, reconcile. The strategy only changes how
//! much work each track receives; the execution graph itself never changes
//! shape, so there are no dead branches to reason about.

use futures::future::join;
use tracing::{debug, info};
use uuid::Uuid;

use crate::context::RunContext;
use crate::error::{PipelineError, Result};
use crate::pipeline::keyword::keyword_sections;
use crate::pipeline::reconcile::reconcile;
use crate::pipeline::routing::{route_structure_sections, RoutedSections};
use crate::pipeline::sections::{detect_overlaps, structure_sections};
use crate::pipeline::strategy::{determine_strategy, ExtractionStrategy};
use crate::pipeline::tracks::{run_business_track, run_revenue_track};
use crate::traits::{ClassifyResponse, DocumentAi, TherapyLookup};
use crate::types::{
    Document, KeywordSections, PageIndexedText, PipelineConfig, ReconciledResult, SectionKind,
    SectionOverlap, StructureSections, TextSection, TokenUsage,
};

/// Everything one pipeline run produced.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub run_id: Uuid,

    /// The reconciled revenue facts
    pub result: ReconciledResult,

    /// Strategy the run executed under
    pub strategy: ExtractionStrategy,

    /// Token spend across all phases
    pub usage: TokenUsage,

    /// Classification output, echoed for persistence
    pub report_type: Option<String>,
    pub company_name: Option<String>,
    pub reporting_period: Option<String>,

    /// Page collisions between keyword windows and outline sections
    pub overlaps: Vec<SectionOverlap>,
}

/// The main entry point - runs the extraction pipeline over one document.
///
/// # Example
///
/// ```rust,ignore
/// let orchestrator = Orchestrator::new(ai, therapies);
/// let outcome = orchestrator.process(&document, &text).await?;
/// println!("{} records", outcome.result.records.len());
/// ```
pub struct Orchestrator<A: DocumentAi, T: TherapyLookup> {
    ai: A,
    therapies: T,
    config: PipelineConfig,
}

impl<A: DocumentAi, T: TherapyLookup> Orchestrator<A, T> {
    /// Create a new orchestrator with default configuration.
    pub fn new(ai: A, therapies: T) -> Self {
        Self {
            ai,
            therapies,
            config: PipelineConfig::default(),
        }
    }

    /// Create with custom configuration.
    pub fn with_config(ai: A, therapies: T, config: PipelineConfig) -> Self {
        Self {
            ai,
            therapies,
            config,
        }
    }

    /// Get a reference to the configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the full pipeline over one document.
    ///
    /// Phase-level failures (classification, therapy lookup, structure
    /// analysis, empty reconciliation) propagate and fail the run.
    /// Snippet-level failures were already absorbed inside the tracks.
    pub async fn process(
        &self,
        document: &Document,
        text: &PageIndexedText,
    ) -> Result<PipelineOutcome> {
        if text.is_empty() {
            return Err(PipelineError::EmptyDocument);
        }

        let mut ctx = RunContext::for_document(document);
        let mut usage = TokenUsage::default();

        // Classify from the opening pages.
        let sample = text.first_pages(self.config.classify_pages);
        let classification = self.ai.classify(&ctx, &sample).await?;
        usage.add(TokenUsage::classification(classification.tokens_used));
        ctx.document_context = context_line(document, &classification);
        debug!(
            run_id = %ctx.run_id,
            report_type = %classification.report_type,
            company = classification.company_name.as_deref().unwrap_or("unknown"),
            "Document classified"
        );

        // Resolve the therapy vocabulary. A known company with nothing
        // registered is fatal: extraction has no target names and the
        // condition will recur on every retry.
        let company = classification
            .company_name
            .clone()
            .or_else(|| document.company_name.clone());
        let therapies = match &company {
            Some(name) => {
                let found = self.therapies.therapies_for_company(name).await?;
                if found.is_empty() {
                    return Err(PipelineError::NoRegisteredTherapies {
                        company: name.clone(),
                    });
                }
                found
            }
            None => Vec::new(),
        };

        // Map the document structure.
        let structure_response = self.ai.analyze_structure(&ctx, text).await?;
        usage.add(TokenUsage::structure(structure_response.tokens_used));
        let structure = structure_response.structure;
        let has_structure = structure.has_explicit_structure && !structure.sections.is_empty();

        let strategy = determine_strategy(
            text.page_count(),
            has_structure,
            !therapies.is_empty(),
            &self.config,
        );
        info!(
            run_id = %ctx.run_id,
            strategy = %strategy,
            pages = text.page_count(),
            therapies = therapies.len(),
            "Extraction strategy determined"
        );

        // Cut sections according to the strategy.
        let structure_buckets: StructureSections = match strategy {
            ExtractionStrategy::SmartComplete => whole_document_bucket(text),
            ExtractionStrategy::FullParallel | ExtractionStrategy::StructureOnly => {
                structure_sections(text, &structure)
            }
            ExtractionStrategy::Hybrid => StructureSections::new(),
        };

        let keyword_map: KeywordSections = match strategy {
            ExtractionStrategy::StructureOnly => KeywordSections::new(),
            _ => {
                let terms: Vec<String> = therapies.iter().map(|t| t.name.clone()).collect();
                keyword_sections(text, &terms, self.config.context_pages)
            }
        };

        let overlaps = detect_overlaps(&keyword_map, &structure_buckets);
        if !overlaps.is_empty() {
            debug!(
                run_id = %ctx.run_id,
                overlaps = overlaps.len(),
                "Keyword windows overlap outline sections"
            );
        }

        let routed: RoutedSections = route_structure_sections(structure_buckets);
        let keyword_snippets: Vec<TextSection> =
            keyword_map.into_values().flatten().collect();

        // Both tracks always run; an empty track completes immediately.
        let (revenue_output, business_output) = join(
            run_revenue_track(
                &self.ai,
                &ctx,
                &self.config,
                &therapies,
                &routed.revenue,
                &keyword_snippets,
            ),
            run_business_track(&self.ai, &ctx, &therapies, &routed.business_insight),
        )
        .await;

        let mut track_usage = revenue_output.usage;
        track_usage.merge_parallel(business_output.usage);
        usage.add(track_usage);

        let mut results = revenue_output.results;
        results.extend(business_output.results);

        let result = reconcile(&results, self.config.amount_epsilon)?;
        info!(
            run_id = %ctx.run_id,
            records = result.records.len(),
            confidence = result.confidence,
            tokens = usage.total(),
            "Reconciliation complete"
        );

        Ok(PipelineOutcome {
            run_id: ctx.run_id,
            result,
            strategy,
            usage,
            report_type: none_if_other(classification.report_type),
            company_name: company,
            reporting_period: classification.reporting_period,
            overlaps,
        })
    }
}

/// One snippet covering the whole document, for small documents not worth
/// splitting. Typed financial so it rides the revenue track.
fn whole_document_bucket(text: &PageIndexedText) -> StructureSections {
    let pages: Vec<u32> = (1..=text.page_count()).collect();
    let mut buckets = StructureSections::new();
    buckets.insert(
        SectionKind::Financial,
        vec![TextSection::for_structure(
            text.full_text(),
            pages,
            "Complete document",
        )],
    );
    buckets
}

/// Context line for prompts, preferring freshly classified fields over
/// whatever intake recorded.
fn context_line(document: &Document, classification: &ClassifyResponse) -> String {
    let company = classification
        .company_name
        .as_deref()
        .or(document.company_name.as_deref());
    let report_type = none_if_other(classification.report_type.clone())
        .or_else(|| document.report_type.clone());
    let period = classification
        .reporting_period
        .as_deref()
        .map(str::to_string)
        .or_else(|| document.reporting_period.clone());

    let parts: Vec<String> = [
        company.map(str::to_string),
        report_type,
        period,
    ]
    .into_iter()
    .flatten()
    .collect();

    if parts.is_empty() {
        document.file_name.clone()
    } else {
        parts.join(" - ")
    }
}

/// Classifier answers "other" when it cannot tell; treat that as absent.
fn none_if_other(report_type: String) -> Option<String> {
    if report_type.trim().is_empty() || report_type.eq_ignore_ascii_case("other") {
        None
    } else {
        Some(report_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockAi, MockTherapies};
    use crate::types::{
        DocumentStructure, ExtractionResult, RevenueRecord, StructureSection, Therapy,
    };

    fn document() -> Document {
        Document::new("file:///tmp/q3.pdf", "q3.pdf", b"bytes").with_company_name("Acme Bio")
    }

    fn pages(n: u32, marker: &str) -> PageIndexedText {
        PageIndexedText::new(
            (1..=n)
                .map(|p| format!("Page {p} body. {marker}"))
                .collect(),
        )
    }

    fn acme_therapies() -> MockTherapies {
        MockTherapies::new().with_company(
            "Acme Bio",
            vec![Therapy::new("Acmezumab", "Acme Bio")],
        )
    }

    fn record(amount: f64) -> RevenueRecord {
        RevenueRecord {
            therapy_name: "Acmezumab".to_string(),
            period: "Q3 2024".to_string(),
            region: "Worldwide".to_string(),
            revenue_millions_usd: amount,
            sources: vec!["Page 1: \"revenue\"".to_string()],
        }
    }

    #[tokio::test]
    async fn test_empty_document_is_rejected_up_front() {
        let orchestrator = Orchestrator::new(MockAi::new(), MockTherapies::new());
        let err = orchestrator
            .process(&document(), &PageIndexedText::new(Vec::<String>::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::EmptyDocument));
    }

    #[tokio::test]
    async fn test_small_documents_run_smart_complete() {
        let ai = MockAi::new();
        ai.script_classification(
            "Page 1 body",
            "quarterly report",
            Some("Acme Bio"),
            Some("Q3 2024"),
        );
        ai.script_extraction(
            "Page 1 body",
            ExtractionResult::new(vec![record(120.0)], 80),
        );

        let orchestrator = Orchestrator::new(ai, acme_therapies());
        let outcome = orchestrator
            .process(&document(), &pages(5, "Acmezumab"))
            .await
            .unwrap();

        assert_eq!(outcome.strategy, ExtractionStrategy::SmartComplete);
        assert_eq!(outcome.result.records.len(), 1);
        assert_eq!(outcome.company_name.as_deref(), Some("Acme Bio"));
        assert_eq!(outcome.reporting_period.as_deref(), Some("Q3 2024"));
    }

    #[tokio::test]
    async fn test_known_company_without_therapies_is_fatal() {
        let ai = MockAi::new();
        ai.script_classification("Page 1 body", "annual report", Some("Ghost Pharma"), None);

        let orchestrator = Orchestrator::new(ai, MockTherapies::new());
        let err = orchestrator
            .process(&document(), &pages(5, "text"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::NoRegisteredTherapies { ref company } if company == "Ghost Pharma"
        ));
    }

    #[tokio::test]
    async fn test_classification_failure_fails_the_run() {
        let ai = MockAi::new();
        ai.fail_classification("Page 1 body");

        let orchestrator = Orchestrator::new(ai, acme_therapies());
        let err = orchestrator
            .process(&document(), &pages(5, "text"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Classification(_)));
    }

    #[tokio::test]
    async fn test_structured_document_routes_business_sections() {
        let ai = MockAi::new();
        ai.script_classification("Page 1 body", "annual report", Some("Acme Bio"), Some("2024"));
        ai.script_structure(
            "Page 1 body",
            DocumentStructure {
                has_explicit_structure: true,
                sections: vec![
                    StructureSection {
                        title: "Financial Statements".to_string(),
                        page_start: 1,
                        page_end: Some(10),
                        kind: SectionKind::Financial,
                        confidence: 95,
                    },
                    StructureSection {
                        title: "Market Overview".to_string(),
                        page_start: 11,
                        page_end: Some(20),
                        kind: SectionKind::Business,
                        confidence: 90,
                    },
                ],
            },
        );
        // "Page 1 body" only matches the financial section: the business
        // section starts at page 11 and "Page 11 body" is not a match.
        ai.script_extraction(
            "Page 1 body",
            ExtractionResult::new(vec![record(120.0)], 80),
        );
        ai.script_extraction(
            "Page 11 body",
            ExtractionResult::new(vec![record(121.0)], 60),
        );

        let orchestrator = Orchestrator::new(ai, acme_therapies());
        let outcome = orchestrator
            .process(&document(), &pages(20, "filler"))
            .await
            .unwrap();

        assert_eq!(outcome.strategy, ExtractionStrategy::FullParallel);

        // One call per routed section; the business section used the
        // business-insight prompt flavor.
        let calls = orchestrator.ai.extraction_calls();
        assert_eq!(calls.len(), 2);
        assert!(calls
            .iter()
            .any(|c| c.focus == crate::traits::ExtractionFocus::BusinessInsight));

        // Conflicting amounts within both tracks reconcile to one record
        assert_eq!(outcome.result.records.len(), 1);
    }

    #[tokio::test]
    async fn test_hybrid_without_vocabulary_has_nothing_to_reconcile() {
        // No classification scripted: company stays unknown and document
        // metadata is empty, so no therapy lookup happens. The keyword
        // track then has no search terms and reconciliation gets nothing.
        let plain = Document::new("file:///tmp/misc.pdf", "misc.pdf", b"bytes");
        let orchestrator = Orchestrator::new(MockAi::new(), MockTherapies::new());
        let err = orchestrator
            .process(&plain, &pages(20, "Acmezumab"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::NothingToReconcile));
    }

    #[tokio::test]
    async fn test_token_usage_accumulates_across_phases() {
        let ai = MockAi::new().with_tokens_per_call(10);
        ai.script_classification("Page 1 body", "quarterly report", Some("Acme Bio"), None);

        let orchestrator = Orchestrator::new(ai, acme_therapies());
        let outcome = orchestrator
            .process(&document(), &pages(5, "Acmezumab"))
            .await
            .unwrap();

        assert_eq!(outcome.usage.classification, 10);
        assert_eq!(outcome.usage.structure, 10);
        // Smart-complete: one whole-document extraction plus the keyword
        // window work for the single therapy term.
        assert!(outcome.usage.extraction >= 10);
        assert_eq!(
            outcome.usage.total(),
            20 + outcome.usage.extraction
        );
    }
}
