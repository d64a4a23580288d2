//! Integration tests for the full extraction pipeline.
//!
//! These tests drive whole documents through the orchestrator:
//! 1. Classify the report and resolve the therapy vocabulary
//! 2. Analyze structure and pick a strategy
//! 3. Cut sections, verify keyword windows, extract both tracks
//! 4. Reconcile conflicting amounts into one cited result

use revmine::testing::{MockAi, MockTherapies};
use revmine::{
    Document, DocumentStructure, ExtractionResult, ExtractionStrategy, Orchestrator,
    PageIndexedText, PipelineError, RevenueRecord, SectionKind, StructureSection, Therapy,
};

/// Helper to build page text with a default body and targeted overrides.
fn narrative_pages(count: u32, overrides: &[(u32, &str)]) -> PageIndexedText {
    let pages = (1..=count)
        .map(|p| {
            overrides
                .iter()
                .find(|(page, _)| *page == p)
                .map(|(_, body)| (*body).to_string())
                .unwrap_or_else(|| format!("Routine narrative for page {p}."))
        })
        .collect();
    PageIndexedText::new(pages)
}

/// Helper for a document with no intake metadata.
fn plain_document() -> Document {
    Document::new("s3://reports/filing.pdf", "filing.pdf", b"pdf bytes")
}

/// Helper for the Helix Biosciences therapy catalog.
fn helix_catalog() -> MockTherapies {
    MockTherapies::new().with_company(
        "Helix Biosciences",
        vec![
            Therapy::new("Veloximab", "Helix Biosciences"),
            Therapy::new("Tryptarel", "Helix Biosciences"),
        ],
    )
}

fn helix_record(therapy: &str, amount: f64, source: &str) -> RevenueRecord {
    RevenueRecord {
        therapy_name: therapy.to_string(),
        period: "Q3 2024".to_string(),
        region: "Worldwide".to_string(),
        revenue_millions_usd: amount,
        sources: vec![source.to_string()],
    }
}

#[tokio::test]
async fn test_small_report_extracts_and_cites() {
    let ai = MockAi::new();
    ai.script_classification(
        "Quarterly Report",
        "quarterly report",
        Some("Helix Biosciences"),
        Some("Q3 2024"),
    );
    let mut record = helix_record(
        "Veloximab",
        120.0,
        "Page 2: \"Veloximab net sales were $120 million\"",
    );
    record.sources.push("Page 3 supplementary table".to_string());
    ai.script_extraction(
        "net sales were $120 million",
        ExtractionResult::new(vec![record], 80),
    );

    let text = narrative_pages(
        4,
        &[
            (1, "Helix Biosciences Quarterly Report for Q3 2024."),
            (2, "Veloximab net sales were $120 million this quarter."),
        ],
    );

    let orchestrator = Orchestrator::new(ai, helix_catalog());
    let outcome = orchestrator.process(&plain_document(), &text).await.unwrap();

    assert_eq!(outcome.strategy, ExtractionStrategy::SmartComplete);
    assert_eq!(outcome.report_type.as_deref(), Some("quarterly report"));
    assert_eq!(outcome.company_name.as_deref(), Some("Helix Biosciences"));
    assert_eq!(outcome.reporting_period.as_deref(), Some("Q3 2024"));

    // The whole-document pass and the Veloximab keyword window both return
    // the same fact; reconciliation folds them into one cited record.
    assert_eq!(outcome.result.records.len(), 1);
    let record = &outcome.result.records[0];
    assert_eq!(record.therapy_name, "Veloximab");
    assert_eq!(record.revenue_millions_usd, 120.0);
    assert_eq!(record.sources.len(), 2);
    assert_eq!(outcome.result.confidence, 80);

    let citations = &outcome.result.citations;
    assert_eq!(citations.len(), 2);
    assert_eq!(citations[0].page, 2);
    assert_eq!(citations[0].quote, "Veloximab net sales were $120 million");
    assert_eq!(citations[1].page, 3);
    assert_eq!(citations[1].quote, "supplementary table");
}

#[tokio::test]
async fn test_verification_gates_low_confidence_windows() {
    let ai = MockAi::new();
    ai.script_classification(
        "interim filing",
        "quarterly report",
        Some("Helix Biosciences"),
        Some("Q2 2024"),
    );
    ai.script_verification("net sales of $200 million", true, 90);
    ai.script_verification("enrollment update", true, 30);
    ai.script_extraction(
        "net sales of $200 million",
        ExtractionResult::new(
            vec![helix_record("Veloximab", 200.0, "Page 5: \"net sales of $200 million\"")],
            85,
        ),
    );
    // If the gate ever let the low-confidence window through, this record
    // would show up in the output.
    ai.script_extraction(
        "enrollment update",
        ExtractionResult::new(
            vec![helix_record("Tryptarel", 999.0, "Page 15: \"should never appear\"")],
            95,
        ),
    );

    let text = narrative_pages(
        20,
        &[
            (1, "Helix Biosciences interim filing."),
            (5, "Veloximab posted net sales of $200 million."),
            (15, "Veloximab enrollment update with no figures."),
        ],
    );

    let orchestrator = Orchestrator::new(ai, helix_catalog());
    let outcome = orchestrator.process(&plain_document(), &text).await.unwrap();

    assert_eq!(outcome.strategy, ExtractionStrategy::Hybrid);
    assert_eq!(outcome.result.records.len(), 1);
    assert_eq!(outcome.result.records[0].therapy_name, "Veloximab");
    assert_eq!(outcome.result.records[0].revenue_millions_usd, 200.0);
    // Only the verified window contributed a result
    assert_eq!(outcome.result.confidence, 85);
}

#[tokio::test]
async fn test_conflicting_amounts_prefer_higher_confidence() {
    let ai = MockAi::new();
    ai.script_classification(
        "Annual Report",
        "annual report",
        Some("Helix Biosciences"),
        Some("2024"),
    );
    ai.script_structure(
        "Annual Report",
        DocumentStructure {
            has_explicit_structure: true,
            sections: vec![
                StructureSection {
                    title: "Consolidated Statements".to_string(),
                    page_start: 1,
                    page_end: Some(3),
                    kind: SectionKind::Financial,
                    confidence: 95,
                },
                StructureSection {
                    title: "Regional Detail".to_string(),
                    page_start: 10,
                    page_end: Some(12),
                    kind: SectionKind::Financial,
                    confidence: 90,
                },
            ],
        },
    );
    ai.script_extraction(
        "Consolidated results follow",
        ExtractionResult::new(
            vec![helix_record(
                "Veloximab",
                500.0,
                "Page 2: \"worldwide revenue was $500 million\"",
            )],
            70,
        ),
    );
    ai.script_extraction(
        "Regional revenue breakdown",
        ExtractionResult::new(
            vec![helix_record(
                "Veloximab",
                525.0,
                "Page 11: \"updated worldwide total of $525 million\"",
            )],
            90,
        ),
    );

    // Therapy names never appear in the body, so the keyword track is idle
    // and the two financial sections are the only extraction inputs.
    let text = narrative_pages(
        20,
        &[
            (1, "Helix Biosciences Annual Report 2024. Consolidated results follow."),
            (10, "Regional revenue breakdown begins here."),
        ],
    );

    let orchestrator = Orchestrator::new(ai, helix_catalog());
    let outcome = orchestrator.process(&plain_document(), &text).await.unwrap();

    assert_eq!(outcome.strategy, ExtractionStrategy::FullParallel);
    assert_eq!(outcome.result.records.len(), 1);

    let record = &outcome.result.records[0];
    assert_eq!(record.revenue_millions_usd, 525.0);
    // Sources from the displaced amount stay attached to the winner
    assert_eq!(record.sources.len(), 2);

    // Mean of the two extraction calls
    assert_eq!(outcome.result.confidence, 80);

    let pages: Vec<u32> = outcome.result.citations.iter().map(|c| c.page).collect();
    assert_eq!(pages, vec![2, 11]);
}

#[tokio::test]
async fn test_both_tracks_corroborating_fold_to_one_record() {
    let ai = MockAi::new();
    ai.script_classification(
        "combined filing",
        "quarterly report",
        Some("Helix Biosciences"),
        Some("Q3 2024"),
    );
    ai.script_structure(
        "combined filing",
        DocumentStructure {
            has_explicit_structure: true,
            sections: vec![StructureSection {
                title: "Financial Statements".to_string(),
                page_start: 5,
                page_end: Some(8),
                kind: SectionKind::Financial,
                confidence: 93,
            }],
        },
    );
    // Page 8 sits outside the keyword window, so this key only matches the
    // financial section snippet.
    ai.script_extraction(
        "Segment subtotal",
        ExtractionResult::new(
            vec![helix_record("Veloximab", 42.0, "Page 8: \"segment subtotal tables\"")],
            70,
        ),
    );
    // The keyword window carries emphasis markers around the therapy name,
    // so this key only matches the window snippet.
    ai.script_extraction(
        "**Veloximab** net sales",
        ExtractionResult::new(
            vec![helix_record("Veloximab", 42.0, "Page 6: \"net sales rose to $42 million\"")],
            90,
        ),
    );

    let text = narrative_pages(
        20,
        &[
            (1, "Helix Biosciences combined filing."),
            (6, "Veloximab net sales rose to $42 million."),
            (8, "Segment subtotal tables."),
        ],
    );

    let orchestrator = Orchestrator::new(ai, helix_catalog());
    let outcome = orchestrator.process(&plain_document(), &text).await.unwrap();

    assert_eq!(outcome.strategy, ExtractionStrategy::FullParallel);

    // Both tracks found the same fact: one record, each track's citation
    // kept, confidence averaged across the two calls.
    assert_eq!(outcome.result.records.len(), 1);
    let record = &outcome.result.records[0];
    assert_eq!(record.therapy_name, "Veloximab");
    assert_eq!(record.revenue_millions_usd, 42.0);
    assert_eq!(record.sources.len(), 2);
    assert_eq!(outcome.result.confidence, 80);

    let pages: Vec<u32> = outcome.result.citations.iter().map(|c| c.page).collect();
    assert_eq!(pages, vec![6, 8]);
}

#[tokio::test]
async fn test_failed_snippets_degrade_instead_of_failing() {
    let ai = MockAi::new();
    ai.script_classification(
        "royalty summary",
        "quarterly report",
        Some("Helix Biosciences"),
        None,
    );
    ai.script_extraction(
        "royalties reached",
        ExtractionResult::new(
            vec![helix_record("Veloximab", 80.0, "Page 3: \"royalties reached $80 million\"")],
            75,
        ),
    );
    ai.fail_extraction("supply agreement");

    let text = narrative_pages(
        20,
        &[
            (1, "Helix Biosciences royalty summary."),
            (3, "Veloximab royalties reached $80 million."),
            (17, "Veloximab supply agreement commentary."),
        ],
    );

    let orchestrator = Orchestrator::new(ai, helix_catalog());
    let outcome = orchestrator.process(&plain_document(), &text).await.unwrap();

    // One window errored mid-extraction; the run still completes on the
    // surviving window.
    assert_eq!(outcome.result.records.len(), 1);
    assert_eq!(outcome.result.records[0].revenue_millions_usd, 80.0);
    assert_eq!(outcome.result.confidence, 75);
}

#[tokio::test]
async fn test_structure_only_covers_unknown_companies() {
    let ai = MockAi::new();
    ai.script_structure(
        "financial digest",
        DocumentStructure {
            has_explicit_structure: true,
            sections: vec![
                StructureSection {
                    title: "Financial Digest".to_string(),
                    page_start: 1,
                    page_end: Some(2),
                    kind: SectionKind::Financial,
                    confidence: 90,
                },
                StructureSection {
                    title: "Strategic Outlook".to_string(),
                    page_start: 3,
                    page_end: Some(4),
                    kind: SectionKind::Business,
                    confidence: 85,
                },
            ],
        },
    );
    // Structure sections are pre-vetted by the outline and never pass
    // through verification; a blocking verdict here must have no effect.
    ai.script_verification("financial digest", false, 95);
    ai.script_extraction(
        "financial digest",
        ExtractionResult::new(
            vec![helix_record("Orphacept", 45.0, "Page 1: \"sector digest table\"")],
            80,
        ),
    );
    ai.script_extraction("Strategic outlook discussion", ExtractionResult::new(vec![], 60));

    let text = narrative_pages(
        16,
        &[
            (1, "Sector overview and financial digest."),
            (3, "Strategic outlook discussion of market segments."),
        ],
    );

    // Classification stays "other" with no company, so no therapy lookup
    // happens and the outline is the only way into the document.
    let orchestrator = Orchestrator::new(ai, MockTherapies::new());
    let outcome = orchestrator.process(&plain_document(), &text).await.unwrap();

    assert_eq!(outcome.strategy, ExtractionStrategy::StructureOnly);
    assert!(outcome.company_name.is_none());
    assert!(outcome.report_type.is_none());
    assert_eq!(outcome.result.records.len(), 1);
    assert_eq!(outcome.result.records[0].therapy_name, "Orphacept");
    // Mean over both section calls, including the empty business one
    assert_eq!(outcome.result.confidence, 70);
}

#[tokio::test]
async fn test_structure_phase_failure_fails_the_run() {
    let ai = MockAi::new();
    ai.fail_structure("Routine narrative");

    let orchestrator = Orchestrator::new(ai, MockTherapies::new());
    let err = orchestrator
        .process(&plain_document(), &narrative_pages(5, &[]))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::StructureAnalysis(_)));
}

#[tokio::test]
async fn test_therapy_catalog_failure_fails_the_run() {
    let ai = MockAi::new();
    ai.script_classification(
        "Routine narrative",
        "annual report",
        Some("Helix Biosciences"),
        None,
    );

    let orchestrator = Orchestrator::new(ai, helix_catalog().failing());
    let err = orchestrator
        .process(&plain_document(), &narrative_pages(5, &[]))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::TherapyLookup(_)));
}

#[tokio::test]
async fn test_keyword_windows_overlapping_sections_are_reported() {
    let ai = MockAi::new();
    ai.script_classification(
        "integrated report",
        "annual report",
        Some("Helix Biosciences"),
        Some("2024"),
    );
    ai.script_structure(
        "integrated report",
        DocumentStructure {
            has_explicit_structure: true,
            sections: vec![StructureSection {
                title: "Financials".to_string(),
                page_start: 1,
                page_end: Some(5),
                kind: SectionKind::Financial,
                confidence: 92,
            }],
        },
    );
    ai.script_extraction(
        "Veloximab trends upward",
        ExtractionResult::new(
            vec![helix_record("Veloximab", 310.0, "Page 2: \"trends upward\"")],
            80,
        ),
    );

    let text = narrative_pages(
        20,
        &[
            (1, "Helix Biosciences integrated report."),
            (2, "Veloximab trends upward."),
        ],
    );

    let orchestrator = Orchestrator::new(ai, helix_catalog());
    let outcome = orchestrator.process(&plain_document(), &text).await.unwrap();

    // The Veloximab window (pages 1-3) sits inside the financial section
    // (pages 1-5). Both still extract; the collision is only reported.
    assert_eq!(outcome.overlaps.len(), 1);
    assert_eq!(outcome.overlaps[0].therapy, "Veloximab");
    assert_eq!(outcome.overlaps[0].section_kind, SectionKind::Financial);
    assert_eq!(outcome.overlaps[0].pages, vec![1, 2, 3]);
    assert_eq!(outcome.result.records.len(), 1);
}
