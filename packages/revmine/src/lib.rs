//! Therapy Revenue Extraction Library
//!
//! A pipeline for pulling structured, per-therapy revenue figures out of
//! financial and regulatory PDF text. Feed it a page-indexed document; it
//! classifies the report, maps its section structure, hunts therapy mentions,
//! runs verified extraction over the interesting snippets, and reconciles
//! the overlapping answers into one deduplicated result.
//!
//! # Design Philosophy
//!
//! - Snippet-scoped prompts, not whole-document prompts
//! - Verify before extracting: unverified text never reaches extraction
//! - Every figure carries page-level citations back to the source
//! - Snippet failures degrade the result; phase failures fail the run
//! - Library handles orchestration, callers handle persistence
//!
//! # Usage
//!
//! ```rust,ignore
//! use revmine::{Document, Orchestrator, PageIndexedText};
//! use revmine::testing::{MockAi, MockTherapies};
//!
//! let ai = MockAi::new();
//! let therapies = MockTherapies::new().with_company("Acme Pharma", vec![therapy]);
//! let orchestrator = Orchestrator::new(ai, therapies);
//!
//! let document = Document::new("s3://reports/q3.pdf", "q3.pdf", &bytes);
//! let text = PageIndexedText::new(pages);
//! let outcome = orchestrator.process(&document, &text).await?;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Core trait abstractions (DocumentAi, TherapyLookup)
//! - [`types`] - Documents, sections, revenue records, token usage
//! - [`pipeline`] - Orchestrated extraction: classify, split, route, reconcile
//! - [`context`] - Per-run identity threaded through every phase
//! - [`testing`] - Mock implementations for testing

pub mod context;
pub mod error;
pub mod pipeline;
pub mod testing;
pub mod traits;
pub mod types;

#[cfg(feature = "openai")]
pub mod ai;

// Re-export core types at crate root
pub use context::RunContext;
pub use error::{PipelineError, Result};
pub use traits::{
    ClassifyResponse, DocumentAi, ExtractResponse, ExtractionFocus, StructureResponse,
    TherapyLookup, VerifyResponse,
};
pub use types::{
    Document, DocumentStructure, ExtractionResult, KeywordSections, PageIndexedText,
    PipelineConfig, ReconciledResult, RevenueRecord, SectionKind, SectionOverlap, SourceCitation,
    StructureSection, StructureSections, TextSection, Therapy, TokenUsage,
};

// Re-export the orchestrator from pipeline
pub use pipeline::{Orchestrator, PipelineOutcome};

// Re-export pipeline components
pub use pipeline::{
    determine_strategy, detect_overlaps, expand_and_merge, extraction_prompt_hash,
    keyword_sections, reconcile, route_section, route_structure_sections, run_business_track,
    run_revenue_track, structure_sections, ExtractionStrategy, RoutedSections, TrackOutput,
};

#[cfg(feature = "openai")]
pub use ai::OpenAi;

// Re-export testing utilities
pub use testing::{MockAi, MockTherapies};
