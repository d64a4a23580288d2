//! Revenue extraction pipeline - the core of the library.
//!
//! The pipeline orchestrates:
//! - Classification of the document from its opening pages
//! - Therapy vocabulary lookup for the classified company
//! - Structure analysis and strategy selection
//! - Section cutting (outline sections and keyword windows)
//! - Two concurrent extraction tracks with a verification gate
//! - Reconciliation of per-snippet results into one answer

pub mod keyword;
pub mod orchestrator;
pub mod prompts;
pub mod reconcile;
pub mod routing;
pub mod sections;
pub mod strategy;
pub mod tracks;

pub use keyword::{expand_and_merge, keyword_sections};
pub use orchestrator::{Orchestrator, PipelineOutcome};
pub use prompts::{
    extraction_prompt_hash, format_classify_prompt, format_extract_prompt, format_verify_prompt,
    CLASSIFY_PROMPT, EXTRACT_BUSINESS_PROMPT, EXTRACT_REVENUE_PROMPT, STRUCTURE_PROMPT,
    VERIFY_PROMPT,
};
pub use reconcile::reconcile;
pub use routing::{route_section, route_structure_sections, RoutedSections};
pub use sections::{detect_overlaps, structure_sections};
pub use strategy::{determine_strategy, ExtractionStrategy};
pub use tracks::{run_business_track, run_revenue_track, TrackOutput};
