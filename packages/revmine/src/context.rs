//! Per-run context threaded explicitly through the pipeline.
//!
//! Prompt builders need to know which document they are talking about.
//! Rather than stashing that in process-global state, every run carries a
//! [`RunContext`] from the orchestrator down into prompt construction, so
//! concurrent runs over different documents cannot observe each other.

use uuid::Uuid;

use crate::types::Document;

#[derive(Debug, Clone)]
pub struct RunContext {
    /// Correlates every log line and AI call belonging to one run
    pub run_id: Uuid,

    /// Human-readable document line injected into prompts,
    /// e.g. "Acme Bio - Q3 2024 quarterly report"
    pub document_context: String,
}

impl RunContext {
    pub fn for_document(document: &Document) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            document_context: document.context_line(),
        }
    }

    /// Context for ad-hoc runs that never touched a stored document.
    pub fn anonymous() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            document_context: String::new(),
        }
    }
}
