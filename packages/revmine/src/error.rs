//! Typed errors for the revenue extraction pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can match
//! on failure modes when deciding how a job should be retried or surfaced.

use thiserror::Error;

/// Errors that can occur while running the extraction pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Classification service unavailable or returned garbage
    #[error("classification failed: {0}")]
    Classification(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Structure analysis service failed
    #[error("structure analysis failed: {0}")]
    StructureAnalysis(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Revenue verification call failed
    #[error("revenue verification failed: {0}")]
    Verification(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Revenue extraction call failed
    #[error("revenue extraction failed: {0}")]
    Extraction(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Therapy repository lookup failed
    #[error("therapy lookup failed: {0}")]
    TherapyLookup(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The company is known but has no registered therapies.
    ///
    /// Retrying does not help until an operator registers therapies for the
    /// company, so workers should not expect a different outcome on retry.
    #[error("no registered therapies for company: {company}")]
    NoRegisteredTherapies { company: String },

    /// Both tracks produced zero extraction results
    #[error("nothing to reconcile: no extraction results from any track")]
    NothingToReconcile,

    /// Document has no pages of text
    #[error("document has no page text")]
    EmptyDocument,

    /// JSON parsing error at a service boundary
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Configuration error
    #[error("config error: {0}")]
    Config(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl PipelineError {
    /// Whether retrying the whole document can ever change the outcome.
    ///
    /// Fatal errors recur deterministically (missing operator data, empty
    /// inputs); everything else is assumed transient service trouble.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PipelineError::NoRegisteredTherapies { .. }
                | PipelineError::NothingToReconcile
                | PipelineError::EmptyDocument
        )
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_errors_are_flagged() {
        assert!(PipelineError::NoRegisteredTherapies {
            company: "Acme".into()
        }
        .is_fatal());
        assert!(PipelineError::NothingToReconcile.is_fatal());
        assert!(PipelineError::EmptyDocument.is_fatal());
    }

    #[test]
    fn test_service_errors_are_transient() {
        let err = PipelineError::Extraction("connection reset".to_string().into());
        assert!(!err.is_fatal());
    }
}
