use serde::{Deserialize, Serialize};

/// Tunables for one pipeline run.
///
/// Every value has a working default; callers only override what they need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pages of context pulled in on each side of a keyword hit
    pub context_pages: u32,

    /// Documents strictly under this page count skip section splitting and
    /// are extracted as one block
    pub small_document_pages: u32,

    /// Minimum verification confidence (0-100) for a keyword snippet to be
    /// extracted. Snippets below the bar are skipped.
    pub verification_min_confidence: u8,

    /// Revenue amounts closer than this (in millions USD) are treated as
    /// agreeing during reconciliation
    pub amount_epsilon: f64,

    /// Pages sampled from the front of the document for classification
    pub classify_pages: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            context_pages: 1,
            small_document_pages: 15,
            verification_min_confidence: 50,
            amount_epsilon: 0.1,
            classify_pages: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let config = PipelineConfig::default();
        assert_eq!(config.context_pages, 1);
        assert_eq!(config.small_document_pages, 15);
        assert_eq!(config.verification_min_confidence, 50);
        assert!(config.amount_epsilon > 0.0);
        assert_eq!(config.classify_pages, 3);
    }
}
