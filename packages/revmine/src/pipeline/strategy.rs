//! Extraction strategy selection.
//!
//! A pure decision over what the early pipeline phases learned about the
//! document. The strategy gates which tracks receive sections; both tracks
//! always run downstream, so an unpopulated track is simply a no-op.

use std::fmt;

use crate::types::PipelineConfig;

/// How the document will be cut up for extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// Small document: extract the whole text as one block
    SmartComplete,

    /// Structure mapped and therapies known: run both tracks in full
    FullParallel,

    /// Structure mapped but no therapy vocabulary: structure track only
    StructureOnly,

    /// No usable structure: keyword windows only, best effort
    Hybrid,
}

impl ExtractionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SmartComplete => "smart-complete",
            Self::FullParallel => "full-parallel",
            Self::StructureOnly => "structure-only",
            Self::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for ExtractionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pick the strategy for a document.
///
/// Small documents are not worth splitting. Otherwise the choice follows
/// what the earlier phases found: explicit structure, a therapy vocabulary,
/// both, or neither.
pub fn determine_strategy(
    page_count: u32,
    has_structure: bool,
    has_therapies: bool,
    config: &PipelineConfig,
) -> ExtractionStrategy {
    if page_count < config.small_document_pages {
        return ExtractionStrategy::SmartComplete;
    }

    match (has_structure, has_therapies) {
        (true, true) => ExtractionStrategy::FullParallel,
        (true, false) => ExtractionStrategy::StructureOnly,
        (false, _) => ExtractionStrategy::Hybrid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PipelineConfig {
        PipelineConfig::default()
    }

    #[test]
    fn test_small_documents_use_smart_complete() {
        assert_eq!(
            determine_strategy(14, true, true, &config()),
            ExtractionStrategy::SmartComplete
        );
        // Exactly at the threshold is no longer small
        assert_eq!(
            determine_strategy(15, true, true, &config()),
            ExtractionStrategy::FullParallel
        );
    }

    #[test]
    fn test_structure_and_therapies_run_full_parallel() {
        assert_eq!(
            determine_strategy(80, true, true, &config()),
            ExtractionStrategy::FullParallel
        );
    }

    #[test]
    fn test_structure_without_therapies_is_structure_only() {
        assert_eq!(
            determine_strategy(80, true, false, &config()),
            ExtractionStrategy::StructureOnly
        );
    }

    #[test]
    fn test_no_structure_falls_back_to_hybrid() {
        assert_eq!(
            determine_strategy(80, false, true, &config()),
            ExtractionStrategy::Hybrid
        );
        assert_eq!(
            determine_strategy(80, false, false, &config()),
            ExtractionStrategy::Hybrid
        );
    }
}
