use serde::{Deserialize, Serialize};

/// Token spend for one pipeline run, split by phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens spent classifying the document
    pub classification: u64,

    /// Tokens spent analyzing document structure
    pub structure: u64,

    /// Tokens spent on extraction and verification calls
    pub extraction: u64,
}

impl TokenUsage {
    pub fn classification(tokens: u64) -> Self {
        Self {
            classification: tokens,
            ..Self::default()
        }
    }

    pub fn structure(tokens: u64) -> Self {
        Self {
            structure: tokens,
            ..Self::default()
        }
    }

    pub fn extraction(tokens: u64) -> Self {
        Self {
            extraction: tokens,
            ..Self::default()
        }
    }

    /// Sequential accumulation: later phases add onto earlier ones.
    pub fn add(&mut self, other: Self) {
        self.classification += other.classification;
        self.structure += other.structure;
        self.extraction += other.extraction;
    }

    /// Merge usage reported by tracks that ran concurrently over the same
    /// document. Extraction spend is real per-track work and sums; the
    /// one-time classification and structure phases happened once before
    /// the fork, so a double report from both sides must not double-count.
    pub fn merge_parallel(&mut self, other: Self) {
        self.classification = self.classification.max(other.classification);
        self.structure = self.structure.max(other.structure);
        self.extraction += other.extraction;
    }

    pub fn total(&self) -> u64 {
        self.classification + self.structure + self.extraction
    }
}
