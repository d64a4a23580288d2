pub mod config;
pub mod document;
pub mod revenue;
pub mod section;
pub mod structure;
pub mod therapy;
pub mod usage;

pub use config::PipelineConfig;
pub use document::{Document, PageIndexedText};
pub use revenue::{ExtractionResult, ReconciledResult, RevenueRecord, SourceCitation};
pub use section::{KeywordSections, SectionOverlap, StructureSections, TextSection};
pub use structure::{DocumentStructure, SectionKind, StructureSection};
pub use therapy::Therapy;
pub use usage::TokenUsage;
