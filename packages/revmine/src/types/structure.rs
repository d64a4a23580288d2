//! Document structure as reported by the structure-analysis service.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Section categories recognized by the router.
///
/// The analysis service reports free-form type strings; anything it invents
/// beyond this set is folded into [`SectionKind::Other`] and routed by
/// vocabulary scoring instead of by label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Financial,
    Clinical,
    Regulatory,
    Pipeline,
    Business,
    Other,
}

impl SectionKind {
    /// Parse a service-reported type string, folding unknowns into `Other`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "financial" => SectionKind::Financial,
            "clinical" => SectionKind::Clinical,
            "regulatory" => SectionKind::Regulatory,
            "pipeline" => SectionKind::Pipeline,
            "business" => SectionKind::Business,
            _ => SectionKind::Other,
        }
    }

    /// Lowercase label, matching the wire format.
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::Financial => "financial",
            SectionKind::Clinical => "clinical",
            SectionKind::Regulatory => "regulatory",
            SectionKind::Pipeline => "pipeline",
            SectionKind::Business => "business",
            SectionKind::Other => "other",
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One section of the document outline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructureSection {
    /// Section heading as printed in the document
    pub title: String,

    /// First page of the section (1-based)
    pub page_start: u32,

    /// Last page, or `None` when the section runs to the end of the document
    pub page_end: Option<u32>,

    /// Section category
    pub kind: SectionKind,

    /// Analyzer confidence, 0-100
    pub confidence: u8,
}

impl StructureSection {
    /// Resolve the inclusive end page against the document's last page.
    pub fn end_page(&self, last_page: u32) -> u32 {
        self.page_end.unwrap_or(last_page).min(last_page)
    }
}

/// The structure-analysis verdict for one document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentStructure {
    /// Whether the analyzer found a usable explicit outline
    pub has_explicit_structure: bool,

    /// Sections in document order; empty when no structure was found
    pub sections: Vec<StructureSection>,
}

impl DocumentStructure {
    /// A structure verdict with no usable outline.
    pub fn unstructured() -> Self {
        Self::default()
    }
}
