//! Routing of structure sections onto the two extraction tracks.
//!
//! Financial material goes to the revenue track and segment commentary to
//! the business-insight track. Clinical, regulatory, and pipeline sections
//! still carry revenue tables often enough that they ride the revenue track
//! rather than a dedicated agent. Sections the structure analysis could not
//! type fall back to vocabulary scoring over the section text.

use crate::traits::ExtractionFocus;
use crate::types::{SectionKind, StructureSections, TextSection};

const REVENUE_VOCAB: &[&str] = &["revenue", "sales", "income", "earnings", "royalties", "million"];
const CLINICAL_VOCAB: &[&str] = &["clinical", "trial", "patients", "efficacy", "endpoint", "enrollment"];
const BUSINESS_VOCAB: &[&str] = &["market", "segment", "strategy", "competition", "outlook", "commercial"];

/// Structure sections split by the track that will process them.
#[derive(Debug, Default)]
pub struct RoutedSections {
    pub revenue: Vec<TextSection>,
    pub business_insight: Vec<TextSection>,
}

impl RoutedSections {
    pub fn is_empty(&self) -> bool {
        self.revenue.is_empty() && self.business_insight.is_empty()
    }
}

/// Route every structure snippet onto its track.
pub fn route_structure_sections(buckets: StructureSections) -> RoutedSections {
    let mut routed = RoutedSections::default();

    for (kind, sections) in buckets {
        for section in sections {
            match route_section(kind, &section.text) {
                ExtractionFocus::Revenue => routed.revenue.push(section),
                ExtractionFocus::BusinessInsight => routed.business_insight.push(section),
            }
        }
    }

    routed
}

/// Track for one section of a given kind.
pub fn route_section(kind: SectionKind, text: &str) -> ExtractionFocus {
    match kind {
        SectionKind::Financial => ExtractionFocus::Revenue,
        SectionKind::Business => ExtractionFocus::BusinessInsight,
        SectionKind::Clinical | SectionKind::Regulatory | SectionKind::Pipeline => {
            ExtractionFocus::Revenue
        }
        SectionKind::Other => vocabulary_fallback(text),
    }
}

/// Score an untyped section against the track vocabularies.
///
/// Revenue and clinical vocabularies both feed the revenue track, so their
/// counts pool. The revenue track wins ties and empty text.
fn vocabulary_fallback(text: &str) -> ExtractionFocus {
    let lower = text.to_lowercase();
    let revenue_score = vocab_count(&lower, REVENUE_VOCAB) + vocab_count(&lower, CLINICAL_VOCAB);
    let business_score = vocab_count(&lower, BUSINESS_VOCAB);

    if business_score > revenue_score {
        ExtractionFocus::BusinessInsight
    } else {
        ExtractionFocus::Revenue
    }
}

fn vocab_count(lower_text: &str, vocab: &[&str]) -> usize {
    vocab.iter().map(|word| lower_text.matches(word).count()).sum()
}
