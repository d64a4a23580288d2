//! Structure-based section extraction and overlap detection.

use std::collections::BTreeSet;

use crate::types::{
    DocumentStructure, KeywordSections, PageIndexedText, SectionOverlap, StructureSections,
    TextSection,
};

/// Cut one snippet per outline section and bucket them by section kind.
///
/// A section's range runs from its start page to its end page, or to the
/// end of the document when the structure analysis left the end open.
/// Sections whose range falls outside the document produce no snippet.
pub fn structure_sections(
    text: &PageIndexedText,
    structure: &DocumentStructure,
) -> StructureSections {
    let mut buckets = StructureSections::new();
    let last_page = text.page_count();
    if last_page == 0 {
        return buckets;
    }

    for section in &structure.sections {
        let start = section.page_start.max(1);
        let end = section.end_page(last_page);
        if start > end {
            continue;
        }

        let body = text.concat_range(start, end);
        if body.is_empty() {
            continue;
        }

        let pages: Vec<u32> = (start..=end).collect();
        buckets
            .entry(section.kind)
            .or_default()
            .push(TextSection::for_structure(body, pages, section.title.clone()));
    }

    buckets
}

/// Find page-range collisions between keyword windows and outline sections.
///
/// One record per (therapy, outline section) pair whose page sets intersect.
/// Purely observational: both tracks keep processing their own copy of the
/// shared pages and the reconciler folds any duplicate facts that result.
pub fn detect_overlaps(
    keyword: &KeywordSections,
    structure: &StructureSections,
) -> Vec<SectionOverlap> {
    let mut overlaps = Vec::new();

    for (therapy, windows) in keyword {
        let therapy_pages: BTreeSet<u32> =
            windows.iter().flat_map(|w| w.pages.iter().copied()).collect();

        for (&kind, sections) in structure {
            for section in sections {
                let shared: Vec<u32> = section
                    .pages
                    .iter()
                    .copied()
                    .filter(|p| therapy_pages.contains(p))
                    .collect();
                if !shared.is_empty() {
                    overlaps.push(SectionOverlap {
                        therapy: therapy.clone(),
                        section_kind: kind,
                        pages: shared,
                    });
                }
            }
        }
    }

    overlaps
}
