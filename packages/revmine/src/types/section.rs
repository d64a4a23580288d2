//! Text sections ("snippets") — the unit of work for one extraction call.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::structure::SectionKind;

/// Structure-derived sections bucketed by section kind.
///
/// `BTreeMap` keeps bucket iteration deterministic, which in turn keeps
/// the reconciler's first-seen record order reproducible.
pub type StructureSections = BTreeMap<SectionKind, Vec<TextSection>>;

/// Keyword-derived sections bucketed by the therapy name that matched.
pub type KeywordSections = BTreeMap<String, Vec<TextSection>>;

/// A contiguous run of page text handed to one extraction call.
///
/// Immutable once built; never written back to storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextSection {
    /// Concatenated page text, possibly with search-term emphasis markers
    pub text: String,

    /// Pages the text came from, ascending
    pub pages: Vec<u32>,

    /// Title of the outline section this came from (structure-based only)
    pub section_title: Option<String>,

    /// Therapy name that produced this snippet (keyword-based only);
    /// scopes the extraction call to that therapy
    pub search_term: Option<String>,
}

impl TextSection {
    /// Snippet cut from a structure outline section.
    pub fn for_structure(
        text: impl Into<String>,
        pages: Vec<u32>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            pages,
            section_title: Some(title.into()),
            search_term: None,
        }
    }

    /// Snippet cut from a keyword match window.
    pub fn for_keyword(text: impl Into<String>, pages: Vec<u32>, term: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            pages,
            section_title: None,
            search_term: Some(term.into()),
        }
    }

    /// First page covered, for logging.
    pub fn first_page(&self) -> Option<u32> {
        self.pages.first().copied()
    }

    /// Inclusive page span as `(start, end)`.
    pub fn page_span(&self) -> Option<(u32, u32)> {
        match (self.pages.first(), self.pages.last()) {
            (Some(&start), Some(&end)) => Some((start, end)),
            _ => None,
        }
    }
}

/// A page-range collision between a keyword window and a structure section.
///
/// Recorded for observability only: both tracks still process their own copy
/// of the shared pages, and the reconciler folds any duplicate facts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionOverlap {
    /// Therapy whose keyword window collided
    pub therapy: String,

    /// Kind of the structure section it collided with
    pub section_kind: SectionKind,

    /// Pages present in both, ascending
    pub pages: Vec<u32>,
}
