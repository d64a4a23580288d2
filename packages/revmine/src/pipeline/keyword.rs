//! Keyword-based section extraction.
//!
//! Scans every page for therapy names and cuts context windows around the
//! hits. Windows are merged when they overlap or sit adjacent, so a therapy
//! discussed across consecutive pages yields one snippet instead of many
//! near-duplicates.

use crate::types::{KeywordSections, PageIndexedText, TextSection};

/// Pages of context kept on each side of a keyword hit.
pub const DEFAULT_CONTEXT_PAGES: u32 = 1;

/// Build keyword sections for every search term.
///
/// Terms that match no page produce no entry. Every occurrence of the term
/// inside a window is wrapped in `**` emphasis markers so downstream
/// consumers can see why the window was cut.
pub fn keyword_sections(
    text: &PageIndexedText,
    terms: &[String],
    context_pages: u32,
) -> KeywordSections {
    let mut sections = KeywordSections::new();
    let last_page = text.page_count();
    if last_page == 0 {
        return sections;
    }

    for term in terms {
        if term.trim().is_empty() {
            continue;
        }

        let hits = matching_pages(text, term);
        if hits.is_empty() {
            continue;
        }

        let windows = expand_and_merge(&hits, context_pages, last_page);
        let mut term_sections = Vec::with_capacity(windows.len());
        for (start, end) in windows {
            let pages: Vec<u32> = (start..=end).collect();
            let body = pages
                .iter()
                .filter_map(|&p| text.get(p))
                .map(|page_text| emphasize_term(page_text, term))
                .collect::<Vec<_>>()
                .join("\n\n");
            term_sections.push(TextSection::for_keyword(body, pages, term.clone()));
        }

        sections.insert(term.clone(), term_sections);
    }

    sections
}

/// Pages whose text contains the term, case-insensitively, ascending.
fn matching_pages(text: &PageIndexedText, term: &str) -> Vec<u32> {
    let needle = term.to_lowercase();
    text.iter()
        .filter(|(_, page_text)| page_text.to_lowercase().contains(&needle))
        .map(|(page, _)| page)
        .collect()
}

/// Expand each hit by the context radius and merge windows that overlap or
/// touch. Input pages must be ascending; output ranges are inclusive and
/// clamped to `[1, last_page]`.
pub fn expand_and_merge(hits: &[u32], context_pages: u32, last_page: u32) -> Vec<(u32, u32)> {
    let mut windows: Vec<(u32, u32)> = Vec::new();

    for &hit in hits {
        let start = hit.saturating_sub(context_pages).max(1);
        let end = hit.saturating_add(context_pages).min(last_page);

        match windows.last_mut() {
            // A gap of one page or less between windows reads as one
            // continuous discussion, so adjacent windows merge too.
            Some((_, prev_end)) if start <= prev_end.saturating_add(1) => {
                *prev_end = (*prev_end).max(end);
            }
            _ => windows.push((start, end)),
        }
    }

    windows
}

/// Wrap every case-insensitive occurrence of `term` in `**` markers,
/// preserving the original casing of each occurrence.
fn emphasize_term(text: &str, term: &str) -> String {
    if term.is_empty() {
        return text.to_string();
    }

    let chars: Vec<char> = text.chars().collect();
    let needle: Vec<char> = term.chars().collect();
    let mut out = String::with_capacity(text.len() + 16);
    let mut i = 0;

    while i < chars.len() {
        let fits = i + needle.len() <= chars.len();
        if fits
            && chars[i..i + needle.len()]
                .iter()
                .zip(&needle)
                .all(|(a, b)| chars_eq_fold(*a, *b))
        {
            out.push_str("**");
            out.extend(&chars[i..i + needle.len()]);
            out.push_str("**");
            i += needle.len();
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }

    out
}

fn chars_eq_fold(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}
