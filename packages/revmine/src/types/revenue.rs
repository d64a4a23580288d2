//! Revenue facts: raw per-call extraction results and the reconciled output.

use serde::{Deserialize, Serialize};

/// One extracted revenue fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueRecord {
    /// Therapy the amount belongs to
    pub therapy_name: String,

    /// Normalized period, e.g. "Q3 2024" or "2024"
    pub period: String,

    /// Normalized region, e.g. "United States", "Worldwide"
    pub region: String,

    /// Amount in millions of USD; never negative
    pub revenue_millions_usd: f64,

    /// Citation strings supporting the amount, e.g. `Page 6: "..."`
    pub sources: Vec<String>,
}

impl RevenueRecord {
    /// Identity used to detect duplicate facts across tracks and snippets.
    ///
    /// Therapy and region are case-folded; the period is already normalized
    /// by the extraction service and compared verbatim.
    pub fn dedup_key(&self) -> String {
        format!(
            "{}|{}|{}",
            self.therapy_name.to_lowercase(),
            self.period,
            self.region.to_lowercase()
        )
    }
}

/// Output of one extraction call over one snippet.
///
/// Held only until reconciliation; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Facts found in the snippet
    pub records: Vec<RevenueRecord>,

    /// Extractor's confidence in this call's output, 0-100
    pub confidence: u8,
}

impl ExtractionResult {
    /// Create a result, clamping confidence to the 0-100 scale.
    pub fn new(records: Vec<RevenueRecord>, confidence: u8) -> Self {
        Self {
            records,
            confidence: confidence.min(100),
        }
    }
}

/// A page/quote citation parsed out of a record's source string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceCitation {
    /// Page the quote came from; 0 when the source string named no page
    pub page: u32,

    /// Supporting quote text
    pub quote: String,
}

impl SourceCitation {
    /// Parse a citation string of the form `Page 6: "quote"`.
    ///
    /// Accepts `page`/`p.` prefixes case-insensitively and an optional
    /// `:`/`-` separator. Strings with no recognizable page prefix are kept
    /// whole as the quote with page 0 rather than dropped: a malformed
    /// citation is still evidence.
    pub fn parse(source: &str) -> Self {
        let trimmed = source.trim();

        // Case folding can change byte length (U+0130 lowercases to two
        // characters), so the prefix is matched ASCII-insensitively on the
        // original string instead of via to_lowercase offsets.
        let after_prefix =
            strip_prefix_ascii(trimmed, "page").or_else(|| strip_prefix_ascii(trimmed, "p."));

        if let Some(rest) = after_prefix {
            let rest = rest.trim_start();
            let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
            if !digits.is_empty() {
                if let Ok(page) = digits.parse::<u32>() {
                    let mut quote = rest[digits.len()..].trim_start();
                    quote = quote.trim_start_matches([':', '-']).trim();
                    return Self {
                        page,
                        quote: strip_wrapping_quotes(quote).to_string(),
                    };
                }
            }
        }

        Self {
            page: 0,
            quote: strip_wrapping_quotes(trimmed).to_string(),
        }
    }
}

fn strip_prefix_ascii<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    text.get(..prefix.len())
        .filter(|head| head.eq_ignore_ascii_case(prefix))
        .map(|_| &text[prefix.len()..])
}

fn strip_wrapping_quotes(text: &str) -> &str {
    let text = text.trim();
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        &text[1..text.len() - 1]
    } else {
        text
    }
}

/// The final, persisted outcome for one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciledResult {
    /// Deduplicated revenue facts, first-seen order
    pub records: Vec<RevenueRecord>,

    /// Mean confidence over every contributing extraction call, 0-100
    pub confidence: u8,

    /// All citations across all records, deduplicated and page-sorted
    pub citations: Vec<SourceCitation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(therapy: &str, period: &str, region: &str) -> RevenueRecord {
        RevenueRecord {
            therapy_name: therapy.into(),
            period: period.into(),
            region: region.into(),
            revenue_millions_usd: 10.0,
            sources: vec![],
        }
    }

    #[test]
    fn test_dedup_key_folds_therapy_and_region_case() {
        let a = record("Acme-T", "Q3 2024", "United States");
        let b = record("ACME-T", "Q3 2024", "united states");
        assert_eq!(a.dedup_key(), b.dedup_key());

        let c = record("Acme-T", "2024", "United States");
        assert_ne!(a.dedup_key(), c.dedup_key());
    }

    #[test]
    fn test_citation_parse_handles_common_prefixes() {
        let c = SourceCitation::parse("Page 6: \"Total revenue was $120M\"");
        assert_eq!(c.page, 6);
        assert_eq!(c.quote, "Total revenue was $120M");

        let c = SourceCitation::parse("p. 12 - net sales grew");
        assert_eq!(c.page, 12);
        assert_eq!(c.quote, "net sales grew");

        let c = SourceCitation::parse("PAGE 3 quarterly table");
        assert_eq!(c.page, 3);
        assert_eq!(c.quote, "quarterly table");
    }

    #[test]
    fn test_citation_parse_keeps_malformed_strings_whole() {
        let c = SourceCitation::parse("management commentary, section 2");
        assert_eq!(c.page, 0);
        assert_eq!(c.quote, "management commentary, section 2");
    }

    #[test]
    fn test_citation_parse_survives_width_changing_case_folds() {
        // U+0130 lowercases to a two-character sequence; the folded string is
        // longer in bytes than the original.
        let source = "page\u{130}\u{130}\u{130}\u{130}\u{130}";
        let c = SourceCitation::parse(source);
        assert_eq!(c.page, 0);
        assert_eq!(c.quote, source);

        let c = SourceCitation::parse("PAGE\u{130} 6: \"still no page\"");
        assert_eq!(c.page, 0);
        assert_eq!(c.quote, "PAGE\u{130} 6: \"still no page\"");
    }

    #[test]
    fn test_extraction_result_clamps_confidence() {
        let result = ExtractionResult::new(vec![], 250);
        assert_eq!(result.confidence, 100);
    }
}
