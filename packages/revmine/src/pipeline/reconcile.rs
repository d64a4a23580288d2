//! Reconciliation of per-snippet extraction results into one answer.
//!
//! Both tracks hand over raw per-snippet results, so the same revenue fact
//! can arrive several times: once from a financial statement section, once
//! from a keyword window over the same pages. Reconciliation folds those
//! duplicates, arbitrates genuine numeric conflicts by extraction
//! confidence, and keeps every citation regardless of which amount wins.

use std::collections::{BTreeSet, HashMap};

use crate::error::{PipelineError, Result};
use crate::types::{ExtractionResult, ReconciledResult, RevenueRecord, SourceCitation};

struct Winner {
    record: RevenueRecord,
    confidence: u8,
}

/// Merge every track's results into the final [`ReconciledResult`].
///
/// Records are keyed by therapy, period, and region. The first record seen
/// for a key wins; a later record with a materially different amount takes
/// over only when its originating result's confidence is strictly higher.
/// Amounts within `amount_epsilon` of each other count as the same figure.
/// Source strings always merge into the winner, so losing a conflict never
/// loses a citation.
pub fn reconcile(results: &[ExtractionResult], amount_epsilon: f64) -> Result<ReconciledResult> {
    if results.is_empty() {
        return Err(PipelineError::NothingToReconcile);
    }

    // Mean over every input result, not just the ones that won records.
    let confidence = mean_confidence(results);

    if results.len() == 1 {
        // A single result has nothing to arbitrate; pass records through.
        let records = results[0].records.clone();
        let citations = collect_citations(&records);
        return Ok(ReconciledResult {
            records,
            confidence,
            citations,
        });
    }

    let mut order: Vec<String> = Vec::new();
    let mut winners: HashMap<String, Winner> = HashMap::new();

    for result in results {
        for record in &result.records {
            let key = record.dedup_key();
            match winners.get_mut(&key) {
                None => {
                    order.push(key.clone());
                    winners.insert(
                        key,
                        Winner {
                            record: record.clone(),
                            confidence: result.confidence,
                        },
                    );
                }
                Some(winner) => {
                    let delta =
                        (winner.record.revenue_millions_usd - record.revenue_millions_usd).abs();
                    if delta > amount_epsilon && result.confidence > winner.confidence {
                        // Genuine conflict lost by the incumbent: the
                        // candidate takes over but inherits the union of
                        // both citation trails.
                        let mut replacement = record.clone();
                        replacement.sources = winner.record.sources.clone();
                        merge_sources(&mut replacement.sources, &record.sources);
                        winner.record = replacement;
                        winner.confidence = result.confidence;
                    } else {
                        merge_sources(&mut winner.record.sources, &record.sources);
                    }
                }
            }
        }
    }

    let records: Vec<RevenueRecord> = order
        .iter()
        .filter_map(|key| winners.remove(key))
        .map(|winner| winner.record)
        .collect();
    let citations = collect_citations(&records);

    Ok(ReconciledResult {
        records,
        confidence,
        citations,
    })
}

fn mean_confidence(results: &[ExtractionResult]) -> u8 {
    let sum: f64 = results.iter().map(|r| r.confidence as f64).sum();
    (sum / results.len() as f64).round() as u8
}

/// Append the sources not already present, preserving first-seen order.
fn merge_sources(existing: &mut Vec<String>, incoming: &[String]) {
    for source in incoming {
        if !existing.iter().any(|s| s == source) {
            existing.push(source.clone());
        }
    }
}

/// Parse every record's source strings into citations, deduplicated by
/// page and quote, sorted by page ascending.
fn collect_citations(records: &[RevenueRecord]) -> Vec<SourceCitation> {
    let set: BTreeSet<SourceCitation> = records
        .iter()
        .flat_map(|r| r.sources.iter())
        .map(|s| SourceCitation::parse(s))
        .collect();
    set.into_iter().collect()
}
