//! Track processors: concurrent verification and extraction over snippets.
//!
//! Each track fans out one extraction call per snippet and collects the
//! per-snippet results without merging them, so the reconciler sees every
//! individual source of a potential duplicate. A failed call never aborts
//! the track; the snippet is logged and dropped.

use futures::future::{join, join_all};
use tracing::{debug, warn};

use crate::context::RunContext;
use crate::traits::{DocumentAi, ExtractionFocus};
use crate::types::{ExtractionResult, PipelineConfig, TextSection, Therapy, TokenUsage};

/// What one track produced: raw per-snippet results plus token spend.
#[derive(Debug, Default)]
pub struct TrackOutput {
    pub results: Vec<ExtractionResult>,
    pub usage: TokenUsage,
}

/// Outcome of one snippet, successful or absorbed.
struct SnippetOutcome {
    result: Option<ExtractionResult>,
    tokens: u64,
}

impl SnippetOutcome {
    fn skipped(tokens: u64) -> Self {
        Self {
            result: None,
            tokens,
        }
    }
}

/// Run the revenue track.
///
/// Structure snippets go straight to extraction. Keyword snippets pass the
/// verification gate first, because a therapy name on a page says nothing
/// about whether a revenue figure sits next to it. All snippets of both
/// kinds are processed concurrently.
pub async fn run_revenue_track<A: DocumentAi + ?Sized>(
    ai: &A,
    ctx: &RunContext,
    config: &PipelineConfig,
    therapies: &[Therapy],
    structure_snippets: &[TextSection],
    keyword_snippets: &[TextSection],
) -> TrackOutput {
    let structure_futures = structure_snippets
        .iter()
        .map(|section| extract_snippet(ai, ctx, section, therapies, ExtractionFocus::Revenue));

    let keyword_futures = keyword_snippets
        .iter()
        .map(|section| verify_then_extract(ai, ctx, config, section, therapies));

    let (structure_outcomes, keyword_outcomes) =
        join(join_all(structure_futures), join_all(keyword_futures)).await;

    collect(structure_outcomes.into_iter().chain(keyword_outcomes))
}

/// Run the business-insight track over its routed snippets.
pub async fn run_business_track<A: DocumentAi + ?Sized>(
    ai: &A,
    ctx: &RunContext,
    therapies: &[Therapy],
    snippets: &[TextSection],
) -> TrackOutput {
    let futures = snippets.iter().map(|section| {
        extract_snippet(ai, ctx, section, therapies, ExtractionFocus::BusinessInsight)
    });

    collect(join_all(futures).await)
}

/// Fold per-snippet outcomes into the track output, preserving snippet order.
fn collect(outcomes: impl IntoIterator<Item = SnippetOutcome>) -> TrackOutput {
    let mut output = TrackOutput::default();
    for outcome in outcomes {
        output.usage.add(TokenUsage::extraction(outcome.tokens));
        if let Some(result) = outcome.result {
            output.results.push(result);
        }
    }
    output
}

/// Verification gate for a keyword snippet, then extraction when it passes.
///
/// A failed verification call counts as "no revenue data": the snippet is
/// skipped rather than extracted blind.
async fn verify_then_extract<A: DocumentAi + ?Sized>(
    ai: &A,
    ctx: &RunContext,
    config: &PipelineConfig,
    section: &TextSection,
    therapies: &[Therapy],
) -> SnippetOutcome {
    // Keyword snippets are born from one therapy's match; the verification
    // question is asked about that therapy specifically.
    let therapy_name = section.search_term.as_deref().unwrap_or_default();

    let verdict = match ai.verify_revenue(ctx, &section.text, therapy_name).await {
        Ok(verdict) => verdict,
        Err(e) => {
            warn!(
                run_id = %ctx.run_id,
                page = section.first_page().unwrap_or(0),
                therapy = therapy_name,
                error = %e,
                "Snippet verification failed, skipping snippet"
            );
            return SnippetOutcome::skipped(0);
        }
    };

    if !verdict.passes(config.verification_min_confidence) {
        debug!(
            run_id = %ctx.run_id,
            page = section.first_page().unwrap_or(0),
            therapy = therapy_name,
            contains_revenue_data = verdict.contains_revenue_data,
            confidence = verdict.confidence,
            reasoning = %verdict.reasoning,
            "Snippet did not pass verification"
        );
        return SnippetOutcome::skipped(verdict.tokens_used);
    }

    debug!(
        run_id = %ctx.run_id,
        page = section.first_page().unwrap_or(0),
        therapy = therapy_name,
        confidence = verdict.confidence,
        reasoning = %verdict.reasoning,
        "Snippet passed verification"
    );

    let mut outcome = extract_snippet(ai, ctx, section, therapies, ExtractionFocus::Revenue).await;
    outcome.tokens += verdict.tokens_used;
    outcome
}

/// One extraction call over one snippet. Errors are absorbed here.
async fn extract_snippet<A: DocumentAi + ?Sized>(
    ai: &A,
    ctx: &RunContext,
    section: &TextSection,
    therapies: &[Therapy],
    focus: ExtractionFocus,
) -> SnippetOutcome {
    let scope = therapy_scope(section, therapies);

    match ai.extract_revenue(ctx, &section.text, scope, focus).await {
        Ok(response) => SnippetOutcome {
            result: Some(response.result),
            tokens: response.tokens_used,
        },
        Err(e) => {
            warn!(
                run_id = %ctx.run_id,
                page = section.first_page().unwrap_or(0),
                error = %e,
                "Snippet extraction failed, dropping snippet"
            );
            SnippetOutcome::skipped(0)
        }
    }
}

/// Therapies the extraction call should look for.
///
/// A keyword snippet is scoped to its owning therapy; structure snippets
/// see the full vocabulary.
fn therapy_scope<'a>(section: &TextSection, therapies: &'a [Therapy]) -> &'a [Therapy] {
    let Some(term) = section.search_term.as_deref() else {
        return therapies;
    };

    match therapies
        .iter()
        .position(|t| t.name.eq_ignore_ascii_case(term))
    {
        Some(i) => std::slice::from_ref(&therapies[i]),
        None => therapies,
    }
}
