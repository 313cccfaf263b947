//! Enrichment of one document folder.
//!
//! Units are re-linked and persisted first, then analyzed strictly in sort
//! order. A unit whose attempts run out keeps its defaults and links; only
//! rejected credentials stop processing.
pub mod log;
pub mod merge;
pub mod retry;

use anyhow::Result;
use std::path::PathBuf;

use crate::analysis::{AnalysisRequest, AnalysisResponse, AnalysisService};
use crate::context::DocumentContext;
use crate::ledger::{DocumentLedger, TokenUsage};
use crate::link::{self, LinkSummary};
use crate::paths::DocPaths;
use crate::review::CorrectionAggregator;
use crate::store;
use log::{append_enrich_log, EnrichLogBuilder};
use merge::merge_response;
use retry::{RetryOutcome, RetryPolicy};

/// Tally for one enriched document.
#[derive(Debug, Clone, Default)]
pub struct DocumentOutcome {
    pub doc: String,
    pub units: usize,
    pub enriched: usize,
    pub degraded: usize,
    pub corrections: usize,
    pub links: LinkSummary,
    pub review_path: Option<PathBuf>,
    pub context_available: bool,
}

/// Link and enrich every unit of one document.
///
/// Token usage is recorded into `ledger` as units finish, so the caller
/// keeps partial totals even when the run is aborted. An authorization
/// failure is returned as an error wrapping
/// [`AnalysisError::Authorization`](crate::analysis::AnalysisError).
pub fn enrich_document(
    paths: &DocPaths,
    context: &DocumentContext,
    service: &dyn AnalysisService,
    policy: &RetryPolicy,
    ledger: &mut DocumentLedger,
) -> Result<DocumentOutcome> {
    let scan = store::load_units(paths)?;
    let mut files = scan.files;
    let mut outcome = DocumentOutcome {
        doc: paths.slug().to_string(),
        units: files.len(),
        context_available: context.is_available(),
        ..DocumentOutcome::default()
    };
    if files.is_empty() {
        tracing::warn!(doc = %paths.slug(), "no readable units; skipping");
        return Ok(outcome);
    }
    if !context.is_available() {
        tracing::warn!(
            doc = %paths.slug(),
            "source document not found; enriching without context"
        );
    }

    // links for every unit reach disk before the first analysis call
    outcome.links = link::relink_files(&mut files)?;
    outcome.links.unreadable = scan.unreadable;

    let mut aggregator = CorrectionAggregator::new(paths.slug());
    for file in &mut files {
        let unit_id = file.unit.id().to_string();
        let builder = EnrichLogBuilder::new(unit_id.clone());
        let request = AnalysisRequest {
            text: &file.unit.body,
            context: context.as_text(),
        };
        let result = policy.run(|attempt| {
            tracing::debug!(doc = %paths.slug(), unit = %unit_id, attempt, "analyze unit");
            service.analyze(&request)
        });

        let entry = match result {
            RetryOutcome::Succeeded { value, attempts } => {
                let corrections = value
                    .response
                    .ocr_corrections
                    .iter()
                    .filter(|record| !record.is_blank())
                    .count();
                merge_response(&mut file.unit.meta, &value.response);
                aggregator.add(
                    &unit_id,
                    &file.unit.meta.article_label(),
                    &value.response.ocr_corrections,
                );
                ledger.record(&unit_id, value.usage);
                outcome.enriched += 1;
                outcome.corrections += corrections;
                println!("  enriched {unit_id} (attempts: {attempts}, corrections: {corrections})");
                builder.enriched(attempts, value.usage, corrections)
            }
            RetryOutcome::Exhausted { error, attempts } => {
                merge_response(&mut file.unit.meta, &AnalysisResponse::default());
                ledger.record(&unit_id, TokenUsage::default());
                outcome.degraded += 1;
                tracing::warn!(
                    doc = %paths.slug(),
                    unit = %unit_id,
                    attempts,
                    kind = error.kind(),
                    error = %error,
                    "analysis failed; keeping defaults"
                );
                println!("  degraded {unit_id} after {attempts} attempt(s): {error}");
                builder.degraded(attempts, error.kind(), error.to_string())
            }
            RetryOutcome::Fatal { error, attempts } => {
                ledger.record(&unit_id, TokenUsage::default());
                append_enrich_log(paths, &builder.aborted(attempts, error.to_string()))?;
                tracing::error!(
                    doc = %paths.slug(),
                    unit = %unit_id,
                    error = %error,
                    "authorization failed; stopping"
                );
                return Err(anyhow::Error::new(error));
            }
        };
        store::save_unit(&file.path, &file.unit)?;
        append_enrich_log(paths, &entry)?;
    }

    outcome.review_path = aggregator.write(paths)?;
    tracing::info!(
        doc = %paths.slug(),
        units = outcome.units,
        enriched = outcome.enriched,
        degraded = outcome.degraded,
        corrections = aggregator.total(),
        input_tokens = ledger.total.input_tokens,
        output_tokens = ledger.total.output_tokens,
        "document enriched"
    );
    Ok(outcome)
}

#[cfg(test)]
#[path = "enrich/tests.rs"]
mod tests;
