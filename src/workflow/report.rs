//! Run report snapshot written after `enrich` and `run`.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;

use crate::enrich::log::now_epoch_ms;
use crate::enrich::DocumentOutcome;
use crate::ledger::{RunLedger, TokenUsage};
use crate::paths::OutputPaths;

pub const RUN_REPORT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    /// Stopped early because the analysis credentials were rejected.
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentReport {
    pub doc: String,
    pub units: usize,
    pub enriched: usize,
    pub degraded: usize,
    pub corrections: usize,
    pub relinked: usize,
    pub context_available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_file: Option<String>,
    pub tokens: TokenUsage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedDocument {
    pub doc: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub schema_version: u32,
    pub generated_at_epoch_ms: u64,
    pub status: RunStatus,
    pub documents: Vec<DocumentReport>,
    pub failed: Vec<FailedDocument>,
    pub units: usize,
    pub enriched: usize,
    pub degraded: usize,
    pub corrections: usize,
    pub tokens: RunLedger,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            schema_version: RUN_REPORT_SCHEMA_VERSION,
            generated_at_epoch_ms: 0,
            status: RunStatus::Completed,
            documents: Vec::new(),
            failed: Vec::new(),
            units: 0,
            enriched: 0,
            degraded: 0,
            corrections: 0,
            tokens: RunLedger::new(),
        }
    }

    pub fn record(&mut self, outcome: &DocumentOutcome, tokens: TokenUsage) {
        self.units += outcome.units;
        self.enriched += outcome.enriched;
        self.degraded += outcome.degraded;
        self.corrections += outcome.corrections;
        self.documents.push(DocumentReport {
            doc: outcome.doc.clone(),
            units: outcome.units,
            enriched: outcome.enriched,
            degraded: outcome.degraded,
            corrections: outcome.corrections,
            relinked: outcome.links.rewritten,
            context_available: outcome.context_available,
            review_file: outcome
                .review_path
                .as_ref()
                .and_then(|path| path.file_name())
                .map(|name| name.to_string_lossy().into_owned()),
            tokens,
        });
    }

    pub fn fail(&mut self, doc: &str, error: String) {
        self.failed.push(FailedDocument {
            doc: doc.to_string(),
            error,
        });
    }

    /// Print the final tally.
    pub fn print_summary(&self) {
        let status = match self.status {
            RunStatus::Completed => "completed",
            RunStatus::Aborted => "aborted",
        };
        println!(
            "enrich {status}: {} document(s), {} failed; units {} enriched, {} degraded of {}; {} correction(s)",
            self.documents.len(),
            self.failed.len(),
            self.enriched,
            self.degraded,
            self.units,
            self.corrections
        );
        println!(
            "tokens: {} input, {} output, {} total",
            self.tokens.total.input_tokens,
            self.tokens.total.output_tokens,
            self.tokens.total.total()
        );
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Write the latest run report snapshot.
pub fn write_run_report(output: &OutputPaths, report: &mut RunReport) -> Result<()> {
    report.generated_at_epoch_ms = now_epoch_ms();
    let path = output.run_report_path();
    let text = serde_json::to_string_pretty(report).context("serialize run report")?;
    fs::write(&path, text.as_bytes()).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
