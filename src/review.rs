//! Aggregation of OCR correction suggestions into a per-document review file.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use crate::analysis::CorrectionRecord;
use crate::paths::DocPaths;

/// One suggestion tagged with the unit it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRecord {
    pub original_word: String,
    pub suggested_correction: String,
    pub context: String,
    pub source_unit_id: String,
    pub article_number: String,
}

/// Review file written for human verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewReport {
    pub document_slug: String,
    pub total_corrections: usize,
    pub affected_unit_count: usize,
    pub records: Vec<ReviewRecord>,
}

/// Collects correction records for one document.
#[derive(Debug, Default)]
pub struct CorrectionAggregator {
    doc: String,
    records: Vec<ReviewRecord>,
}

impl CorrectionAggregator {
    pub fn new(doc: impl Into<String>) -> Self {
        Self {
            doc: doc.into(),
            records: Vec::new(),
        }
    }

    /// Tag `records` with their unit; blank records are dropped.
    pub fn add(&mut self, unit_id: &str, article_number: &str, records: &[CorrectionRecord]) {
        self.records.extend(
            records
                .iter()
                .filter(|record| !record.is_blank())
                .map(|record| ReviewRecord {
                    original_word: record.original_word.clone(),
                    suggested_correction: record.suggested_correction.clone(),
                    context: record.context.clone(),
                    source_unit_id: unit_id.to_string(),
                    article_number: article_number.to_string(),
                }),
        );
    }

    pub fn total(&self) -> usize {
        self.records.len()
    }

    /// Build the report, or `None` when nothing was collected.
    pub fn report(&self) -> Option<ReviewReport> {
        if self.records.is_empty() {
            return None;
        }
        let units: BTreeSet<&str> = self
            .records
            .iter()
            .map(|record| record.source_unit_id.as_str())
            .collect();
        Some(ReviewReport {
            document_slug: self.doc.clone(),
            total_corrections: self.records.len(),
            affected_unit_count: units.len(),
            records: self.records.clone(),
        })
    }

    /// Write the review file, or remove a stale one when there is nothing
    /// to review. Returns the written path.
    pub fn write(&self, paths: &DocPaths) -> Result<Option<PathBuf>> {
        let path = paths.review_path();
        let Some(report) = self.report() else {
            if path.is_file() {
                fs::remove_file(&path).with_context(|| format!("remove {}", path.display()))?;
            }
            return Ok(None);
        };
        let text = serde_json::to_string_pretty(&report).context("serialize review report")?;
        fs::write(&path, text.as_bytes()).with_context(|| format!("write {}", path.display()))?;
        Ok(Some(path))
    }
}
