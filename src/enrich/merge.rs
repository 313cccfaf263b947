//! Folding an analysis response into unit metadata.
use std::collections::BTreeMap;

use crate::analysis::{AnalysisResponse, CorrectionRecord};
use crate::model::{Aspect, UnitMeta, DEFAULT_UNIT_SUMMARY};

/// Apply `response` to `meta` without discarding what the service omitted.
///
/// `summary`, `keywords` and `aspect` change only when the response carries
/// them; missing values fall back to defaults. OCR corrections always
/// reflect the latest response, so an empty response clears them.
pub fn merge_response(meta: &mut UnitMeta, response: &AnalysisResponse) {
    match response.summary.as_deref().map(str::trim) {
        Some(summary) if !summary.is_empty() => meta.summary = Some(summary.to_string()),
        _ => {
            meta.summary.get_or_insert_with(|| DEFAULT_UNIT_SUMMARY.to_string());
        }
    }

    match &response.keywords {
        Some(keywords) => {
            meta.keywords = Some(
                keywords
                    .iter()
                    .map(|keyword| keyword.trim().to_string())
                    .filter(|keyword| !keyword.is_empty())
                    .collect(),
            )
        }
        None => {
            meta.keywords.get_or_insert_with(Vec::new);
        }
    }

    match response.aspect.as_deref() {
        Some(label) => meta.aspect = Some(Aspect::from_label(label)),
        None => {
            meta.aspect.get_or_insert(Aspect::Unclassified);
        }
    }

    meta.ocr_corrections = Some(correction_map(&response.ocr_corrections));
}

/// Map original words to suggestions; a repeated word keeps the last one.
pub fn correction_map(records: &[CorrectionRecord]) -> BTreeMap<String, String> {
    records
        .iter()
        .filter(|record| !record.is_blank())
        .map(|record| {
            (
                record.original_word.clone(),
                record.suggested_correction.clone(),
            )
        })
        .collect()
}
