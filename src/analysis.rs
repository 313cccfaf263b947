//! Boundary to the external analysis service.
//!
//! The service receives one article and the document context and returns a
//! summary, keywords, an aspect label and OCR correction suggestions. Every
//! failure is classified as transient, authorization or malformed so the
//! orchestrator can decide between retrying, degrading and aborting.
pub mod command;
pub mod gemini;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::ledger::TokenUsage;

// Prompt templates loaded at compile time
const SYSTEM_PROMPT: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/prompts/system.md"));
const ARTICLE_PROMPT: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/article.md"
));

/// Placeholder sent in place of the context when the source was not found.
pub const NO_CONTEXT_NOTE: &str = "لا يوجد سياق أساسي، تعامل مع المادة كوثيقة مستقلة.";

/// Failure classes of an analysis call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AnalysisError {
    /// Network, rate limiting or server-side failure.
    #[error("analysis service unavailable: {0}")]
    Transient(String),
    /// Invalid or missing credentials; fatal for the whole run.
    #[error("analysis service rejected the credentials: {0}")]
    Authorization(String),
    /// The response could not be decoded into the expected shape.
    #[error("malformed analysis response: {0}")]
    Malformed(String),
}

impl AnalysisError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, AnalysisError::Authorization(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::Transient(_) => "transient",
            AnalysisError::Authorization(_) => "authorization",
            AnalysisError::Malformed(_) => "malformed",
        }
    }
}

/// One unit sent for analysis.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisRequest<'a> {
    pub text: &'a str,
    pub context: Option<&'a str>,
}

/// One suggested OCR fix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionRecord {
    pub original_word: String,
    pub suggested_correction: String,
    #[serde(default)]
    pub context: String,
}

impl CorrectionRecord {
    /// A record without an original word has nothing to correct.
    pub fn is_blank(&self) -> bool {
        self.original_word.trim().is_empty()
    }
}

/// Decoded service answer; every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AnalysisResponse {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub keywords: Option<Vec<String>>,
    #[serde(default)]
    pub aspect: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub ocr_corrections: Vec<CorrectionRecord>,
}

/// A successful call: the decoded response and what it cost.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisOutcome {
    pub response: AnalysisResponse,
    pub usage: TokenUsage,
}

/// Something that can analyze a unit.
pub trait AnalysisService {
    fn analyze(&self, request: &AnalysisRequest<'_>) -> Result<AnalysisOutcome, AnalysisError>;
}

impl<T: AnalysisService + ?Sized> AnalysisService for Box<T> {
    fn analyze(&self, request: &AnalysisRequest<'_>) -> Result<AnalysisOutcome, AnalysisError> {
        (**self).analyze(request)
    }
}

/// Prompt pair sent to the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

pub fn build_prompt(request: &AnalysisRequest<'_>) -> Prompt {
    let context = request.context.unwrap_or(NO_CONTEXT_NOTE);
    Prompt {
        system: SYSTEM_PROMPT.trim().to_string(),
        user: ARTICLE_PROMPT
            .replace("{context}", context)
            .replace("{article}", request.text),
    }
}

/// Decode the service's text payload into a response.
pub fn parse_response(text: &str) -> Result<AnalysisResponse, AnalysisError> {
    let json_text = extract_json(text);
    if json_text.is_empty() {
        return Err(AnalysisError::Malformed("empty response".to_string()));
    }
    serde_json::from_str(json_text).map_err(|err| {
        AnalysisError::Malformed(format!(
            "{err} (first 200 bytes: {})",
            crate::util::truncate_string(json_text, 200)
        ))
    })
}

/// Extract JSON from text that might have markdown code fences.
pub fn extract_json(text: &str) -> &str {
    let text = text.trim();

    if let Some(start) = text.find("```json") {
        let start = start + 7;
        if let Some(end) = text[start..].find("```") {
            return text[start..start + end].trim();
        }
    }

    if let Some(start) = text.find("```") {
        let start = start + 3;
        // skip a language tag
        let start = text[start..]
            .find('\n')
            .map(|i| start + i + 1)
            .unwrap_or(start);
        if let Some(end) = text[start..].find("```") {
            return text[start..start + end].trim();
        }
    }

    text
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<CorrectionRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<CorrectionRecord>>::deserialize(deserializer)?.unwrap_or_default())
}
