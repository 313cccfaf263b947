//! Gemini `generateContent` backend over blocking HTTP.
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};

use super::{
    build_prompt, parse_response, AnalysisError, AnalysisOutcome, AnalysisRequest,
    AnalysisService, Prompt,
};
use crate::ledger::TokenUsage;

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// HTTP client for one model.
pub struct GeminiService {
    agent: ureq::Agent,
    endpoint: String,
    model: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    candidates_token_count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CountTokensResponse {
    #[serde(default)]
    total_tokens: u64,
}

impl GeminiService {
    pub fn new(model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT, model, api_key)
    }

    pub fn with_endpoint(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    fn url(&self, method: &str) -> String {
        format!("{}/models/{}:{method}", self.endpoint, self.model)
    }

    /// POST a JSON body and return the status code and response text.
    fn post(&self, method: &str, body: &Value) -> Result<(u16, String), AnalysisError> {
        let mut response = self
            .agent
            .post(&self.url(method))
            .header("x-goog-api-key", &self.api_key)
            .send_json(body)
            .map_err(|err| AnalysisError::Transient(format!("{method}: {err}")))?;
        let status = response.status().as_u16();
        let text = response
            .body_mut()
            .read_to_string()
            .map_err(|err| AnalysisError::Transient(format!("{method}: read body: {err}")))?;
        Ok((status, text))
    }

    /// Best-effort input token count; failures count as zero.
    fn count_tokens(&self, prompt: &Prompt) -> u64 {
        let body = json!({
            "contents": [
                {"role": "user", "parts": [{"text": prompt.system}]},
                {"role": "user", "parts": [{"text": prompt.user}]},
            ]
        });
        let counted = self.post("countTokens", &body).and_then(|(status, text)| {
            if status != 200 {
                return Err(classify_status(status, &text));
            }
            serde_json::from_str::<CountTokensResponse>(&text)
                .map(|parsed| parsed.total_tokens)
                .map_err(|err| AnalysisError::Malformed(err.to_string()))
        });
        match counted {
            Ok(tokens) => tokens,
            Err(err) => {
                tracing::warn!(error = %err, "token count failed; counting 0");
                0
            }
        }
    }
}

impl AnalysisService for GeminiService {
    fn analyze(&self, request: &AnalysisRequest<'_>) -> Result<AnalysisOutcome, AnalysisError> {
        let prompt = build_prompt(request);
        let input_tokens = self.count_tokens(&prompt);
        let body = json!({
            "systemInstruction": {"parts": [{"text": prompt.system}]},
            "contents": [{"role": "user", "parts": [{"text": prompt.user}]}],
            "generationConfig": {
                "responseMimeType": "application/json",
                "temperature": 0.0,
            },
        });

        let start = Instant::now();
        let (status, text) = self.post("generateContent", &body)?;
        tracing::debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            status,
            response_bytes = text.len(),
            "gemini generateContent complete"
        );
        if status != 200 {
            return Err(classify_status(status, &text));
        }

        let generated: GenerateResponse = serde_json::from_str(&text)
            .map_err(|err| AnalysisError::Malformed(format!("decode envelope: {err}")))?;
        let output_tokens = generated
            .usage_metadata
            .as_ref()
            .map(|usage| usage.candidates_token_count)
            .unwrap_or(0);
        let payload = candidate_text(&generated)
            .ok_or_else(|| AnalysisError::Malformed("response has no candidate text".into()))?;
        Ok(AnalysisOutcome {
            response: parse_response(&payload)?,
            usage: TokenUsage::new(input_tokens, output_tokens),
        })
    }
}

fn candidate_text(response: &GenerateResponse) -> Option<String> {
    let parts = &response.candidates.first()?.content.as_ref()?.parts;
    let text: String = parts.iter().filter_map(|part| part.text.as_deref()).collect();
    (!text.trim().is_empty()).then_some(text)
}

/// Map a non-success HTTP status onto a failure class.
pub fn classify_status(status: u16, body: &str) -> AnalysisError {
    let detail = format!("HTTP {status}: {}", crate::util::preview(body, 300));
    let lower = body.to_lowercase();
    let bad_key = lower.contains("api_key_invalid")
        || lower.contains("api key not valid")
        || lower.contains("permission denied");
    match status {
        401 | 403 => AnalysisError::Authorization(detail),
        400 if bad_key => AnalysisError::Authorization(detail),
        _ => AnalysisError::Transient(detail),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_http_failures() {
        assert!(matches!(
            classify_status(403, "PERMISSION_DENIED"),
            AnalysisError::Authorization(_)
        ));
        assert!(matches!(
            classify_status(400, r#"{"error":{"status":"INVALID_ARGUMENT","details":[{"reason":"API_KEY_INVALID"}]}}"#),
            AnalysisError::Authorization(_)
        ));
        assert!(matches!(
            classify_status(429, "quota"),
            AnalysisError::Transient(_)
        ));
        assert!(matches!(classify_status(503, ""), AnalysisError::Transient(_)));
    }

    #[test]
    fn joins_candidate_parts() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"{\"summary\":"},{"text":"\"x\"}"}]}}],
                "usageMetadata":{"promptTokenCount":5,"candidatesTokenCount":7}}"#,
        )
        .unwrap();
        assert_eq!(candidate_text(&response).as_deref(), Some("{\"summary\":\"x\"}"));
        assert_eq!(response.usage_metadata.unwrap().candidates_token_count, 7);
    }

    #[test]
    fn empty_candidates_yield_nothing() {
        let response: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(candidate_text(&response).is_none());
    }

    #[test]
    fn unreachable_endpoint_is_transient() {
        let service = GeminiService::with_endpoint("http://127.0.0.1:9", "m", "k");
        let err = service
            .analyze(&AnalysisRequest {
                text: "نص",
                context: None,
            })
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Transient(_)));
    }
}
