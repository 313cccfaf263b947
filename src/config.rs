//! Pipeline configuration.
//!
//! Settings come from built-in defaults, an optional JSON file and CLI
//! overrides, in that order, and are validated once before any work starts.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::context::DEFAULT_CONTEXT_MAX_CHARS;
use crate::enrich::retry::{RetryPolicy, DEFAULT_MAX_ATTEMPTS};
use crate::segment::{SegmentRules, DEFAULT_ARTICLE_LABEL, DEFAULT_BOUNDARY_HEADING};

pub const CONFIG_SCHEMA_VERSION: u32 = 1;
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 5;
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Problems that stop the pipeline before it touches any document.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unsupported config schema_version {found} (expected {expected})")]
    SchemaVersion { found: u32, expected: u32 },
    #[error("max_attempts must be at least 1")]
    NoAttempts,
    #[error("{field} must be non-empty")]
    EmptyField { field: &'static str },
    #[error("context_max_chars must be positive")]
    EmptyContext,
    #[error("environment variable {var} is not set; it is required for the gemini backend")]
    MissingCredential { var: &'static str },
}

/// Where unit analysis is sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Gemini over HTTPS; the key is read from the environment.
    Gemini {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        endpoint: Option<String>,
    },
    /// Local command reading the prompt on stdin.
    Command { command: String },
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Gemini { endpoint: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub schema_version: u32,
    pub max_attempts: u32,
    pub retry_delay_secs: u64,
    pub model: String,
    pub boundary_heading: String,
    pub article_label: String,
    pub context_max_chars: usize,
    pub backend: BackendConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        default_config()
    }
}

impl PipelineConfig {
    pub fn segment_rules(&self) -> SegmentRules {
        SegmentRules {
            boundary_heading: self.boundary_heading.clone(),
            article_label: self.article_label.clone(),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            delay: Duration::from_secs(self.retry_delay_secs),
        }
    }
}

/// Built-in defaults.
pub fn default_config() -> PipelineConfig {
    PipelineConfig {
        schema_version: CONFIG_SCHEMA_VERSION,
        max_attempts: DEFAULT_MAX_ATTEMPTS,
        retry_delay_secs: DEFAULT_RETRY_DELAY_SECS,
        model: DEFAULT_MODEL.to_string(),
        boundary_heading: DEFAULT_BOUNDARY_HEADING.to_string(),
        article_label: DEFAULT_ARTICLE_LABEL.to_string(),
        context_max_chars: DEFAULT_CONTEXT_MAX_CHARS,
        backend: BackendConfig::default(),
    }
}

/// Load a JSON config file; omitted keys keep their defaults.
pub fn load_config(path: &Path) -> Result<PipelineConfig> {
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let config: PipelineConfig = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse config JSON {}", path.display()))?;
    Ok(config)
}

/// Validate schema and user-provided values.
pub fn validate_config(config: &PipelineConfig) -> Result<(), ConfigError> {
    if config.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(ConfigError::SchemaVersion {
            found: config.schema_version,
            expected: CONFIG_SCHEMA_VERSION,
        });
    }
    if config.max_attempts == 0 {
        return Err(ConfigError::NoAttempts);
    }
    if config.context_max_chars == 0 {
        return Err(ConfigError::EmptyContext);
    }
    let fields = [
        ("boundary_heading", config.boundary_heading.as_str()),
        ("article_label", config.article_label.as_str()),
        ("model", config.model.as_str()),
    ];
    for (field, value) in fields {
        if value.trim().is_empty() {
            return Err(ConfigError::EmptyField { field });
        }
    }
    if let BackendConfig::Command { command } = &config.backend {
        if command.trim().is_empty() {
            return Err(ConfigError::EmptyField {
                field: "backend.command",
            });
        }
    }
    Ok(())
}

/// Read the API key for the HTTP backend.
pub fn resolve_credential() -> Result<String, ConfigError> {
    match env::var(API_KEY_ENV) {
        Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
        _ => Err(ConfigError::MissingCredential { var: API_KEY_ENV }),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
