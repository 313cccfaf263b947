//! Config resolution and analysis backend construction.
use anyhow::Result;
use std::path::Path;

use crate::analysis::command::CommandService;
use crate::analysis::gemini::GeminiService;
use crate::analysis::AnalysisService;
use crate::cli::SettingsArgs;
use crate::config::{
    default_config, load_config, resolve_credential, validate_config, BackendConfig,
    PipelineConfig,
};

/// Load the config file (or defaults) and validate it.
pub fn load_settings(path: Option<&Path>) -> Result<PipelineConfig> {
    let config = match path {
        Some(path) => load_config(path)?,
        None => default_config(),
    };
    validate_config(&config)?;
    Ok(config)
}

/// Apply CLI overrides on top of the config file, then validate.
pub fn resolve_config(settings: &SettingsArgs) -> Result<PipelineConfig> {
    let mut config = match settings.config.as_deref() {
        Some(path) => load_config(path)?,
        None => default_config(),
    };
    if let Some(max_attempts) = settings.max_attempts {
        config.max_attempts = max_attempts;
    }
    if let Some(delay) = settings.retry_delay_secs {
        config.retry_delay_secs = delay;
    }
    if let Some(model) = &settings.model {
        config.model = model.clone();
    }
    if let Some(command) = &settings.analysis_command {
        config.backend = BackendConfig::Command {
            command: command.clone(),
        };
    }
    validate_config(&config)?;
    Ok(config)
}

/// Build the configured backend.
///
/// The Gemini backend needs its credential up front; a missing key fails
/// here, before any document is touched.
pub fn build_service(config: &PipelineConfig) -> Result<Box<dyn AnalysisService>> {
    match &config.backend {
        BackendConfig::Command { command } => {
            tracing::debug!(command = %command, "using analysis command");
            Ok(Box::new(CommandService::new(command)?))
        }
        BackendConfig::Gemini { endpoint } => {
            let api_key = resolve_credential()?;
            let service = match endpoint {
                Some(endpoint) => {
                    GeminiService::with_endpoint(endpoint.as_str(), config.model.as_str(), api_key)
                }
                None => GeminiService::new(config.model.as_str(), api_key),
            };
            tracing::debug!(model = %config.model, "using gemini backend");
            Ok(Box::new(service))
        }
    }
}
