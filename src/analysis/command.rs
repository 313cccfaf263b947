//! Local command backend.
//!
//! Invokes a user-configured command with the prompt on stdin and reads the
//! JSON answer from stdout. Any tool that accepts text and prints JSON works
//! (`llm`, `ollama run`, wrapper scripts).
//!
//! Exit status 77 reports rejected credentials; any other failure is treated
//! as transient.
use anyhow::{anyhow, Context, Result};
use std::io::Write;
use std::process::{Command, Stdio};
use std::time::Instant;

use super::{
    build_prompt, parse_response, AnalysisError, AnalysisOutcome, AnalysisRequest, AnalysisService,
};
use crate::ledger::TokenUsage;

/// Exit status a command uses to report an authorization failure.
pub const AUTHORIZATION_EXIT_CODE: i32 = 77;

#[derive(Debug, Clone)]
pub struct CommandService {
    argv: Vec<String>,
}

impl CommandService {
    /// Parse `command` with shell quoting rules.
    pub fn new(command: &str) -> Result<Self> {
        let argv = shell_words::split(command)
            .with_context(|| format!("parse analysis command: {command}"))?;
        if argv.is_empty() {
            return Err(anyhow!("analysis command is empty"));
        }
        Ok(Self { argv })
    }

    fn invoke(&self, prompt: &str) -> Result<String, AnalysisError> {
        let start = Instant::now();
        let mut child = Command::new(&self.argv[0])
            .args(&self.argv[1..])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| AnalysisError::Transient(format!("spawn {}: {err}", self.argv[0])))?;

        if let Some(mut stdin) = child.stdin.take() {
            // a command that exits without reading its input closes the pipe early
            if let Err(err) = stdin.write_all(prompt.as_bytes()) {
                tracing::debug!(error = %err, "analysis command did not read the full prompt");
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|err| AnalysisError::Transient(format!("wait for command: {err}")))?;
        tracing::debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            prompt_bytes = prompt.len(),
            response_bytes = output.stdout.len(),
            "analysis command complete"
        );

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let detail = format!("command exited with {}: {stderr}", output.status);
            return Err(match output.status.code() {
                Some(AUTHORIZATION_EXIT_CODE) => AnalysisError::Authorization(detail),
                _ => AnalysisError::Transient(detail),
            });
        }

        String::from_utf8(output.stdout)
            .map_err(|err| AnalysisError::Malformed(format!("stdout is not UTF-8: {err}")))
    }
}

impl AnalysisService for CommandService {
    fn analyze(&self, request: &AnalysisRequest<'_>) -> Result<AnalysisOutcome, AnalysisError> {
        let prompt = build_prompt(request);
        let input = format!("{}\n\n{}", prompt.system, prompt.user);
        let stdout = self.invoke(&input)?;
        let response = parse_response(&stdout)?;
        Ok(AnalysisOutcome {
            response,
            usage: TokenUsage::new(estimate_tokens(&input), estimate_tokens(&stdout)),
        })
    }
}

/// Word count used as a token estimate for local commands.
fn estimate_tokens(text: &str) -> u64 {
    text.split_whitespace().count() as u64
}
