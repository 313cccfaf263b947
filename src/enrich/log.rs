//! Per-document enrichment log.
//!
//! One JSON line per unit, appended to `{slug}.enrich_log.jsonl`:
//!
//! ```jsonl
//! {"schema_version":1,"ts":1707900000000,"unit_id":"…--مادة-001","outcome":"enriched","attempts":1,...}
//! {"schema_version":1,"ts":1707900004100,"unit_id":"…--مادة-002","outcome":"degraded","attempts":3,...}
//! ```
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::ledger::TokenUsage;
use crate::paths::DocPaths;

pub const ENRICH_LOG_SCHEMA_VERSION: u32 = 1;

/// Final state of one unit after its attempt sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitOutcome {
    /// The service answered and the response was merged.
    Enriched,
    /// Every attempt failed; defaults were kept and links persisted.
    Degraded,
    /// The run stopped on this unit because credentials were rejected.
    Aborted,
}

impl fmt::Display for UnitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enriched => write!(f, "enriched"),
            Self::Degraded => write!(f, "degraded"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichLogEntry {
    pub schema_version: u32,
    /// Unix timestamp in milliseconds when the unit finished.
    pub ts: u64,
    pub unit_id: String,
    pub outcome: UnitOutcome,
    pub attempts: u32,
    pub duration_ms: u64,
    #[serde(flatten)]
    pub usage: TokenUsage,
    pub corrections: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}

/// Times one unit and produces its log entry.
pub struct EnrichLogBuilder {
    start: Instant,
    unit_id: String,
}

impl EnrichLogBuilder {
    pub fn new(unit_id: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            unit_id: unit_id.into(),
        }
    }

    pub fn enriched(self, attempts: u32, usage: TokenUsage, corrections: usize) -> EnrichLogEntry {
        self.build(UnitOutcome::Enriched, attempts, usage, corrections, None)
    }

    pub fn degraded(self, attempts: u32, kind: &str, error: impl Into<String>) -> EnrichLogEntry {
        self.build(
            UnitOutcome::Degraded,
            attempts,
            TokenUsage::default(),
            0,
            Some((kind.to_string(), error.into())),
        )
    }

    pub fn aborted(self, attempts: u32, error: impl Into<String>) -> EnrichLogEntry {
        self.build(
            UnitOutcome::Aborted,
            attempts,
            TokenUsage::default(),
            0,
            Some(("authorization".to_string(), error.into())),
        )
    }

    fn build(
        self,
        outcome: UnitOutcome,
        attempts: u32,
        usage: TokenUsage,
        corrections: usize,
        error: Option<(String, String)>,
    ) -> EnrichLogEntry {
        let (error_kind, error) = match error {
            Some((kind, message)) => (Some(kind), Some(message)),
            None => (None, None),
        };
        EnrichLogEntry {
            schema_version: ENRICH_LOG_SCHEMA_VERSION,
            ts: now_epoch_ms(),
            unit_id: self.unit_id,
            outcome,
            attempts,
            duration_ms: self.start.elapsed().as_millis() as u64,
            usage,
            corrections,
            error,
            error_kind,
        }
    }
}

/// Append one entry to the document's enrichment log.
pub fn append_enrich_log(paths: &DocPaths, entry: &EnrichLogEntry) -> Result<()> {
    let log_path = paths.enrich_log_path();
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("open enrich log for append: {}", log_path.display()))?;
    let line = serde_json::to_string(entry).context("serialize enrich log entry")?;
    writeln!(file, "{}", line).context("write enrich log entry")?;
    Ok(())
}

/// Load every entry, skipping corrupt lines.
pub fn load_enrich_log(paths: &DocPaths) -> Result<Vec<EnrichLogEntry>> {
    let log_path = paths.enrich_log_path();
    if !log_path.exists() {
        return Ok(Vec::new());
    }
    let text = fs::read_to_string(&log_path)
        .with_context(|| format!("read {}", log_path.display()))?;
    let mut entries = Vec::new();
    for (line_num, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<EnrichLogEntry>(line) {
            Ok(entry) => entries.push(entry),
            Err(err) => {
                tracing::warn!(line = line_num + 1, error = %err, "skip corrupt enrich log entry");
            }
        }
    }
    Ok(entries)
}

pub(crate) fn now_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}
