//! Token accounting: unit counts roll up into document and run totals.
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

/// Tokens consumed by one analysis call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: Self) {
        self.input_tokens += rhs.input_tokens;
        self.output_tokens += rhs.output_tokens;
    }
}

/// Per-unit usage for one document, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentLedger {
    pub doc: String,
    pub units: Vec<UnitUsage>,
    pub total: TokenUsage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitUsage {
    pub unit_id: String,
    #[serde(flatten)]
    pub usage: TokenUsage,
}

impl DocumentLedger {
    pub fn new(doc: impl Into<String>) -> Self {
        Self {
            doc: doc.into(),
            ..Self::default()
        }
    }

    pub fn record(&mut self, unit_id: &str, usage: TokenUsage) {
        self.total += usage;
        self.units.push(UnitUsage {
            unit_id: unit_id.to_string(),
            usage,
        });
    }
}

/// Run-wide accumulator passed explicitly through processing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunLedger {
    pub documents: Vec<DocumentLedger>,
    pub total: TokenUsage,
}

impl RunLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a finished document into the run totals.
    pub fn absorb(&mut self, document: DocumentLedger) {
        self.total += document.total;
        self.documents.push(document);
    }
}
