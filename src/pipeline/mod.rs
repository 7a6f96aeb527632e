//! The invoice pipeline: parse → validate → format.
//!
//! ## Data Flow
//!
//! ```text
//! raw_text ──▶ parse ──▶ validate ──▶ format ──▶ output
//!              (LLM)     (LLM)        (pure)
//! ```
//!
//! 1. [`stages::parse_stage`]: ask the model for the invoice fields as JSON
//! 2. [`stages::validate_stage`]: ask the model to check the business rules
//! 3. [`stages::format_stage`]: assemble `{invoice, anomaly_report, status}`
//!
//! [`graph::InvoiceGraph`] runs the three in that fixed order. [`llm`] holds
//! the model seam the first two stages call through.

pub mod graph;
pub mod llm;
pub mod stages;

use serde::{Deserialize, Serialize};
use std::fmt;

/// One step of the fixed pipeline path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Parse,
    Validate,
    Format,
}

impl Stage {
    /// Execution order.
    pub const ORDER: [Stage; 3] = [Stage::Parse, Stage::Validate, Stage::Format];

    /// Node name in the pipeline topology.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Parse => "parse",
            Stage::Validate => "validate",
            Stage::Format => "format",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
