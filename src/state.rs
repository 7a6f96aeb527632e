//! The record that flows through the pipeline.
//!
//! [`InvoiceState`] starts with only `raw_text` set. Each stage takes the
//! state by value and hands back a new one with its own field filled in, so
//! no stage can observe a half-written record from another.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Literal reply the validate prompt asks for when nothing is wrong.
pub const ANOMALY_OK: &str = "OK";

/// Pipeline state: `{raw_text, parsed_fields, anomaly_report, output}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceState {
    /// Text pulled from the invoice file.
    pub raw_text: String,
    /// Raw model reply to the extraction prompt. Expected to be minified JSON
    /// but stored verbatim, whatever the model returned.
    pub parsed_fields: Option<String>,
    /// Raw model reply to the validation prompt: `OK` or markdown bullets.
    pub anomaly_report: Option<String>,
    /// Final decision record.
    pub output: Option<InvoiceOutput>,
}

impl InvoiceState {
    /// Initial state for one invocation.
    pub fn new(raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            ..Default::default()
        }
    }

    /// True once every stage has run.
    pub fn is_complete(&self) -> bool {
        self.parsed_fields.is_some() && self.anomaly_report.is_some() && self.output.is_some()
    }
}

/// Payload handed to downstream systems.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceOutput {
    /// Extracted fields, exactly as the model produced them.
    pub invoice: Option<String>,
    pub anomaly_report: Option<String>,
    pub status: ReviewStatus,
}

/// Whether an invoice can flow on automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Clean,
    NeedsReview,
}

impl ReviewStatus {
    /// `NeedsReview` iff a report exists and is anything other than `"OK"`.
    pub fn from_report(report: Option<&str>) -> Self {
        match report {
            Some(r) if r != ANOMALY_OK => ReviewStatus::NeedsReview,
            _ => ReviewStatus::Clean,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Clean => "clean",
            ReviewStatus::NeedsReview => "needs_review",
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
