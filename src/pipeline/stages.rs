//! The three pipeline stages.
//!
//! Each stage consumes an [`InvoiceState`] and returns the next one. The two
//! model-backed stages store the reply verbatim; neither parses nor checks
//! what came back. [`format_stage`] is the only deterministic step.

use crate::error::InvoiceError;
use crate::pipeline::llm::CompletionModel;
use crate::pipeline::Stage;
use crate::prompts::{parse_prompt, validate_prompt};
use crate::state::{InvoiceOutput, InvoiceState, ReviewStatus};
use tracing::{debug, info};

/// Ask the model to extract invoice fields from `raw_text`.
///
/// Runs even when `raw_text` is empty. The reply lands in `parsed_fields`
/// unmodified, whether or not it is valid JSON.
pub async fn parse_stage(
    model: &dyn CompletionModel,
    state: InvoiceState,
) -> Result<InvoiceState, InvoiceError> {
    info!("parse: {} chars of invoice text", state.raw_text.len());

    let reply = model
        .complete(&parse_prompt(&state.raw_text))
        .await
        .map_err(|e| InvoiceError::ModelCallFailed {
            stage: Stage::Parse,
            detail: e.to_string(),
        })?;
    debug!("parse: model replied with {} chars", reply.len());

    Ok(InvoiceState {
        parsed_fields: Some(reply),
        ..state
    })
}

/// Ask the model to check the extracted fields against the business rules.
///
/// The reply is either the literal `OK` or a markdown bullet list and is
/// stored in `anomaly_report` unmodified.
pub async fn validate_stage(
    model: &dyn CompletionModel,
    approval_threshold: u64,
    state: InvoiceState,
) -> Result<InvoiceState, InvoiceError> {
    let parsed = state
        .parsed_fields
        .as_deref()
        .ok_or(InvoiceError::MissingField {
            stage: Stage::Validate,
            field: "parsed_fields",
        })?;
    info!("validate: checking {} chars of extracted fields", parsed.len());

    let reply = model
        .complete(&validate_prompt(parsed, approval_threshold))
        .await
        .map_err(|e| InvoiceError::ModelCallFailed {
            stage: Stage::Validate,
            detail: e.to_string(),
        })?;
    debug!("validate: model replied with {} chars", reply.len());

    Ok(InvoiceState {
        anomaly_report: Some(reply),
        ..state
    })
}

/// Assemble the final output record. Pure and infallible.
pub fn format_stage(state: InvoiceState) -> InvoiceState {
    let output = build_output(state.parsed_fields.as_deref(), state.anomaly_report.as_deref());
    info!("format: status = {}", output.status);

    InvoiceState {
        output: Some(output),
        ..state
    }
}

/// `{invoice, anomaly_report, status}` from the two model replies.
pub fn build_output(parsed_fields: Option<&str>, anomaly_report: Option<&str>) -> InvoiceOutput {
    InvoiceOutput {
        invoice: parsed_fields.map(str::to_owned),
        anomaly_report: anomaly_report.map(str::to_owned),
        status: ReviewStatus::from_report(anomaly_report),
    }
}
