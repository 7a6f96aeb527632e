//! # invoice-intel
//!
//! Read invoices from PDFs and scanned images, extract their fields with a
//! language model, and flag anything that needs a human look.
//!
//! ## Pipeline Overview
//!
//! ```text
//! invoice file
//!  │
//!  ├─ 1. Extract   native PDF text, or render @ 300 DPI + OCR (spawn_blocking)
//!  ├─ 2. Parse     LLM → vendor, invoice_no, date, currency, total, line_items (JSON)
//!  ├─ 3. Validate  LLM → "OK" or a bullet list of anomalies
//!  └─ 4. Format    {invoice, anomaly_report, status}
//! ```
//!
//! Steps 2–4 form a fixed graph, `__start__ → parse → validate → format →
//! __end__`, see [`InvoiceGraph`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use invoice_intel::{process_file, ExtractionConfig, PipelineConfig, ReviewStatus};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from GEMINI_API_KEY / OPENAI_API_KEY / …
//!     let state = process_file(
//!         "invoice.pdf",
//!         &ExtractionConfig::default(),
//!         &PipelineConfig::default(),
//!     )
//!     .await?;
//!
//!     let output = state.output.expect("format stage always sets output");
//!     if output.status == ReviewStatus::NeedsReview {
//!         eprintln!("{}", output.anomaly_report.unwrap_or_default());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | Enables the `invoice-intel` binary (clap + anyhow + tracing-subscriber) |
//! | `paddle` | off     | PaddleOCR backend via ONNX Runtime (`paddle-ocr-rs`) |
//!
//! The tesseract backend needs the `tesseract` binary on `PATH`; PDF work
//! needs a pdfium shared library (see `PDFIUM_LIB_PATH`).

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod process;
pub mod progress;
pub mod prompts;
pub mod state;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ExtractionConfig, ExtractionConfigBuilder, OcrBackendKind, OcrLanguage, PipelineConfig,
    PipelineConfigBuilder,
};
pub use error::{ExtractionCause, InvoiceError, ModelError, OcrError, RenderError};
pub use extract::ocr::{OcrEngine, OcrEngineFactory};
pub use extract::pdf::PdfBackend;
pub use extract::{extract_text, extract_text_sync, ExtractedText, TextExtractor, TextSource};
pub use pipeline::graph::{InvoiceGraph, Topology};
pub use pipeline::llm::{CompletionModel, LlmCompletion};
pub use pipeline::Stage;
pub use process::{process_bytes, process_file, process_file_sync, InvoiceProcessor};
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback};
pub use state::{InvoiceOutput, InvoiceState, ReviewStatus};
