//! Error types for the invoice-intel library.
//!
//! Every fatal failure surfaces as one [`InvoiceError`]. Callers see the same
//! three input-side kinds no matter which internal step broke:
//!
//! * [`InvoiceError::NotFound`]: the input path does not exist.
//! * [`InvoiceError::InvalidInput`]: unsupported extension, unknown backend
//!   or language name.
//! * [`InvoiceError::ExtractionFailed`]: anything that went wrong while
//!   rendering, decoding or OCR-ing. The originating failure is kept in
//!   [`ExtractionCause`] so diagnostics can still tell a missing pdfium
//!   library apart from a corrupt file.
//!
//! Model failures during the parse and validate stages are never caught
//! locally; they become [`InvoiceError::ModelCallFailed`] and abort the run.

use crate::pipeline::Stage;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the invoice-intel library.
#[derive(Debug, Error)]
pub enum InvoiceError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Invoice file not found: '{path}'\nCheck the path exists and is readable.")]
    NotFound { path: PathBuf },

    /// Unsupported file type or an unrecognised option value.
    #[error("Invalid input '{input}': {reason}")]
    InvalidInput { input: String, reason: String },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// Rendering, decoding or OCR failed. Always carries the original cause.
    #[error("Text extraction failed for '{path}': {cause}")]
    ExtractionFailed {
        path: PathBuf,
        #[source]
        cause: ExtractionCause,
    },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The language-model call of a pipeline stage failed.
    #[error("LLM call failed during the {stage} stage: {detail}")]
    ModelCallFailed { stage: Stage, detail: String },

    /// A stage was handed a state without the field it consumes.
    #[error("The {stage} stage requires '{field}', which is not set")]
    MissingField { stage: Stage, field: &'static str },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl InvoiceError {
    /// Wrap any extraction failure for `path` into the uniform error kind.
    pub(crate) fn extraction(path: impl Into<PathBuf>, cause: impl Into<ExtractionCause>) -> Self {
        InvoiceError::ExtractionFailed {
            path: path.into(),
            cause: cause.into(),
        }
    }
}

/// Failure reported by a [`crate::pipeline::llm::CompletionModel`].
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ModelError(pub String);

/// Why text extraction failed.
#[derive(Debug, Error)]
pub enum ExtractionCause {
    /// PDF rendering failed.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// A raster input could not be decoded.
    #[error("image could not be decoded: {0}")]
    ImageLoad(#[from] image::ImageError),

    /// The OCR backend failed or is unavailable.
    #[error(transparent)]
    Ocr(#[from] OcrError),

    /// Extraction exceeded the configured time budget.
    #[error("extraction timed out after {secs}s")]
    Timeout { secs: u64 },

    /// A blocking extraction task panicked or was cancelled.
    #[error("{0}")]
    Internal(String),
}

/// Failures of the PDF rendering collaborator.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    /// No pdfium library could be bound.
    #[error(
        "PDF rendering engine unavailable: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    EngineMissing(String),

    /// The PDF is encrypted.
    #[error("PDF is encrypted and requires a password")]
    PasswordRequired,

    /// The PDF could not be parsed (bad header, xref or object syntax).
    #[error("PDF syntax error: {0}")]
    Syntax(String),

    /// The file could not be opened as a PDF at all.
    #[error("PDF is corrupt or unreadable: {0}")]
    Corrupt(String),

    /// pdfium returned an error for a specific page.
    #[error("rasterisation failed for page {page}: {detail}")]
    Rasterisation { page: usize, detail: String },
}

/// Failures of an OCR backend.
#[derive(Debug, Error)]
pub enum OcrError {
    /// The engine binary or feature is not present.
    #[error("OCR backend not available: {0}")]
    BackendNotAvailable(String),

    /// Model files are missing and could not be fetched.
    #[error("OCR model not found: {0}")]
    ModelNotFound(String),

    /// The engine ran and reported an error.
    #[error("OCR failed: {0}")]
    OcrFailed(String),

    #[error("OCR I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Could not write the page image handed to the engine.
    #[error("OCR image encoding failed: {0}")]
    Image(#[from] image::ImageError),
}
