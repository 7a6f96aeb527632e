//! Text extraction: native PDF text, falling back to render + OCR.
//!
//! ## Decision path
//!
//! ```text
//! .pdf  ──► native text ──(> min_native_words)──► done (no OCR engine built)
//!               │
//!               └─(too few words, or native read failed)──► render @ dpi ──► OCR
//! image ──────────────────────────────────────────────────────► decode ──► OCR
//! ```
//!
//! Every failure after input validation is reported as
//! [`InvoiceError::ExtractionFailed`] with the original cause attached. A
//! successful extraction never returns blank text: an OCR pass that
//! recognises nothing is a failure too.

pub mod input;
pub mod ocr;
pub mod pdf;

use crate::config::{ExtractionConfig, OcrBackendKind};
use crate::error::{ExtractionCause, InvoiceError, OcrError};
use input::InputKind;
use ocr::{OcrEngineFactory, SystemOcrFactory};
use pdf::{PdfBackend, PdfiumBackend};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Where the extracted text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "backend")]
pub enum TextSource {
    /// The PDF's own text layer.
    NativeText,
    /// An OCR engine read rendered pages or a raster input.
    Ocr(OcrBackendKind),
}

impl fmt::Display for TextSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextSource::NativeText => f.write_str("native text"),
            TextSource::Ocr(kind) => write!(f, "OCR ({kind})"),
        }
    }
}

/// Extracted text plus how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedText {
    pub text: String,
    pub source: TextSource,
}

/// Whitespace-separated word count, as used by the native-text threshold.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Runs the decision path over injectable PDF and OCR collaborators.
#[derive(Clone)]
pub struct TextExtractor {
    pdf: Arc<dyn PdfBackend>,
    ocr: Arc<dyn OcrEngineFactory>,
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new(Arc::new(PdfiumBackend), Arc::new(SystemOcrFactory))
    }
}

impl TextExtractor {
    pub fn new(pdf: Arc<dyn PdfBackend>, ocr: Arc<dyn OcrEngineFactory>) -> Self {
        Self { pdf, ocr }
    }

    /// Extract text from `path`. Blocking.
    pub fn extract(&self, path: &Path, config: &ExtractionConfig) -> Result<String, InvoiceError> {
        self.extract_detailed(path, config).map(|e| e.text)
    }

    /// Extract text from `path` and report which route produced it. Blocking.
    pub fn extract_detailed(
        &self,
        path: &Path,
        config: &ExtractionConfig,
    ) -> Result<ExtractedText, InvoiceError> {
        let start = Instant::now();
        let kind = input::classify(path)?;

        let images = match kind {
            InputKind::Pdf => {
                match self.pdf.native_text(path) {
                    Ok(text) => {
                        let words = word_count(&text);
                        if words > config.min_native_words {
                            info!(
                                "{}: {} words of native text in {}ms",
                                path.display(),
                                words,
                                start.elapsed().as_millis()
                            );
                            return Ok(ExtractedText {
                                text,
                                source: TextSource::NativeText,
                            });
                        }
                        info!(
                            "{}: only {} words of native text (need more than {}), using OCR",
                            path.display(),
                            words,
                            config.min_native_words
                        );
                    }
                    Err(e) => {
                        warn!(
                            "{}: native text extraction failed ({}), using OCR",
                            path.display(),
                            e
                        );
                    }
                }

                self.pdf
                    .render_pages(path, config.dpi)
                    .map_err(|e| InvoiceError::extraction(path, e))?
            }
            InputKind::Image => {
                vec![image::open(path).map_err(|e| InvoiceError::extraction(path, e))?]
            }
        };

        let engine = self
            .ocr
            .create(config.backend, config)
            .map_err(|e| InvoiceError::extraction(path, e))?;
        let text = ocr::read_images(engine.as_ref(), &images)
            .map_err(|e| InvoiceError::extraction(path, e))?;

        if text.trim().is_empty() {
            warn!("{}: OCR produced no text", path.display());
            return Err(InvoiceError::extraction(
                path,
                OcrError::OcrFailed(format!("no text recognised by {}", config.backend)),
            ));
        }
        info!(
            "{}: {} chars via {} from {} image(s) in {}ms",
            path.display(),
            text.len(),
            config.backend,
            images.len(),
            start.elapsed().as_millis()
        );

        Ok(ExtractedText {
            text,
            source: TextSource::Ocr(config.backend),
        })
    }

    /// Async wrapper: runs the blocking work on the blocking pool and applies
    /// `config.timeout_secs` when set.
    pub async fn extract_async(
        &self,
        path: &Path,
        config: &ExtractionConfig,
    ) -> Result<ExtractedText, InvoiceError> {
        let this = self.clone();
        let owned_path = path.to_path_buf();
        let owned_config = config.clone();
        let task =
            tokio::task::spawn_blocking(move || this.extract_detailed(&owned_path, &owned_config));

        let joined = match config.timeout_secs {
            Some(secs) => tokio::time::timeout(Duration::from_secs(secs), task)
                .await
                .map_err(|_| InvoiceError::extraction(path, ExtractionCause::Timeout { secs }))?,
            None => task.await,
        };

        joined.map_err(|e| {
            InvoiceError::extraction(
                path,
                ExtractionCause::Internal(format!("extraction task failed: {}", e)),
            )
        })?
    }
}

/// Extract text from an invoice file with the system PDF and OCR engines.
///
/// ```rust,no_run
/// use invoice_intel::{extract_text, ExtractionConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let text = extract_text("invoice.pdf", &ExtractionConfig::default()).await?;
///     println!("{text}");
///     Ok(())
/// }
/// ```
pub async fn extract_text(
    path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<String, InvoiceError> {
    TextExtractor::default()
        .extract_async(path.as_ref(), config)
        .await
        .map(|e| e.text)
}

/// Blocking form of [`extract_text`]. No timeout is applied.
pub fn extract_text_sync(
    path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<String, InvoiceError> {
    TextExtractor::default().extract(path.as_ref(), config)
}
