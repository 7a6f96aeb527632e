//! End-to-end entry points: invoice file (or upload bytes) → final state.
//!
//! The model client is resolved before any extraction work so a missing API
//! key fails fast instead of after a slow OCR pass.

use crate::config::{ExtractionConfig, PipelineConfig};
use crate::error::InvoiceError;
use crate::extract::TextExtractor;
use crate::pipeline::graph::InvoiceGraph;
use crate::pipeline::llm::{resolve_model, CompletionModel};
use crate::progress::ProgressCallback;
use crate::state::InvoiceState;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Extraction plus pipeline, with injectable collaborators.
#[derive(Clone)]
pub struct InvoiceProcessor {
    extractor: TextExtractor,
    graph: InvoiceGraph,
    progress: Option<ProgressCallback>,
}

impl InvoiceProcessor {
    pub fn new(extractor: TextExtractor, model: Arc<dyn CompletionModel>, config: &PipelineConfig) -> Self {
        Self {
            extractor,
            graph: InvoiceGraph::with_config(model, config),
            progress: config.progress_callback.clone(),
        }
    }

    /// System extractor and the model resolved from `config`.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, InvoiceError> {
        let model = resolve_model(config)?;
        Ok(Self::new(TextExtractor::default(), model, config))
    }

    pub fn graph(&self) -> &InvoiceGraph {
        &self.graph
    }

    /// Extract text from `path` and run every stage over it.
    pub async fn process_file(
        &self,
        path: impl AsRef<Path>,
        extraction: &ExtractionConfig,
    ) -> Result<InvoiceState, InvoiceError> {
        let path = path.as_ref();
        let start = Instant::now();
        info!("Processing {}", path.display());

        if let Some(ref cb) = self.progress {
            cb.on_extraction_start(&path.display().to_string());
        }
        let extracted = self.extractor.extract_async(path, extraction).await?;
        if let Some(ref cb) = self.progress {
            cb.on_extraction_complete(extracted.source, extracted.text.len());
        }

        let state = self.graph.run(InvoiceState::new(extracted.text)).await?;
        info!(
            "Processed {} in {}ms",
            path.display(),
            start.elapsed().as_millis()
        );
        Ok(state)
    }

    /// Process an uploaded file given as bytes plus its original extension.
    ///
    /// The bytes go to a temporary file carrying the same suffix so the
    /// extension-based routing applies. The file is removed on return.
    pub async fn process_bytes(
        &self,
        bytes: &[u8],
        extension: &str,
        extraction: &ExtractionConfig,
    ) -> Result<InvoiceState, InvoiceError> {
        let suffix = format!(".{}", extension.trim_start_matches('.'));
        let mut upload = tempfile::Builder::new()
            .prefix("invoice-upload-")
            .suffix(&suffix)
            .tempfile()
            .map_err(|e| InvoiceError::Internal(format!("could not create upload file: {}", e)))?;
        upload
            .write_all(bytes)
            .and_then(|_| upload.flush())
            .map_err(|e| InvoiceError::Internal(format!("could not write upload file: {}", e)))?;

        self.process_file(upload.path(), extraction).await
    }
}

/// Extract text from `path` and run it through parse → validate → format.
///
/// ```rust,no_run
/// use invoice_intel::{process_file, ExtractionConfig, PipelineConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let state = process_file(
///         "invoice.pdf",
///         &ExtractionConfig::default(),
///         &PipelineConfig::default(),
///     )
///     .await?;
///     println!("{:?}", state.output);
///     Ok(())
/// }
/// ```
pub async fn process_file(
    path: impl AsRef<Path>,
    extraction: &ExtractionConfig,
    pipeline: &PipelineConfig,
) -> Result<InvoiceState, InvoiceError> {
    InvoiceProcessor::from_config(pipeline)?
        .process_file(path, extraction)
        .await
}

/// [`process_file`] for upload bytes with their original extension.
pub async fn process_bytes(
    bytes: &[u8],
    extension: &str,
    extraction: &ExtractionConfig,
    pipeline: &PipelineConfig,
) -> Result<InvoiceState, InvoiceError> {
    InvoiceProcessor::from_config(pipeline)?
        .process_bytes(bytes, extension, extraction)
        .await
}

/// Blocking form of [`process_file`]. Creates its own tokio runtime, so it
/// must not be called from inside one.
pub fn process_file_sync(
    path: impl AsRef<Path>,
    extraction: &ExtractionConfig,
    pipeline: &PipelineConfig,
) -> Result<InvoiceState, InvoiceError> {
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| InvoiceError::Internal(format!("failed to create tokio runtime: {}", e)))?;
    rt.block_on(process_file(path, extraction, pipeline))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use async_trait::async_trait;

    struct Unused;

    #[async_trait]
    impl CompletionModel for Unused {
        async fn complete(&self, _prompt: &str) -> Result<String, ModelError> {
            panic!("model must not be called");
        }
    }

    #[tokio::test]
    async fn unsupported_upload_never_reaches_model() {
        let processor =
            InvoiceProcessor::new(TextExtractor::default(), Arc::new(Unused), &PipelineConfig::default());
        let err = processor
            .process_bytes(b"PK\x03\x04", "docx", &ExtractionConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, InvoiceError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn missing_file_never_reaches_model() {
        let processor =
            InvoiceProcessor::new(TextExtractor::default(), Arc::new(Unused), &PipelineConfig::default());
        let err = processor
            .process_file("/no/such/invoice.png", &ExtractionConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, InvoiceError::NotFound { .. }));
    }
}
