//! Configuration types for invoice extraction and validation.
//!
//! Two structs cover the two halves of a run:
//!
//! * [`ExtractionConfig`]: how text is pulled out of the file (OCR backend,
//!   languages, render DPI, native-text threshold). It affects only the
//!   extraction adapter.
//! * [`PipelineConfig`]: how the model is reached and prompted (provider,
//!   model, temperature, approval threshold).
//!
//! Both are built through builders that clamp obviously-wrong values and
//! validate the rest in `build()`.

use crate::error::InvoiceError;
use crate::pipeline::llm::CompletionModel;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// Native-text word count at or below which a PDF is treated as scanned.
pub const DEFAULT_MIN_NATIVE_WORDS: usize = 20;

/// Render resolution for scanned PDFs.
pub const DEFAULT_OCR_DPI: u32 = 300;

/// Invoice total above which the validate prompt asks for manual approval.
pub const DEFAULT_APPROVAL_THRESHOLD: u64 = 50_000;

/// Model used when a Gemini key is the only thing configured.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

// ── OCR selection ────────────────────────────────────────────────────────

/// Which OCR engine reads rendered pages and raster inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrBackendKind {
    /// General-purpose multilingual reader (tesseract). Default.
    #[default]
    Tesseract,
    /// PaddleOCR with text-angle classification; prefers the English model.
    Paddle,
}

impl OcrBackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OcrBackendKind::Tesseract => "tesseract",
            OcrBackendKind::Paddle => "paddle",
        }
    }
}

impl fmt::Display for OcrBackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OcrBackendKind {
    type Err = InvoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tesseract" => Ok(OcrBackendKind::Tesseract),
            "paddle" => Ok(OcrBackendKind::Paddle),
            other => Err(InvoiceError::InvalidInput {
                input: other.to_string(),
                reason: "OCR backend must be 'tesseract' or 'paddle'".into(),
            }),
        }
    }
}

/// Languages the OCR step can be asked to recognise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrLanguage {
    #[default]
    En,
    Fr,
    De,
    Es,
}

impl OcrLanguage {
    /// Two-letter code, as accepted on the command line.
    pub fn code(&self) -> &'static str {
        match self {
            OcrLanguage::En => "en",
            OcrLanguage::Fr => "fr",
            OcrLanguage::De => "de",
            OcrLanguage::Es => "es",
        }
    }

    /// Tesseract traineddata name.
    pub fn tesseract_code(&self) -> &'static str {
        match self {
            OcrLanguage::En => "eng",
            OcrLanguage::Fr => "fra",
            OcrLanguage::De => "deu",
            OcrLanguage::Es => "spa",
        }
    }
}

impl fmt::Display for OcrLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for OcrLanguage {
    type Err = InvoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(OcrLanguage::En),
            "fr" => Ok(OcrLanguage::Fr),
            "de" => Ok(OcrLanguage::De),
            "es" => Ok(OcrLanguage::Es),
            other => Err(InvoiceError::InvalidInput {
                input: other.to_string(),
                reason: "OCR language must be one of en, fr, de, es".into(),
            }),
        }
    }
}

// ── Extraction ───────────────────────────────────────────────────────────

/// Configuration for turning an invoice file into raw text.
///
/// # Example
/// ```rust
/// use invoice_intel::{ExtractionConfig, OcrBackendKind, OcrLanguage};
///
/// let config = ExtractionConfig::builder()
///     .backend(OcrBackendKind::Paddle)
///     .languages(vec![OcrLanguage::Fr, OcrLanguage::En])
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 300);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// OCR engine for scanned PDFs and images. Default: tesseract.
    pub backend: OcrBackendKind,

    /// Languages handed to the OCR engine, in priority order. Default: `[en]`.
    pub languages: Vec<OcrLanguage>,

    /// Render resolution for scanned PDF pages. Range: 72–600. Default: 300.
    pub dpi: u32,

    /// A PDF whose native text has at most this many words is OCR'd. Default: 20.
    pub min_native_words: usize,

    /// Overall time budget for one extraction. Default: none.
    pub timeout_secs: Option<u64>,

    /// Directory holding PaddleOCR `.onnx` models. Default: platform data dir.
    pub paddle_model_dir: Option<PathBuf>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            backend: OcrBackendKind::default(),
            languages: vec![OcrLanguage::En],
            dpi: DEFAULT_OCR_DPI,
            min_native_words: DEFAULT_MIN_NATIVE_WORDS,
            timeout_secs: None,
            paddle_model_dir: None,
        }
    }
}

impl ExtractionConfig {
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn backend(mut self, backend: OcrBackendKind) -> Self {
        self.config.backend = backend;
        self
    }

    /// Duplicates are dropped, first occurrence wins.
    pub fn languages(mut self, languages: Vec<OcrLanguage>) -> Self {
        let mut unique = Vec::with_capacity(languages.len());
        for lang in languages {
            if !unique.contains(&lang) {
                unique.push(lang);
            }
        }
        self.config.languages = unique;
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn min_native_words(mut self, words: usize) -> Self {
        self.config.min_native_words = words;
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = Some(secs);
        self
    }

    pub fn paddle_model_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.paddle_model_dir = Some(dir.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, InvoiceError> {
        let c = &self.config;
        if c.languages.is_empty() {
            return Err(InvoiceError::InvalidConfig(
                "At least one OCR language is required".into(),
            ));
        }
        if c.dpi < 72 || c.dpi > 600 {
            return Err(InvoiceError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        if c.timeout_secs == Some(0) {
            return Err(InvoiceError::InvalidConfig(
                "Extraction timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Pipeline ─────────────────────────────────────────────────────────────

/// Configuration for the parse → validate → format pipeline.
#[derive(Clone)]
pub struct PipelineConfig {
    /// LLM model identifier. If None, the provider default (or
    /// `gemini-2.5-flash` when falling back to Gemini) is used.
    pub model: Option<String>,

    /// LLM provider name (e.g. "gemini", "openai", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Pre-constructed completion model. Takes precedence over every
    /// provider setting; used to plug in custom clients.
    pub completion_model: Option<Arc<dyn CompletionModel>>,

    /// Sampling temperature. Default: 0.1.
    pub temperature: f32,

    /// Maximum tokens the model may generate per call. Default: 4096.
    pub max_tokens: usize,

    /// Invoice total requiring manual approval. Default: 50 000.
    pub approval_threshold: u64,

    /// Optional observer for extraction and stage events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            completion_model: None,
            temperature: 0.1,
            max_tokens: 4096,
            approval_threshold: DEFAULT_APPROVAL_THRESHOLD,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field(
                "completion_model",
                &self.completion_model.as_ref().map(|_| "<dyn CompletionModel>"),
            )
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("approval_threshold", &self.approval_threshold)
            .finish()
    }
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn completion_model(mut self, model: Arc<dyn CompletionModel>) -> Self {
        self.config.completion_model = Some(model);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn approval_threshold(mut self, total: u64) -> Self {
        self.config.approval_threshold = total;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, InvoiceError> {
        if self.config.max_tokens == 0 {
            return Err(InvoiceError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_defaults() {
        let c = ExtractionConfig::default();
        assert_eq!(c.backend, OcrBackendKind::Tesseract);
        assert_eq!(c.languages, vec![OcrLanguage::En]);
        assert_eq!(c.dpi, 300);
        assert_eq!(c.min_native_words, 20);
        assert!(c.timeout_secs.is_none());
    }

    #[test]
    fn builder_dedups_languages() {
        let c = ExtractionConfig::builder()
            .languages(vec![OcrLanguage::De, OcrLanguage::En, OcrLanguage::De])
            .build()
            .unwrap();
        assert_eq!(c.languages, vec![OcrLanguage::De, OcrLanguage::En]);
    }

    #[test]
    fn builder_rejects_empty_languages() {
        let err = ExtractionConfig::builder()
            .languages(vec![])
            .build()
            .unwrap_err();
        assert!(matches!(err, InvoiceError::InvalidConfig(_)));
    }

    #[test]
    fn builder_clamps_dpi() {
        let c = ExtractionConfig::builder().dpi(10_000).build().unwrap();
        assert_eq!(c.dpi, 600);
    }

    #[test]
    fn backend_from_str() {
        assert_eq!("paddle".parse::<OcrBackendKind>().unwrap(), OcrBackendKind::Paddle);
        assert_eq!(
            " Tesseract ".parse::<OcrBackendKind>().unwrap(),
            OcrBackendKind::Tesseract
        );
        let err = "easyocr2".parse::<OcrBackendKind>().unwrap_err();
        assert!(matches!(err, InvoiceError::InvalidInput { .. }));
    }

    #[test]
    fn language_from_str() {
        assert_eq!("FR".parse::<OcrLanguage>().unwrap(), OcrLanguage::Fr);
        assert!(matches!(
            "it".parse::<OcrLanguage>(),
            Err(InvoiceError::InvalidInput { .. })
        ));
    }

    #[test]
    fn tesseract_codes() {
        assert_eq!(OcrLanguage::Es.tesseract_code(), "spa");
        assert_eq!(OcrLanguage::De.tesseract_code(), "deu");
    }

    #[test]
    fn pipeline_defaults() {
        let c = PipelineConfig::default();
        assert_eq!(c.temperature, 0.1);
        assert_eq!(c.max_tokens, 4096);
        assert_eq!(c.approval_threshold, 50_000);
    }

    #[test]
    fn pipeline_builder_rejects_zero_tokens() {
        assert!(PipelineConfig::builder().max_tokens(0).build().is_err());
    }

    #[test]
    fn backend_serde_lowercase() {
        let json = serde_json::to_string(&OcrBackendKind::Paddle).unwrap();
        assert_eq!(json, "\"paddle\"");
    }
}
