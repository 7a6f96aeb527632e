//! OCR engines.
//!
//! An [`OcrEngine`] reads one raster image. Engines are built per extraction
//! by an [`OcrEngineFactory`], so a PDF with a usable text layer never loads
//! OCR models or looks up binaries.

pub mod paddle;
pub mod tesseract;

use crate::config::{ExtractionConfig, OcrBackendKind};
use crate::error::OcrError;
use image::DynamicImage;
use tracing::debug;

pub use paddle::PaddleEngine;
pub use tesseract::TesseractEngine;

/// Reads text from a single image.
pub trait OcrEngine: Send {
    fn kind(&self) -> OcrBackendKind;

    /// Text of `image`, segments joined with single spaces.
    fn read(&self, image: &DynamicImage) -> Result<String, OcrError>;
}

/// Builds the engine for one extraction.
pub trait OcrEngineFactory: Send + Sync {
    fn create(
        &self,
        kind: OcrBackendKind,
        config: &ExtractionConfig,
    ) -> Result<Box<dyn OcrEngine>, OcrError>;
}

/// Factory for the engines installed on this machine.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemOcrFactory;

impl OcrEngineFactory for SystemOcrFactory {
    fn create(
        &self,
        kind: OcrBackendKind,
        config: &ExtractionConfig,
    ) -> Result<Box<dyn OcrEngine>, OcrError> {
        match kind {
            OcrBackendKind::Tesseract => Ok(Box::new(TesseractEngine::new(&config.languages)?)),
            OcrBackendKind::Paddle => Ok(Box::new(PaddleEngine::new(
                &config.languages,
                config.paddle_model_dir.clone(),
            )?)),
        }
    }
}

/// OCR every image in order; per-image texts are joined with `\n`.
pub fn read_images(engine: &dyn OcrEngine, images: &[DynamicImage]) -> Result<String, OcrError> {
    let mut texts = Vec::with_capacity(images.len());
    for (idx, image) in images.iter().enumerate() {
        let text = engine.read(image)?;
        debug!(
            "{} read image {}/{}: {} chars",
            engine.kind(),
            idx + 1,
            images.len(),
            text.len()
        );
        texts.push(text);
    }
    Ok(texts.join("\n"))
}

/// Join recognised segments with single spaces, dropping blank ones.
pub(crate) fn join_segments<I, S>(segments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    segments
        .into_iter()
        .filter_map(|s| {
            let s = s.as_ref().trim();
            (!s.is_empty()).then(|| s.to_string())
        })
        .collect::<Vec<_>>()
        .join(" ")
}
