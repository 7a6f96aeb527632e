//! PaddleOCR engine (ONNX Runtime through `paddle-ocr-rs`).
//!
//! Requires the `paddle` feature. Detection, angle classification and
//! recognition models are looked up in the configured model directory, then
//! in `<data dir>/invoice-intel/paddle-ocr/models`, and downloaded there with
//! curl or wget when missing. Downloads land in a `.part` file that is
//! renamed into place once complete.
//!
//! Paddle loads one recognition model, so only one language is used: English
//! when it was requested, otherwise the first requested language.

use crate::config::OcrLanguage;
use std::path::{Path, PathBuf};

/// The single language handed to the recogniser.
pub fn primary_language(languages: &[OcrLanguage]) -> OcrLanguage {
    if languages.contains(&OcrLanguage::En) {
        OcrLanguage::En
    } else {
        languages.first().copied().unwrap_or(OcrLanguage::En)
    }
}

/// Default model directory under the platform data dir.
pub fn default_model_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join("invoice-intel")
        .join("paddle-ocr")
        .join("models")
}

/// Sibling of `dest` that a download is written to before it is moved in.
#[cfg_attr(not(feature = "paddle"), allow(dead_code))]
fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

/// Run `fetch` against the partial path of `dest` and rename the result into
/// place only on success. A failed fetch leaves neither file behind.
#[cfg_attr(not(feature = "paddle"), allow(dead_code))]
fn fetch_into<E, F>(dest: &Path, fetch: F) -> Result<(), E>
where
    E: From<std::io::Error>,
    F: FnOnce(&Path) -> Result<(), E>,
{
    let part = partial_path(dest);
    match fetch(&part) {
        Ok(()) => {
            std::fs::rename(&part, dest)?;
            Ok(())
        }
        Err(e) => {
            let _ = std::fs::remove_file(&part);
            Err(e)
        }
    }
}

#[cfg(feature = "paddle")]
mod engine {
    use super::*;
    use crate::config::OcrBackendKind;
    use crate::error::OcrError;
    use crate::extract::ocr::{join_segments, OcrEngine};
    use image::{DynamicImage, ImageFormat};
    use paddle_ocr_rs::ocr_lite::OcrLite;
    use std::io::ErrorKind;
    use std::process::Command;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;
    use tracing::{debug, info, warn};

    const NUM_THREADS: usize = 4;

    const DET_MODEL_NAME: &str = "ch_PP-OCRv4_det_infer.onnx";
    const REC_MODEL_NAME: &str = "ch_PP-OCRv4_rec_infer.onnx";
    const CLS_MODEL_NAME: &str = "ch_ppocr_mobile_v2.0_cls_infer.onnx";
    /// Recognition model for non-English Latin scripts. Not downloaded.
    const LATIN_REC_MODEL_NAME: &str = "latin_PP-OCRv3_rec_infer.onnx";

    struct ModelSpec {
        url: &'static str,
        filename: &'static str,
    }

    const DET_MODEL: ModelSpec = ModelSpec {
        url: "https://huggingface.co/SWHL/RapidOCR/resolve/main/PP-OCRv4/ch_PP-OCRv4_det_infer.onnx",
        filename: DET_MODEL_NAME,
    };

    const REC_MODEL: ModelSpec = ModelSpec {
        url: "https://huggingface.co/SWHL/RapidOCR/resolve/main/PP-OCRv4/ch_PP-OCRv4_rec_infer.onnx",
        filename: REC_MODEL_NAME,
    };

    const CLS_MODEL: ModelSpec = ModelSpec {
        url: "https://www.modelscope.cn/models/RapidAI/RapidOCR/resolve/v3.4.0/onnx/PP-OCRv4/cls/ch_ppocr_mobile_v2.0_cls_infer.onnx",
        filename: CLS_MODEL_NAME,
    };

    pub struct PaddleEngine {
        ocr: Mutex<OcrLite>,
        workdir: TempDir,
        counter: AtomicUsize,
    }

    impl PaddleEngine {
        /// Locate (or fetch) the models and initialise the recogniser.
        pub fn new(languages: &[OcrLanguage], model_dir: Option<PathBuf>) -> Result<Self, OcrError> {
            let language = primary_language(languages);
            let dir = model_dir.unwrap_or_else(default_model_dir);
            std::fs::create_dir_all(&dir)?;

            for spec in [&DET_MODEL, &CLS_MODEL, &REC_MODEL] {
                ensure_model_file(spec, &dir)?;
            }

            let rec = recognition_model(&dir, language);
            let det = dir.join(DET_MODEL_NAME);
            let cls = dir.join(CLS_MODEL_NAME);
            info!(
                "Loading PaddleOCR models from {} (language: {})",
                dir.display(),
                language
            );

            let mut ocr = OcrLite::new();
            ocr.init_models(
                &det.to_string_lossy(),
                &cls.to_string_lossy(),
                &rec.to_string_lossy(),
                NUM_THREADS,
            )
            .map_err(|e| OcrError::OcrFailed(format!("Failed to init PaddleOCR: {}", e)))?;

            Ok(Self {
                ocr: Mutex::new(ocr),
                workdir: TempDir::new()?,
                counter: AtomicUsize::new(0),
            })
        }
    }

    impl OcrEngine for PaddleEngine {
        fn kind(&self) -> OcrBackendKind {
            OcrBackendKind::Paddle
        }

        fn read(&self, image: &DynamicImage) -> Result<String, OcrError> {
            let n = self.counter.fetch_add(1, Ordering::Relaxed);
            let path = self.workdir.path().join(format!("image-{n:03}.png"));
            image.save_with_format(&path, ImageFormat::Png)?;

            let mut ocr = self
                .ocr
                .lock()
                .map_err(|e| OcrError::OcrFailed(format!("Failed to lock OCR engine: {}", e)))?;

            let result = ocr
                .detect_from_path(
                    &path.to_string_lossy(),
                    50,    // padding
                    1024,  // max side length
                    0.5,   // box score threshold
                    0.3,   // box threshold
                    1.6,   // unclip ratio
                    true,  // angle classification
                    false, // most angle
                )
                .map_err(|e| OcrError::OcrFailed(format!("PaddleOCR detection failed: {}", e)))?;
            drop(ocr);
            let _ = std::fs::remove_file(&path);

            debug!("PaddleOCR found {} text blocks", result.text_blocks.len());
            Ok(join_segments(result.text_blocks.iter().map(|b| b.text.as_str())))
        }
    }

    fn recognition_model(dir: &Path, language: OcrLanguage) -> PathBuf {
        if language != OcrLanguage::En {
            let latin = dir.join(LATIN_REC_MODEL_NAME);
            if latin.exists() {
                return latin;
            }
            warn!(
                "{} not found in {}; recognising '{}' with the default model",
                LATIN_REC_MODEL_NAME,
                dir.display(),
                language
            );
        }
        dir.join(REC_MODEL_NAME)
    }

    fn ensure_model_file(spec: &ModelSpec, dir: &Path) -> Result<(), OcrError> {
        let dest = dir.join(spec.filename);
        if dest.exists() {
            return Ok(());
        }
        info!("Downloading {} into {}", spec.filename, dir.display());
        fetch_into(&dest, |part| download_file(spec.url, part)).map_err(|e| {
            OcrError::ModelNotFound(format!(
                "{} is missing and could not be downloaded: {}",
                spec.filename, e
            ))
        })
    }

    fn download_file(url: &str, dest: &Path) -> Result<(), OcrError> {
        let status = match Command::new("curl")
            .args(["-fsSL", "-o"])
            .arg(dest)
            .arg(url)
            .status()
        {
            Err(e) if e.kind() == ErrorKind::NotFound => Command::new("wget")
                .args(["-q", "-O"])
                .arg(dest)
                .arg(url)
                .status()
                .map_err(|_| {
                    OcrError::BackendNotAvailable(
                        "Neither curl nor wget found. Install one to download models.".to_string(),
                    )
                })?,
            other => other?,
        };

        if status.success() {
            Ok(())
        } else {
            Err(OcrError::OcrFailed(format!("Failed to download {}", url)))
        }
    }
}

#[cfg(not(feature = "paddle"))]
mod engine {
    use super::*;
    use crate::config::OcrBackendKind;
    use crate::error::OcrError;
    use crate::extract::ocr::OcrEngine;
    use image::DynamicImage;

    /// Placeholder used when the crate is built without the `paddle` feature.
    pub struct PaddleEngine {
        _private: (),
    }

    impl PaddleEngine {
        pub fn new(
            _languages: &[OcrLanguage],
            _model_dir: Option<PathBuf>,
        ) -> Result<Self, OcrError> {
            Err(OcrError::BackendNotAvailable(
                "PaddleOCR support is not compiled in (rebuild with `--features paddle`)"
                    .to_string(),
            ))
        }
    }

    impl OcrEngine for PaddleEngine {
        fn kind(&self) -> OcrBackendKind {
            OcrBackendKind::Paddle
        }

        fn read(&self, _image: &DynamicImage) -> Result<String, OcrError> {
            Err(OcrError::BackendNotAvailable(
                "PaddleOCR support is not compiled in".to_string(),
            ))
        }
    }
}

pub use engine::PaddleEngine;
