//! Tesseract engine, driven through the `tesseract` command-line tool.
//!
//! Each image is written as a PNG into a private temp directory and read with
//! `tesseract <img> stdout -l eng+fra…`. Output lines are joined with spaces.

use super::{join_segments, OcrEngine};
use crate::config::{OcrBackendKind, OcrLanguage};
use crate::error::OcrError;
use image::{DynamicImage, ImageFormat};
use std::io::ErrorKind;
use std::path::Path;
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use tracing::debug;

const TESSERACT_BIN: &str = "tesseract";

pub struct TesseractEngine {
    languages: String,
    workdir: TempDir,
    counter: AtomicUsize,
}

impl TesseractEngine {
    /// Probe for the binary and prepare a scratch directory.
    pub fn new(languages: &[OcrLanguage]) -> Result<Self, OcrError> {
        match Command::new(TESSERACT_BIN).arg("--version").output() {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(OcrError::BackendNotAvailable(
                    "tesseract not found (install tesseract-ocr)".to_string(),
                ))
            }
            Err(e) => return Err(OcrError::Io(e)),
        }

        Ok(Self {
            languages: language_arg(languages),
            workdir: TempDir::new()?,
            counter: AtomicUsize::new(0),
        })
    }

    fn run(&self, image_path: &Path) -> Result<String, OcrError> {
        let output = Command::new(TESSERACT_BIN)
            .arg(image_path)
            .arg("stdout")
            .args(["-l", &self.languages])
            .output();

        match output {
            Ok(output) if output.status.success() => {
                Ok(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(OcrError::OcrFailed(format!("tesseract failed: {}", stderr.trim())))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(OcrError::BackendNotAvailable(
                "tesseract not found (install tesseract-ocr)".to_string(),
            )),
            Err(e) => Err(OcrError::Io(e)),
        }
    }
}

impl OcrEngine for TesseractEngine {
    fn kind(&self) -> OcrBackendKind {
        OcrBackendKind::Tesseract
    }

    fn read(&self, image: &DynamicImage) -> Result<String, OcrError> {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let path = self.workdir.path().join(format!("image-{n:03}.png"));
        image.save_with_format(&path, ImageFormat::Png)?;
        debug!("tesseract -l {} {}", self.languages, path.display());

        let stdout = self.run(&path)?;
        let _ = std::fs::remove_file(&path);
        Ok(join_segments(stdout.lines()))
    }
}

/// `eng+fra` style language argument, in the requested order.
fn language_arg(languages: &[OcrLanguage]) -> String {
    if languages.is_empty() {
        return OcrLanguage::En.tesseract_code().to_string();
    }
    languages
        .iter()
        .map(|l| l.tesseract_code())
        .collect::<Vec<_>>()
        .join("+")
}
