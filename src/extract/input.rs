//! Input classification: decide how a file will be read before touching it.
//!
//! Only the extension matters. A `.pdf` goes through the native-text /
//! render path, a raster extension goes straight to OCR, and anything else
//! is rejected before any rendering or OCR work starts.

use crate::error::InvoiceError;
use std::path::Path;
use tracing::debug;

/// Raster extensions accepted for direct OCR (lower-case, no dot).
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tiff", "tif", "bmp"];

/// How an input file will be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Pdf,
    Image,
}

/// Validate that `path` exists and classify it by extension.
pub fn classify(path: &Path) -> Result<InputKind, InvoiceError> {
    if !path.exists() {
        return Err(InvoiceError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let kind = classify_extension(path)?;
    debug!("Classified {} as {:?}", path.display(), kind);
    Ok(kind)
}

/// Classify by extension alone (case-insensitive).
pub fn classify_extension(path: &Path) -> Result<InputKind, InvoiceError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    if ext == "pdf" {
        Ok(InputKind::Pdf)
    } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Ok(InputKind::Image)
    } else {
        Err(InvoiceError::InvalidInput {
            input: path.display().to_string(),
            reason: if ext.is_empty() {
                "Unsupported file type: no extension".to_string()
            } else {
                format!("Unsupported file type: .{ext}")
            },
        })
    }
}
