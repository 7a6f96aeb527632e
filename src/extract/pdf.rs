//! PDF collaborator: native text layer and page rasterisation via pdfium.
//!
//! [`PdfBackend`] is the seam the extractor calls through; [`PdfiumBackend`]
//! is the production implementation. Both operations are blocking and are
//! run inside `spawn_blocking` by the async entry points.
//!
//! pdfium is bound per call. `PDFIUM_LIB_PATH` (a library file or the
//! directory holding it) wins; otherwise the working directory and then the
//! system library search path are tried. A failed bind is reported as
//! [`RenderError::EngineMissing`].

use crate::error::RenderError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Points per inch in PDF user space.
const PDF_POINTS_PER_INCH: f32 = 72.0;

/// Native text extraction and page rendering for one PDF file.
pub trait PdfBackend: Send + Sync {
    /// Text layer of every page, each page trimmed, joined with `\n`.
    fn native_text(&self, path: &Path) -> Result<String, RenderError>;

    /// Every page rendered at `dpi`, in page order.
    fn render_pages(&self, path: &Path, dpi: u32) -> Result<Vec<DynamicImage>, RenderError>;
}

/// [`PdfBackend`] backed by the pdfium library.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfiumBackend;

impl PdfBackend for PdfiumBackend {
    fn native_text(&self, path: &Path) -> Result<String, RenderError> {
        let pdfium = bind_pdfium()?;
        let document = pdfium
            .load_pdf_from_file(path, None)
            .map_err(classify_load_error)?;

        let mut pages = Vec::new();
        for (idx, page) in document.pages().iter().enumerate() {
            let text = page
                .text()
                .map_err(|e| RenderError::Corrupt(format!("page {}: {:?}", idx + 1, e)))?;
            pages.push(text.all().trim().to_string());
        }

        debug!("Native text read from {} pages", pages.len());
        Ok(pages.join("\n").trim().to_string())
    }

    fn render_pages(&self, path: &Path, dpi: u32) -> Result<Vec<DynamicImage>, RenderError> {
        let pdfium = bind_pdfium()?;
        let document = pdfium
            .load_pdf_from_file(path, None)
            .map_err(classify_load_error)?;

        let pages = document.pages();
        info!("Rendering {} pages at {} DPI", pages.len(), dpi);

        let render_config =
            PdfRenderConfig::new().scale_page_by_factor(dpi as f32 / PDF_POINTS_PER_INCH);

        let mut images = Vec::with_capacity(pages.len() as usize);
        for (idx, page) in pages.iter().enumerate() {
            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                RenderError::Rasterisation {
                    page: idx + 1,
                    detail: format!("{:?}", e),
                }
            })?;

            let image = bitmap.as_image();
            debug!(
                "Rendered page {} → {}x{} px",
                idx + 1,
                image.width(),
                image.height()
            );
            images.push(image);
        }

        Ok(images)
    }
}

/// Bind to a pdfium shared library.
fn bind_pdfium() -> Result<Pdfium, RenderError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(p) if !p.is_empty() => {
            let path = PathBuf::from(p);
            let lib = if path.is_dir() {
                Pdfium::pdfium_platform_library_name_at_path(&path)
            } else {
                path
            };
            Pdfium::bind_to_library(lib)
        }
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| RenderError::EngineMissing(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

/// Write an A4 PDF with one line of Helvetica text per entry of `pages`.
///
/// Used to build fixtures at test time so PDF paths can be exercised without
/// checked-in binaries.
#[doc(hidden)]
pub fn write_text_pdf(path: &Path, pages: &[&str]) -> Result<(), RenderError> {
    let pdfium = bind_pdfium()?;
    let write_err = |e: PdfiumError| RenderError::Corrupt(format!("{:?}", e));

    let mut document = pdfium.create_new_pdf().map_err(write_err)?;
    let font = document.fonts_mut().helvetica();
    for text in pages {
        let mut page = document
            .pages_mut()
            .create_page_at_end(PdfPagePaperSize::a4())
            .map_err(write_err)?;
        page.objects_mut()
            .create_text_object(
                PdfPoints::new(72.0),
                PdfPoints::new(720.0),
                text,
                font,
                PdfPoints::new(12.0),
            )
            .map_err(write_err)?;
    }
    document.save_to_file(path).map_err(write_err)
}

/// Map a pdfium load failure onto the render error kinds.
fn classify_load_error(e: PdfiumError) -> RenderError {
    classify_load_detail(format!("{:?}", e))
}

fn classify_load_detail(detail: String) -> RenderError {
    if detail.contains("Password") || detail.contains("password") {
        RenderError::PasswordRequired
    } else if detail.contains("FormatError") {
        RenderError::Syntax(detail)
    } else {
        RenderError::Corrupt(detail)
    }
}
