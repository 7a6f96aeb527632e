//! End-to-end tests for invoice-intel.
//!
//! Most tests drive the full file → state path with scripted PDF, OCR and
//! model collaborators, so they need neither pdfium, tesseract nor an API key.
//! PDFs that go through pdfium are generated at test time and the test is
//! skipped when no pdfium library can be bound.
//!
//! `live_invoice_roundtrip` makes real calls and is gated behind the
//! `E2E_ENABLED` environment variable:
//!   E2E_ENABLED=1 GEMINI_API_KEY=… cargo test --test e2e -- --nocapture

use async_trait::async_trait;
use image::{DynamicImage, RgbImage};
use invoice_intel::{
    CompletionModel, ExtractionConfig, InvoiceError, InvoiceGraph, InvoiceProcessor,
    InvoiceState, ModelError, OcrBackendKind, OcrEngine, OcrEngineFactory, OcrError, OcrLanguage,
    PdfBackend, PipelineConfig, PipelineProgressCallback, RenderError, ReviewStatus, Stage,
    TextExtractor, TextSource,
};
use invoice_intel::extract::pdf::{write_text_pdf, PdfiumBackend};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Scripted collaborators ───────────────────────────────────────────────────

/// PDF backend with a fixed text layer and page count.
struct ScriptedPdf {
    native: String,
    pages: usize,
    native_calls: AtomicUsize,
    render_calls: AtomicUsize,
}

impl ScriptedPdf {
    fn new(native: &str, pages: usize) -> Arc<Self> {
        Arc::new(Self {
            native: native.to_string(),
            pages,
            native_calls: AtomicUsize::new(0),
            render_calls: AtomicUsize::new(0),
        })
    }
}

impl PdfBackend for ScriptedPdf {
    fn native_text(&self, _path: &Path) -> Result<String, RenderError> {
        self.native_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.native.clone())
    }

    fn render_pages(&self, _path: &Path, _dpi: u32) -> Result<Vec<DynamicImage>, RenderError> {
        self.render_calls.fetch_add(1, Ordering::SeqCst);
        Ok((0..self.pages)
            .map(|_| DynamicImage::ImageRgb8(RgbImage::new(8, 8)))
            .collect())
    }
}

/// OCR factory whose engine returns a fixed text per image and records the
/// languages it was built with.
struct ScriptedOcr {
    text: &'static str,
    created: AtomicUsize,
    reads: Arc<AtomicUsize>,
    languages: Mutex<Vec<OcrLanguage>>,
}

impl ScriptedOcr {
    fn new(text: &'static str) -> Arc<Self> {
        Arc::new(Self {
            text,
            created: AtomicUsize::new(0),
            reads: Arc::new(AtomicUsize::new(0)),
            languages: Mutex::new(Vec::new()),
        })
    }
}

struct ScriptedEngine {
    kind: OcrBackendKind,
    text: &'static str,
    reads: Arc<AtomicUsize>,
}

impl OcrEngine for ScriptedEngine {
    fn kind(&self) -> OcrBackendKind {
        self.kind
    }

    fn read(&self, _image: &DynamicImage) -> Result<String, OcrError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.text.to_string())
    }
}

impl OcrEngineFactory for ScriptedOcr {
    fn create(
        &self,
        kind: OcrBackendKind,
        config: &ExtractionConfig,
    ) -> Result<Box<dyn OcrEngine>, OcrError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        *self.languages.lock().unwrap() = config.languages.clone();
        Ok(Box::new(ScriptedEngine {
            kind,
            text: self.text,
            reads: self.reads.clone(),
        }))
    }
}

/// Model that answers the extraction and validation prompts from a script
/// and records every prompt it sees.
struct ScriptedModel {
    fields: String,
    report: String,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    fn new(fields: &str, report: &str) -> Arc<Self> {
        Arc::new(Self {
            fields: fields.to_string(),
            report: report.to_string(),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionModel for ScriptedModel {
    async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if prompt.starts_with("Assess this invoice JSON") {
            Ok(self.report.clone())
        } else {
            Ok(self.fields.clone())
        }
    }
}

fn processor(
    pdf: Arc<ScriptedPdf>,
    ocr: Arc<ScriptedOcr>,
    model: Arc<ScriptedModel>,
) -> InvoiceProcessor {
    InvoiceProcessor::new(
        TextExtractor::new(pdf, ocr),
        model,
        &PipelineConfig::default(),
    )
}

/// Route `tracing` output through the test harness. `RUST_LOG` picks the level.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn temp_with_suffix(suffix: &str) -> tempfile::NamedTempFile {
    tempfile::Builder::new().suffix(suffix).tempfile().unwrap()
}

const RICH_TEXT: &str = "ACME Corp Invoice 2024-117 dated 2024-03-01 \
    Widgets 10 x 9.00 = 90.00 Subtotal 90.00 Tax 0.00 Total 90.00 \
    Payment due within thirty days to account 12345";

const FIELDS: &str = r#"{"vendor":"ACME Corp","date":"2024-03-01","total":90.0}"#;

// ── Scenarios ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_invoice_still_runs_every_stage() {
    init_tracing();
    let model = ScriptedModel::new("{}", "- No line items found");
    let graph = InvoiceGraph::new(model.clone());

    let state = graph.run(InvoiceState::new("")).await.unwrap();

    let prompts = model.prompts();
    assert_eq!(prompts.len(), 2, "parse and validate both called");
    assert!(prompts[0].ends_with("Invoice text:\n"));
    assert_eq!(
        state.output.unwrap().status,
        ReviewStatus::NeedsReview,
        "status decided by the validate reply alone"
    );

    let model = ScriptedModel::new("{}", "OK");
    let state = InvoiceGraph::new(model)
        .run(InvoiceState::new(""))
        .await
        .unwrap();
    assert_eq!(state.output.unwrap().status, ReviewStatus::Clean);
}

#[tokio::test]
async fn rich_pdf_uses_native_text_and_never_builds_ocr() {
    init_tracing();
    let pdf = ScriptedPdf::new(RICH_TEXT, 2);
    let ocr = ScriptedOcr::new("unused");
    let model = ScriptedModel::new(FIELDS, "OK");
    let file = temp_with_suffix(".pdf");

    let state = processor(pdf.clone(), ocr.clone(), model.clone())
        .process_file(file.path(), &ExtractionConfig::default())
        .await
        .unwrap();

    assert_eq!(state.raw_text, RICH_TEXT);
    assert_eq!(pdf.native_calls.load(Ordering::SeqCst), 1);
    assert_eq!(pdf.render_calls.load(Ordering::SeqCst), 0);
    assert_eq!(ocr.created.load(Ordering::SeqCst), 0);
    assert!(model.prompts()[0].contains("ACME Corp Invoice 2024-117"));
}

#[tokio::test]
async fn scanned_pdf_is_rendered_and_ocrd_with_configured_languages() {
    init_tracing();
    let pdf = ScriptedPdf::new("", 1);
    let ocr = ScriptedOcr::new("FACTURE 88 Total 120,00 EUR");
    let model = ScriptedModel::new(FIELDS, "OK");
    let file = temp_with_suffix(".pdf");
    let config = ExtractionConfig::builder()
        .languages(vec![OcrLanguage::Fr, OcrLanguage::En])
        .build()
        .unwrap();

    let state = processor(pdf.clone(), ocr.clone(), model.clone())
        .process_file(file.path(), &config)
        .await
        .unwrap();

    assert_eq!(pdf.render_calls.load(Ordering::SeqCst), 1);
    assert_eq!(ocr.created.load(Ordering::SeqCst), 1);
    assert_eq!(ocr.reads.load(Ordering::SeqCst), 1);
    assert_eq!(
        *ocr.languages.lock().unwrap(),
        vec![OcrLanguage::Fr, OcrLanguage::En]
    );
    assert_eq!(state.raw_text, "FACTURE 88 Total 120,00 EUR");
    assert!(model.prompts()[0].ends_with("Invoice text:\nFACTURE 88 Total 120,00 EUR"));
}

#[tokio::test]
async fn total_mismatch_needs_review() {
    init_tracing();
    let model = ScriptedModel::new(FIELDS, "- Total mismatch: 100 ≠ 90");
    let state = InvoiceGraph::new(model)
        .run(InvoiceState::new(RICH_TEXT))
        .await
        .unwrap();

    let output = state.output.unwrap();
    assert_eq!(output.status, ReviewStatus::NeedsReview);
    assert_eq!(
        output.anomaly_report.as_deref(),
        Some("- Total mismatch: 100 ≠ 90")
    );
    assert_eq!(
        serde_json::to_value(&output).unwrap()["status"],
        "needs_review"
    );
}

#[tokio::test]
async fn run_fills_every_field() {
    init_tracing();
    let model = ScriptedModel::new("not even json", "ok");
    let state = InvoiceGraph::new(model)
        .run(InvoiceState::new("Invoice 1"))
        .await
        .unwrap();

    assert_eq!(state.raw_text, "Invoice 1");
    assert_eq!(state.parsed_fields.as_deref(), Some("not even json"));
    assert_eq!(state.anomaly_report.as_deref(), Some("ok"));
    let output = state.output.as_ref().unwrap();
    assert_eq!(output.invoice.as_deref(), Some("not even json"));
    assert_eq!(
        output.status,
        ReviewStatus::NeedsReview,
        "only the exact reply \"OK\" is clean"
    );
}

// ── Input routing ────────────────────────────────────────────────────────────

#[tokio::test]
async fn image_upload_goes_straight_to_ocr() {
    init_tracing();
    let pdf = ScriptedPdf::new(RICH_TEXT, 3);
    let ocr = ScriptedOcr::new("RECEIPT Total 4.50");
    let model = ScriptedModel::new(FIELDS, "OK");

    let mut png = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::new(16, 16))
        .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
        .unwrap();

    let state = processor(pdf.clone(), ocr.clone(), model)
        .process_bytes(&png, "png", &ExtractionConfig::default())
        .await
        .unwrap();

    assert_eq!(state.raw_text, "RECEIPT Total 4.50");
    assert_eq!(pdf.native_calls.load(Ordering::SeqCst), 0);
    assert_eq!(pdf.render_calls.load(Ordering::SeqCst), 0);
    assert_eq!(ocr.created.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unsupported_extension_is_rejected_before_any_work() {
    init_tracing();
    let pdf = ScriptedPdf::new(RICH_TEXT, 1);
    let ocr = ScriptedOcr::new("unused");
    let model = ScriptedModel::new(FIELDS, "OK");
    let file = temp_with_suffix(".xlsx");

    let err = processor(pdf.clone(), ocr.clone(), model.clone())
        .process_file(file.path(), &ExtractionConfig::default())
        .await
        .unwrap_err();

    assert!(matches!(err, InvoiceError::InvalidInput { .. }), "got {err}");
    assert_eq!(pdf.native_calls.load(Ordering::SeqCst), 0);
    assert_eq!(ocr.created.load(Ordering::SeqCst), 0);
    assert!(model.prompts().is_empty());
}

#[tokio::test]
async fn render_failure_surfaces_as_extraction_failed() {
    init_tracing();
    struct NoEngine;
    impl PdfBackend for NoEngine {
        fn native_text(&self, _: &Path) -> Result<String, RenderError> {
            Err(RenderError::EngineMissing("libpdfium.so".into()))
        }
        fn render_pages(&self, _: &Path, _: u32) -> Result<Vec<DynamicImage>, RenderError> {
            Err(RenderError::EngineMissing("libpdfium.so".into()))
        }
    }

    let model = ScriptedModel::new(FIELDS, "OK");
    let processor = InvoiceProcessor::new(
        TextExtractor::new(Arc::new(NoEngine), ScriptedOcr::new("unused")),
        model.clone(),
        &PipelineConfig::default(),
    );
    let file = temp_with_suffix(".pdf");

    let err = processor
        .process_file(file.path(), &ExtractionConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, InvoiceError::ExtractionFailed { .. }), "got {err}");
    assert!(model.prompts().is_empty());
}

// ── Progress reporting ───────────────────────────────────────────────────────

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl PipelineProgressCallback for Recorder {
    fn on_extraction_start(&self, _path: &str) {
        self.events.lock().unwrap().push("extract".into());
    }
    fn on_extraction_complete(&self, source: TextSource, _chars: usize) {
        self.events.lock().unwrap().push(format!("extracted:{source}"));
    }
    fn on_stage_start(&self, stage: Stage) {
        self.events.lock().unwrap().push(format!("start:{stage}"));
    }
    fn on_stage_complete(&self, stage: Stage) {
        self.events.lock().unwrap().push(format!("done:{stage}"));
    }
}

#[tokio::test]
async fn progress_events_follow_the_pipeline() {
    init_tracing();
    let recorder = Arc::new(Recorder::default());
    let config = PipelineConfig::builder()
        .progress_callback(recorder.clone())
        .build()
        .unwrap();
    let processor = InvoiceProcessor::new(
        TextExtractor::new(ScriptedPdf::new(RICH_TEXT, 1), ScriptedOcr::new("unused")),
        ScriptedModel::new(FIELDS, "OK"),
        &config,
    );
    let file = temp_with_suffix(".pdf");

    processor
        .process_file(file.path(), &ExtractionConfig::default())
        .await
        .unwrap();

    assert_eq!(
        *recorder.events.lock().unwrap(),
        vec![
            "extract",
            "extracted:native text",
            "start:parse",
            "done:parse",
            "start:validate",
            "done:validate",
            "start:format",
            "done:format",
        ]
    );
}

const LIVE_INVOICE_PAGES: [&str; 2] = [
    "INVOICE INV-2024-0117 Acme Office Supplies Ltd 12 Market Street Springfield Date 2024-03-05",
    "Bill to Northwind Traders Item Printer paper 10 boxes at 25.00 EUR Line total 250.00 EUR Total due 250.00 EUR",
];

#[tokio::test]
async fn generated_pdf_is_read_through_pdfium() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("invoice.pdf");
    if let Err(e) = write_text_pdf(&path, &LIVE_INVOICE_PAGES) {
        println!("SKIP — could not build invoice fixture: {e}");
        return;
    }
    let ocr = ScriptedOcr::new("unused");
    let model = ScriptedModel::new(FIELDS, "OK");
    let processor = InvoiceProcessor::new(
        TextExtractor::new(Arc::new(PdfiumBackend), ocr.clone()),
        model.clone(),
        &PipelineConfig::default(),
    );

    let state = processor
        .process_file(&path, &ExtractionConfig::default())
        .await
        .unwrap();

    assert_eq!(state.raw_text, LIVE_INVOICE_PAGES.join("\n"));
    assert_eq!(ocr.created.load(Ordering::SeqCst), 0);
    assert_eq!(state.output.unwrap().status, ReviewStatus::Clean);
}

// ── Live ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn live_invoice_roundtrip() {
    init_tracing();
    if std::env::var("E2E_ENABLED").is_err() {
        println!("SKIP — set E2E_ENABLED=1 to run live tests");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("invoice.pdf");
    if let Err(e) = write_text_pdf(&path, &LIVE_INVOICE_PAGES) {
        println!("SKIP — could not build invoice fixture: {e}");
        return;
    }

    let state = invoice_intel::process_file(
        &path,
        &ExtractionConfig::default(),
        &PipelineConfig::default(),
    )
    .await
    .expect("live run succeeds");

    assert!(state.is_complete());
    println!("{}", serde_json::to_string_pretty(&state.output).unwrap());
}
