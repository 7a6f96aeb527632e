//! CLI binary for invoice-intel.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig` / `PipelineConfig` and prints the result as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use invoice_intel::{
    ExtractionConfig, InvoiceProcessor, OcrBackendKind, OcrLanguage, PipelineConfig,
    PipelineProgressCallback, ProgressCallback, ReviewStatus, Stage, TextExtractor, TextSource,
    Topology,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

fn spinner(prefix: &str, msg: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS),
    );
    bar.set_prefix(prefix.to_string());
    bar.set_message(msg.to_string());
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// One spinner, re-labelled as the run moves from extraction through the
/// stages, with a log line per finished step.
struct CliProgressCallback {
    bar: ProgressBar,
    step_started: Mutex<Instant>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            bar: spinner("Preparing", "resolving model…"),
            step_started: Mutex::new(Instant::now()),
        })
    }

    fn restart_clock(&self) {
        if let Ok(mut t) = self.step_started.lock() {
            *t = Instant::now();
        }
    }

    fn step_secs(&self) -> f64 {
        self.step_started
            .lock()
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, path: &str) {
        self.restart_clock();
        self.bar.set_prefix("Extracting text");
        self.bar.set_message(path.to_string());
    }

    fn on_extraction_complete(&self, source: TextSource, chars: usize) {
        self.bar.println(format!(
            "  {} {:<10} {:<8} {}",
            green("✓"),
            "extract",
            dim(&format!("{:.1}s", self.step_secs())),
            dim(&format!("{chars} chars via {source}")),
        ));
    }

    fn on_stage_start(&self, stage: Stage) {
        self.restart_clock();
        self.bar.set_prefix(format!("Running {stage}"));
        self.bar.set_message("waiting for model…");
    }

    fn on_stage_complete(&self, stage: Stage) {
        self.bar.println(format!(
            "  {} {:<10} {}",
            green("✓"),
            stage.as_str(),
            dim(&format!("{:.1}s", self.step_secs())),
        ));
    }

    fn on_stage_error(&self, stage: Stage, error: String) {
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error
        };
        self.bar.println(format!(
            "  {} {:<10} {}",
            red("✗"),
            stage.as_str(),
            red(&msg)
        ));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Scanned or digital invoice, default provider (Gemini when GEMINI_API_KEY is set)
  invoice-intel invoice.pdf

  # Photo of a French receipt with the PaddleOCR backend
  invoice-intel --ocr-backend paddle --lang fr --lang en receipt.jpg

  # Only show the extracted text (no API key needed)
  invoice-intel --extract-only scan.pdf

  # Full pipeline state as JSON
  invoice-intel --json invoice.pdf > state.json

  # Print the pipeline graph as a mermaid flowchart
  invoice-intel --show-graph

OUTPUT:
  stdout receives {"invoice", "anomaly_report", "status"} as JSON, where
  status is "clean" when the validator replied exactly "OK" and
  "needs_review" otherwise. Exit status is non-zero on any failure.

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (default provider)
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  EDGEQUAKE_LLM_PROVIDER  Provider override (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Model override
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  RUST_LOG                Log filter, overrides -v / -q

  A .env file in the working directory is loaded first.
"#;

/// Extract invoice fields from PDFs and images and flag anomalies.
#[derive(Parser, Debug)]
#[command(
    name = "invoice-intel",
    version,
    about = "Extract invoice fields from PDFs and images and flag anomalies with an LLM",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Invoice file: .pdf, .png, .jpg, .jpeg, .tiff, .tif or .bmp.
    #[arg(required_unless_present = "show_graph")]
    input: Option<PathBuf>,

    /// OCR engine for scanned PDFs and images.
    #[arg(long, env = "INVOICE_INTEL_OCR_BACKEND", value_enum, default_value = "tesseract")]
    ocr_backend: BackendArg,

    /// OCR language; repeat for several (en, fr, de, es).
    #[arg(long = "lang", env = "INVOICE_INTEL_LANG", value_enum, value_delimiter = ',',
          default_values = ["en"])]
    languages: Vec<LangArg>,

    /// LLM provider: gemini, openai, anthropic, ollama, …
    #[arg(long, env = "INVOICE_INTEL_PROVIDER")]
    provider: Option<String>,

    /// LLM model ID (e.g. gemini-2.5-flash, gpt-4.1-mini).
    #[arg(long, env = "INVOICE_INTEL_MODEL")]
    model: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "INVOICE_INTEL_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Totals above this need manual approval.
    #[arg(long, env = "INVOICE_INTEL_APPROVAL_THRESHOLD", default_value_t = 50_000)]
    approval_threshold: u64,

    /// PDFs with at most this many native words are OCR'd.
    #[arg(long, env = "INVOICE_INTEL_MIN_NATIVE_WORDS", default_value_t = 20)]
    min_native_words: usize,

    /// Render DPI for scanned PDF pages (72–600).
    #[arg(long, env = "INVOICE_INTEL_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Give up on text extraction after this many seconds.
    #[arg(long, env = "INVOICE_INTEL_EXTRACT_TIMEOUT")]
    extract_timeout: Option<u64>,

    /// Directory holding PaddleOCR models.
    #[arg(long, env = "INVOICE_INTEL_PADDLE_MODELS")]
    paddle_model_dir: Option<PathBuf>,

    /// Print the extracted text and stop; no LLM calls.
    #[arg(long)]
    extract_only: bool,

    /// Print the whole pipeline state instead of the output record.
    #[arg(long, env = "INVOICE_INTEL_JSON")]
    json: bool,

    /// Print the pipeline topology as a mermaid flowchart and exit.
    #[arg(long)]
    show_graph: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "INVOICE_INTEL_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the result.
    #[arg(short, long, env = "INVOICE_INTEL_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum BackendArg {
    Tesseract,
    Paddle,
}

impl From<BackendArg> for OcrBackendKind {
    fn from(v: BackendArg) -> Self {
        match v {
            BackendArg::Tesseract => OcrBackendKind::Tesseract,
            BackendArg::Paddle => OcrBackendKind::Paddle,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LangArg {
    En,
    Fr,
    De,
    Es,
}

impl From<LangArg> for OcrLanguage {
    fn from(v: LangArg) -> Self {
        match v {
            LangArg::En => OcrLanguage::En,
            LangArg::Fr => OcrLanguage::Fr,
            LangArg::De => OcrLanguage::De,
            LangArg::Es => OcrLanguage::Es,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is normal.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives all the feedback that matters; keep INFO logs out of
    // its way unless asked for.
    let show_progress = !cli.quiet && !cli.show_graph;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Graph-only mode ──────────────────────────────────────────────────
    if cli.show_graph {
        print!("{}", Topology::linear().to_mermaid());
        return Ok(());
    }

    let input = cli
        .input
        .clone()
        .context("An invoice file is required")?;
    let extraction = build_extraction_config(&cli)?;

    // ── Extract-only mode ────────────────────────────────────────────────
    if cli.extract_only {
        let bar = show_progress.then(|| spinner("Extracting text", &input.display().to_string()));
        let result = TextExtractor::default()
            .extract_async(&input, &extraction)
            .await;
        if let Some(bar) = bar {
            bar.finish_and_clear();
        }
        let extracted = result.context("Text extraction failed")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&extracted).context("Failed to serialise output")?
            );
        } else {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(extracted.text.as_bytes())
                .context("Failed to write to stdout")?;
            if !extracted.text.ends_with('\n') {
                handle.write_all(b"\n").ok();
            }
        }
        if !cli.quiet {
            eprintln!(
                "{} {} chars via {}",
                green("✔"),
                extracted.text.len(),
                extracted.source
            );
        }
        return Ok(());
    }

    // ── Full pipeline ────────────────────────────────────────────────────
    let progress = show_progress.then(CliProgressCallback::new);
    let pipeline = build_pipeline_config(
        &cli,
        progress
            .clone()
            .map(|cb| cb as Arc<dyn PipelineProgressCallback>),
    )?;

    let started = Instant::now();
    let result = match InvoiceProcessor::from_config(&pipeline) {
        Ok(processor) => processor.process_file(&input, &extraction).await,
        Err(e) => Err(e),
    };
    if let Some(ref cb) = progress {
        cb.finish();
    }
    let state = result.context("Invoice processing failed")?;
    let output = state
        .output
        .clone()
        .context("Pipeline finished without an output record")?;

    let json = if cli.json {
        serde_json::to_string_pretty(&state)
    } else {
        serde_json::to_string_pretty(&output)
    }
    .context("Failed to serialise output")?;
    println!("{json}");

    if !cli.quiet {
        let status = match output.status {
            ReviewStatus::Clean => green("clean"),
            ReviewStatus::NeedsReview => yellow("needs review"),
        };
        eprintln!(
            "{} {}  {}",
            bold("Status:"),
            status,
            dim(&format!("{}ms total", started.elapsed().as_millis()))
        );
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
fn build_extraction_config(cli: &Cli) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .backend(cli.ocr_backend.into())
        .languages(cli.languages.iter().map(|&l| l.into()).collect())
        .dpi(cli.dpi)
        .min_native_words(cli.min_native_words);

    if let Some(secs) = cli.extract_timeout {
        builder = builder.timeout_secs(secs);
    }
    if let Some(ref dir) = cli.paddle_model_dir {
        builder = builder.paddle_model_dir(dir.clone());
    }

    builder.build().context("Invalid extraction configuration")
}

/// Map CLI args to `PipelineConfig`.
fn build_pipeline_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::builder()
        .temperature(cli.temperature)
        .approval_threshold(cli.approval_threshold);

    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid pipeline configuration")
}
