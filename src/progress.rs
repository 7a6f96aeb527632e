//! Progress-callback trait for extraction and pipeline events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to be told when
//! text extraction and each stage begin and end. The CLI uses this to drive
//! its spinners; a service might forward the events to a job record.
//!
//! # Example
//!
//! ```rust
//! use invoice_intel::{PipelineConfig, PipelineProgressCallback, Stage};
//! use std::sync::Arc;
//!
//! struct StageLogger;
//!
//! impl PipelineProgressCallback for StageLogger {
//!     fn on_stage_complete(&self, stage: Stage) {
//!         eprintln!("{stage} done");
//!     }
//! }
//!
//! let config = PipelineConfig::builder()
//!     .progress_callback(Arc::new(StageLogger))
//!     .build()
//!     .unwrap();
//! ```

use crate::extract::TextSource;
use crate::pipeline::Stage;
use std::sync::Arc;

/// Called as an invocation moves from extraction through the three stages.
///
/// All methods default to no-ops so implementors only override what they
/// need. Implementations must be `Send + Sync`; the same callback may be
/// shared by concurrent invocations.
pub trait PipelineProgressCallback: Send + Sync {
    /// Called before the input file is opened.
    fn on_extraction_start(&self, path: &str) {
        let _ = path;
    }

    /// Called once raw text is available.
    ///
    /// # Arguments
    /// * `source` — native PDF text layer or the OCR backend that produced it
    /// * `chars`  — length of the extracted text in bytes
    fn on_extraction_complete(&self, source: TextSource, chars: usize) {
        let _ = (source, chars);
    }

    /// Called just before a stage runs.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called after a stage returned successfully.
    fn on_stage_complete(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a stage fails; the run stops afterwards.
    fn on_stage_error(&self, stage: Stage, error: String) {
        let _ = (stage, error);
    }
}

/// Shared callback handle stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;

/// Callback that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}
