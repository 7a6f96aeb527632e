//! Orchestrator: the fixed `start → parse → validate → format → end` path.
//!
//! [`InvoiceGraph::run`] drives the stages in order and returns the state the
//! format stage produced. A failing stage ends the run; there is no
//! conditional routing, no retry and no timeout at this layer.
//!
//! [`InvoiceGraph::topology`] describes the same path as nodes and edges for
//! display. It is a description only; `run` does not read it.

use crate::config::{PipelineConfig, DEFAULT_APPROVAL_THRESHOLD};
use crate::error::InvoiceError;
use crate::pipeline::llm::CompletionModel;
use crate::pipeline::stages::{format_stage, parse_stage, validate_stage};
use crate::pipeline::Stage;
use crate::progress::ProgressCallback;
use crate::state::InvoiceState;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Entry node name.
pub const START: &str = "__start__";
/// Exit node name.
pub const END: &str = "__end__";

/// The compiled pipeline.
#[derive(Clone)]
pub struct InvoiceGraph {
    model: Arc<dyn CompletionModel>,
    approval_threshold: u64,
    progress: Option<ProgressCallback>,
}

impl InvoiceGraph {
    pub fn new(model: Arc<dyn CompletionModel>) -> Self {
        Self {
            model,
            approval_threshold: DEFAULT_APPROVAL_THRESHOLD,
            progress: None,
        }
    }

    /// Graph with the threshold and progress callback from `config`.
    pub fn with_config(model: Arc<dyn CompletionModel>, config: &PipelineConfig) -> Self {
        Self {
            model,
            approval_threshold: config.approval_threshold,
            progress: config.progress_callback.clone(),
        }
    }

    pub fn approval_threshold(mut self, total: u64) -> Self {
        self.approval_threshold = total;
        self
    }

    /// Run every stage in order over `initial`.
    pub async fn run(&self, initial: InvoiceState) -> Result<InvoiceState, InvoiceError> {
        let start = Instant::now();
        let mut state = initial;

        for stage in Stage::ORDER {
            if let Some(ref cb) = self.progress {
                cb.on_stage_start(stage);
            }

            state = match self.step(stage, state).await {
                Ok(next) => next,
                Err(e) => {
                    warn!("{} stage failed: {}", stage, e);
                    if let Some(ref cb) = self.progress {
                        cb.on_stage_error(stage, e.to_string());
                    }
                    return Err(e);
                }
            };

            if let Some(ref cb) = self.progress {
                cb.on_stage_complete(stage);
            }
        }

        info!("Pipeline complete in {}ms", start.elapsed().as_millis());
        Ok(state)
    }

    async fn step(&self, stage: Stage, state: InvoiceState) -> Result<InvoiceState, InvoiceError> {
        match stage {
            Stage::Parse => parse_stage(self.model.as_ref(), state).await,
            Stage::Validate => {
                validate_stage(self.model.as_ref(), self.approval_threshold, state).await
            }
            Stage::Format => Ok(format_stage(state)),
        }
    }

    /// Nodes and edges of the fixed path.
    pub fn topology(&self) -> Topology {
        Topology::linear()
    }
}

/// Read-only description of the pipeline path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Topology {
    pub nodes: Vec<&'static str>,
    pub edges: Vec<(&'static str, &'static str)>,
}

impl Topology {
    /// The `__start__ → parse → validate → format → __end__` path.
    pub fn linear() -> Self {
        let mut nodes = vec![START];
        nodes.extend(Stage::ORDER.iter().map(Stage::as_str));
        nodes.push(END);

        let edges = nodes.windows(2).map(|w| (w[0], w[1])).collect();
        Self { nodes, edges }
    }

    /// Mermaid flowchart source, for rendering in docs or a terminal.
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("flowchart TD\n");
        for node in &self.nodes {
            if *node == START || *node == END {
                out.push_str(&format!("    {node}([{node}])\n"));
            } else {
                out.push_str(&format!("    {node}[{node}]\n"));
            }
        }
        for (from, to) in &self.edges {
            out.push_str(&format!("    {from} --> {to}\n"));
        }
        out
    }
}
