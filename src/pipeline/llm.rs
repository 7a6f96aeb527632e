//! Language-model seam: `complete(prompt) → text`.
//!
//! The stages only need a black-box text completion, so they depend on the
//! small [`CompletionModel`] trait rather than on a provider API. The
//! production implementation, [`LlmCompletion`], sends the prompt as a single
//! user message through an `edgequake-llm` provider. Tests plug in scripted
//! models instead.
//!
//! There is no retry and no timeout here: a failed call fails the stage.

use crate::config::{PipelineConfig, DEFAULT_GEMINI_MODEL};
use crate::error::{InvoiceError, ModelError};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// A text-completion oracle.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Send `prompt` and return the model's reply verbatim.
    async fn complete(&self, prompt: &str) -> Result<String, ModelError>;
}

/// [`CompletionModel`] backed by an `edgequake-llm` provider.
pub struct LlmCompletion {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
}

impl LlmCompletion {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &PipelineConfig) -> Self {
        Self {
            provider,
            options: build_options(config),
        }
    }
}

#[async_trait]
impl CompletionModel for LlmCompletion {
    async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        let start = Instant::now();
        let messages = vec![ChatMessage::user(prompt)];

        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| ModelError(format!("{e}")))?;

        debug!(
            "LLM call: {} input tokens, {} output tokens, {:?}",
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        Ok(response.content)
    }
}

/// Build `CompletionOptions` from the pipeline config.
fn build_options(config: &PipelineConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

/// Resolve the completion model, from most-specific to least-specific.
///
/// 1. **Pre-built completion model** (`config.completion_model`).
/// 2. **Pre-built provider** (`config.provider`).
/// 3. **Named provider + model** (`config.provider_name`); the factory reads
///    the matching API key from the environment.
/// 4. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`).
/// 5. **Gemini key** (`GEMINI_API_KEY`) → `gemini` with `gemini-2.5-flash`.
/// 6. **Full auto-detection** (`ProviderFactory::from_env`).
pub fn resolve_model(config: &PipelineConfig) -> Result<Arc<dyn CompletionModel>, InvoiceError> {
    if let Some(ref model) = config.completion_model {
        return Ok(Arc::clone(model));
    }
    let provider = resolve_provider(config)?;
    Ok(Arc::new(LlmCompletion::new(provider, config)))
}

fn resolve_provider(config: &PipelineConfig) -> Result<Arc<dyn LLMProvider>, InvoiceError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_GEMINI_MODEL);
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(key) = std::env::var("GEMINI_API_KEY") {
        if !key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_GEMINI_MODEL);
            return create_provider("gemini", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| InvoiceError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set GEMINI_API_KEY, OPENAI_API_KEY, ANTHROPIC_API_KEY, or pass --provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, InvoiceError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        InvoiceError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}
