//! Response generation behind one trait, with the backend picked by configuration.
//!
//! Backends only turn a [`CompletionRequest`] into text. Risk assessment and
//! knowledge attribution are done once in [`generate`], so every backend gets
//! the same approval gating.

pub mod gemini;
pub mod offline;
pub mod openai;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tacit_core::config::{GeneratorBackend, GeneratorSettings};
use tacit_core::error::{Error, Result};
use tacit_core::types::DocumentChunk;
use tracing::debug;

use crate::prompt::{build_system_context, ChatTurn};
use crate::risk::{assess, knowledge_areas};

pub use gemini::GeminiGenerator;
pub use offline::OfflineGenerator;
pub use openai::OpenAiGenerator;

pub const EMPTY_RESPONSE_FALLBACK: &str = "I apologize, but I couldn't generate a response.";

/// Everything a backend needs for one completion.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Instruction block from [`build_system_context`].
    pub system_context: String,
    pub tacit_knowledge: String,
    pub history: Vec<ChatTurn>,
    pub message: String,
    pub context: Vec<DocumentChunk>,
}

#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    fn name(&self) -> &str;
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

/// Caller-side inputs to [`generate`].
#[derive(Debug, Clone, Copy)]
pub struct GenerationInput<'a> {
    pub system_prompt: &'a str,
    pub tacit_knowledge: &'a str,
    pub message: &'a str,
    pub history: &'a [ChatTurn],
    pub context: &'a [DocumentChunk],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedResponse {
    pub content: String,
    pub reasoning: String,
    pub requires_approval: bool,
    pub knowledge_used: Vec<String>,
}

pub async fn generate(
    generator: &dyn ResponseGenerator,
    input: GenerationInput<'_>,
) -> Result<GeneratedResponse> {
    let risk = assess(input.message);
    let request = CompletionRequest {
        system_context: build_system_context(input.system_prompt, input.tacit_knowledge, input.context),
        tacit_knowledge: input.tacit_knowledge.to_string(),
        history: input.history.to_vec(),
        message: input.message.to_string(),
        context: input.context.to_vec(),
    };
    debug!(
        backend = generator.name(),
        history = request.history.len(),
        passages = request.context.len(),
        high_risk = risk.high_risk,
        "generating response"
    );
    let text = generator.complete(&request).await?;
    let content = if text.trim().is_empty() { EMPTY_RESPONSE_FALLBACK.to_string() } else { text };
    Ok(GeneratedResponse {
        content,
        reasoning: risk.reasoning.to_string(),
        requires_approval: risk.high_risk,
        knowledge_used: if risk.high_risk { knowledge_areas(input.tacit_knowledge) } else { Vec::new() },
    })
}

/// Builds the configured backend. Remote backends need their API key in the env.
pub fn from_settings(settings: &GeneratorSettings) -> Result<Box<dyn ResponseGenerator>> {
    match settings.backend {
        GeneratorBackend::Offline => Ok(Box::new(OfflineGenerator)),
        GeneratorBackend::OpenAi => {
            let key = api_key(settings, openai::DEFAULT_API_KEY_ENV)?;
            Ok(Box::new(OpenAiGenerator::new(key, settings)?))
        }
        GeneratorBackend::Gemini => {
            let key = api_key(settings, gemini::DEFAULT_API_KEY_ENV)?;
            Ok(Box::new(GeminiGenerator::new(key, settings)?))
        }
    }
}

fn api_key(settings: &GeneratorSettings, default_env: &str) -> Result<String> {
    let var = settings.api_key_env.as_deref().unwrap_or(default_env);
    let key = std::env::var(var).unwrap_or_default().trim().to_string();
    if key.is_empty() {
        return Err(Error::Config(format!("{var} is not set")));
    }
    Ok(key)
}

pub(crate) fn http_client(settings: &GeneratorSettings) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.timeout_secs))
        .build()
        .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))
}
