//! Grounded answer generation.
//!
//! Retrieved chunk contents are joined into one context block and sent to the
//! LLM with the answer prompt. The prompt makes the model decline when the
//! context is not enough; nothing here judges relevance.

use crate::types::RetrievedChunk;
use iamsage_core::config::LlmSettings;
use iamsage_core::AppResult;
use iamsage_llm::{LlmClient, LlmRequest};
use iamsage_prompt::{build_prompt, load_prompt, PromptDefinition};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// Separator placed between chunk contents in the context block.
pub const CONTEXT_DELIMITER: &str = "\n\n---\n\n";

/// Join chunk contents in retrieval order.
pub fn format_context(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .map(|c| c.chunk.content.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_DELIMITER)
}

/// A cited chunk shown next to the answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceRef {
    pub rank: usize,
    pub source: String,
    pub chunk_id: String,
    pub distance: f32,
    pub content: String,
}

impl From<&RetrievedChunk> for SourceRef {
    fn from(retrieved: &RetrievedChunk) -> Self {
        Self {
            rank: retrieved.rank,
            source: retrieved.chunk.source.clone(),
            chunk_id: retrieved.chunk.chunk_id.clone(),
            distance: retrieved.distance,
            content: retrieved.chunk.content.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RagAnswer {
    pub answer: String,
    pub sources: Vec<SourceRef>,
}

/// Result of one question.
#[derive(Debug, Clone, PartialEq)]
pub enum AskOutcome {
    /// Retrieval found nothing to ground an answer on.
    NoRelevantInformation,
    Answered(RagAnswer),
}

/// Sends one grounded completion request per question.
pub struct AnswerGenerator {
    llm: Arc<dyn LlmClient>,
    prompt: PromptDefinition,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl AnswerGenerator {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        prompt: PromptDefinition,
        model: impl Into<String>,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        Self {
            llm,
            prompt,
            model: model.into(),
            temperature,
            max_tokens,
        }
    }

    /// Generator for the configured model, with the prompt resolved from the workspace.
    pub fn from_settings(
        llm: Arc<dyn LlmClient>,
        settings: &LlmSettings,
        workspace: &Path,
    ) -> AppResult<Self> {
        let prompt = load_prompt(workspace, &settings.prompt_id)?;
        Ok(Self::new(
            llm,
            prompt,
            settings.model.clone(),
            settings.temperature,
            settings.max_tokens,
        ))
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Answer `question` from `context`. LLM failures are returned as-is.
    pub async fn generate(&self, context: &str, question: &str) -> AppResult<String> {
        let built = build_prompt(&self.prompt, question, context)?;

        let mut request = LlmRequest::new(built.user, self.model.clone())
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }

        tracing::info!(
            "Requesting answer from {} ({}, {} context bytes)",
            self.llm.provider_name(),
            self.model,
            built.metadata.context_bytes
        );

        let response = self.llm.complete(&request).await?;

        tracing::debug!(
            "Answer received: {} tokens",
            response.usage.total_tokens
        );

        Ok(response.content.trim().to_string())
    }
}
