//! Grounded answer synthesis over retrieved chunks.
//!
//! The prompt numbers each snippet (`[1]`, `[2]`, …) with its file path
//! and tag so answers can cite their sources, and instructs the model to
//! answer only from the supplied context. Synthesis is best-effort: a
//! provider failure degrades to an empty answer.

use std::sync::Arc;

use crate::error::{RagError, Result};
use crate::generation::{ChatMessage, GenerationProvider};
use crate::models::RetrievedChunk;

pub const DEFAULT_TEMPERATURE: f32 = 0.2;

const SYSTEM_PROMPT: &str = "You answer questions about a software project. \
Use only the numbered context snippets provided by the user. \
Cite the snippets you rely on by their number, e.g. [2]. \
If the snippets do not contain the answer, say that the context is insufficient.";

pub struct Synthesizer {
    provider: Arc<dyn GenerationProvider>,
    temperature: f32,
}

impl Synthesizer {
    pub fn new(provider: Arc<dyn GenerationProvider>) -> Self {
        Self {
            provider,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Answer `query` from `chunks`, or return an empty string on failure.
    pub async fn synthesize(&self, query: &str, chunks: &[RetrievedChunk]) -> String {
        match self.try_synthesize(query, chunks).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!(model = self.provider.model_name(), "{}", e);
                String::new()
            }
        }
    }

    /// Like [`Synthesizer::synthesize`] but surfaces the failure.
    ///
    /// # Errors
    ///
    /// [`RagError::SynthesisUnavailable`] when the provider fails.
    pub async fn try_synthesize(&self, query: &str, chunks: &[RetrievedChunk]) -> Result<String> {
        let messages = build_messages(query, chunks);
        let answer = self
            .provider
            .complete(&messages, self.temperature)
            .await
            .map_err(RagError::SynthesisUnavailable)?;
        Ok(answer.trim().to_string())
    }
}

/// System + user messages for a grounded answer.
pub fn build_messages(query: &str, chunks: &[RetrievedChunk]) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(build_user_prompt(query, chunks)),
    ]
}

fn build_user_prompt(query: &str, chunks: &[RetrievedChunk]) -> String {
    let mut prompt = String::from("Context snippets:\n");
    if chunks.is_empty() {
        prompt.push_str("(no snippets were retrieved)\n");
    }
    for (i, chunk) in chunks.iter().enumerate() {
        prompt.push_str(&format!(
            "\n[{}] {} ({})\n{}\n",
            i + 1,
            chunk.metadata.file_path,
            chunk.metadata.tag,
            chunk.text
        ));
    }
    prompt.push_str(&format!("\nQuestion: {}\n", query));
    prompt
}
