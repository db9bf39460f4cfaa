//! Chat completion provider backed by an OpenAI-compatible API.
//!
//! Used for grounded answers (`rag query --answer`) and test generation
//! (`rag generate`). Like the embedding providers, a call is a single
//! attempt; HTTP failures are classified by [`crate::http::post_json`].

use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::Value;

use repo_rag_core::generation::{ChatMessage, GenerationProvider};
use repo_rag_core::ProviderError;

use crate::config::GenerationConfig;
use crate::embedding::OpenAiCredentials;
use crate::http;

/// `POST {base}/chat/completions`.
pub struct OpenAiChatProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenAiChatProvider {
    pub fn new(config: &GenerationConfig, creds: &OpenAiCredentials) -> Result<Self> {
        let api_key = creds.require_key()?;
        let base = creds.resolve_base(config.url.as_deref());
        Ok(Self {
            client: http::client(config.timeout_secs)?,
            endpoint: format!("{}/chat/completions", base),
            api_key,
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl GenerationProvider for OpenAiChatProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String, ProviderError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": temperature,
        });
        let json = http::post_json(
            &self.client,
            &self.endpoint,
            Some(&self.api_key),
            &body,
            "OpenAI",
        )
        .await?;
        parse_completion(&json)
    }
}

/// Extract `choices[0].message.content`.
fn parse_completion(json: &Value) -> Result<String, ProviderError> {
    json.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| {
            ProviderError::permanent("Invalid OpenAI response: missing choices[0].message.content")
        })
}

/// The configured generation provider.
///
/// # Errors
///
/// Fails when generation is disabled, since every caller needs a model.
pub fn create_generation_provider(
    config: &GenerationConfig,
    creds: &OpenAiCredentials,
) -> Result<Arc<dyn GenerationProvider>> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiChatProvider::new(config, creds)?)),
        "disabled" => bail!(
            "Generation provider is disabled. Set [generation] provider = \"openai\" in the config."
        ),
        other => bail!("Unknown generation provider: {}", other),
    }
}
