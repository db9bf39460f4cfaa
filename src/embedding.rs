//! Embedding provider implementations.
//!
//! Concrete backends for the core [`EmbeddingProvider`] trait:
//! - **[`DisabledProvider`]**: always fails; used when embeddings are not configured.
//! - **[`OpenAiEmbeddingProvider`]**: `POST {base}/embeddings` on an OpenAI-compatible API.
//! - **[`OllamaEmbeddingProvider`]**: `POST {url}/api/embed` on a local Ollama instance.
//! - **`LocalProvider`**: in-process fastembed models (feature `local-embeddings-fastembed`).
//!
//! Providers make a single attempt per call. Retry and backoff are applied
//! by the core [`Embedder`] that [`create_embedder`] wraps around them.
//!
//! # Credentials
//!
//! `OPENAI_API_KEY` and `OPENAI_API_BASE` are read once at startup into
//! [`OpenAiCredentials`] and passed to the providers that need them.

use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::Value;

use repo_rag_core::embedding::{Embedder, EmbeddingProvider};
use repo_rag_core::ProviderError;

use crate::config::EmbeddingConfig;
use crate::http;

pub const DEFAULT_OPENAI_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// OpenAI API key and base URL.
#[derive(Clone, Default)]
pub struct OpenAiCredentials {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

impl OpenAiCredentials {
    /// Read `OPENAI_API_KEY` and `OPENAI_API_BASE` from the environment.
    pub fn from_env() -> Self {
        let non_empty = |v: String| if v.trim().is_empty() { None } else { Some(v) };
        Self {
            api_key: std::env::var("OPENAI_API_KEY").ok().and_then(non_empty),
            base_url: std::env::var("OPENAI_API_BASE").ok().and_then(non_empty),
        }
    }

    /// Resolve the API base: explicit override, then `OPENAI_API_BASE`, then the public API.
    pub fn resolve_base(&self, override_url: Option<&str>) -> String {
        override_url
            .or(self.base_url.as_deref())
            .unwrap_or(DEFAULT_OPENAI_BASE)
            .trim_end_matches('/')
            .to_string()
    }

    pub fn require_key(&self) -> Result<String> {
        match &self.api_key {
            Some(key) => Ok(key.clone()),
            None => bail!("OPENAI_API_KEY environment variable not set"),
        }
    }
}

impl std::fmt::Debug for OpenAiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCredentials")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .finish()
    }
}

// ============ Disabled Provider ============

/// Provider used when `embedding.provider = "disabled"`.
pub struct DisabledProvider;

#[async_trait]
impl EmbeddingProvider for DisabledProvider {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, ProviderError> {
        Err(ProviderError::permanent(
            "Embedding provider is disabled. Set [embedding] provider in the config.",
        ))
    }
}

// ============ OpenAI Provider ============

pub struct OpenAiEmbeddingProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenAiEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig, creds: &OpenAiCredentials) -> Result<Self> {
        let api_key = creds.require_key()?;
        let base = creds.resolve_base(config.url.as_deref());
        Ok(Self {
            client: http::client(config.timeout_secs)?,
            endpoint: format!("{}/embeddings", base),
            api_key,
            model: config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_OPENAI_EMBEDDING_MODEL.to_string()),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
        });
        let json = http::post_json(
            &self.client,
            &self.endpoint,
            Some(&self.api_key),
            &body,
            "OpenAI",
        )
        .await?;
        parse_openai_response(&json)
    }
}

/// Extract `data[0].embedding`.
fn parse_openai_response(json: &Value) -> Result<Vec<f32>, ProviderError> {
    let embedding = json
        .get("data")
        .and_then(|d| d.as_array())
        .and_then(|d| d.first())
        .and_then(|item| item.get("embedding"))
        .ok_or_else(|| ProviderError::permanent("Invalid OpenAI response: missing data[0].embedding"))?;
    http::parse_vector(embedding, "OpenAI")
}

// ============ Ollama Provider ============

/// Calls `POST /api/embed` on the configured Ollama URL.
pub struct OllamaEmbeddingProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl OllamaEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for Ollama provider"))?;
        let url = config
            .url
            .as_deref()
            .unwrap_or(DEFAULT_OLLAMA_URL)
            .trim_end_matches('/');
        Ok(Self {
            client: http::client(config.timeout_secs)?,
            endpoint: format!("{}/api/embed", url),
            model,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
        });
        let json = http::post_json(&self.client, &self.endpoint, None, &body, "Ollama").await?;
        parse_ollama_response(&json)
    }
}

fn parse_ollama_response(json: &Value) -> Result<Vec<f32>, ProviderError> {
    let embedding = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .and_then(|e| e.first())
        .ok_or_else(|| ProviderError::permanent("Invalid Ollama response: missing embeddings array"))?;
    http::parse_vector(embedding, "Ollama")
}

// ============ Local Provider (fastembed) ============

/// In-process embeddings. The model is downloaded on first use and cached.
#[cfg(feature = "local-embeddings-fastembed")]
pub struct LocalProvider {
    model_name: String,
    model: Arc<std::sync::Mutex<fastembed::TextEmbedding>>,
}

#[cfg(feature = "local-embeddings-fastembed")]
impl LocalProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model_name = config
            .model
            .clone()
            .unwrap_or_else(|| "all-minilm-l6-v2".to_string());
        let model = fastembed::TextEmbedding::try_new(
            fastembed::InitOptions::new(fastembed_model(&model_name)?)
                .with_show_download_progress(true),
        )
        .map_err(|e| anyhow::anyhow!("Failed to initialize local embedding model: {}", e))?;
        Ok(Self {
            model_name,
            model: Arc::new(std::sync::Mutex::new(model)),
        })
    }
}

#[cfg(feature = "local-embeddings-fastembed")]
fn fastembed_model(name: &str) -> Result<fastembed::EmbeddingModel> {
    match name {
        "all-minilm-l6-v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
        "bge-small-en-v1.5" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
        "nomic-embed-text-v1.5" => Ok(fastembed::EmbeddingModel::NomicEmbedTextV15),
        other => bail!(
            "Unknown local embedding model: '{}'. Supported models: \
             all-minilm-l6-v2, bge-small-en-v1.5, bge-base-en-v1.5, nomic-embed-text-v1.5",
            other
        ),
    }
}

#[cfg(feature = "local-embeddings-fastembed")]
#[async_trait]
impl EmbeddingProvider for LocalProvider {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let model = Arc::clone(&self.model);
        let texts = vec![text.to_string()];
        let result = tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|_| ProviderError::permanent("local embedding model lock poisoned"))?;
            model
                .embed(texts, None)
                .map_err(|e| ProviderError::permanent(format!("Local embedding failed: {}", e)))
        })
        .await
        .map_err(|e| ProviderError::permanent(format!("Local embedding task failed: {}", e)))??;

        result
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::permanent("Local embedding returned no vectors"))
    }
}

/// Instantiate the provider named by `config.provider`.
pub fn create_provider(
    config: &EmbeddingConfig,
    creds: &OpenAiCredentials,
) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledProvider)),
        "openai" => Ok(Arc::new(OpenAiEmbeddingProvider::new(config, creds)?)),
        "ollama" => Ok(Arc::new(OllamaEmbeddingProvider::new(config)?)),
        #[cfg(feature = "local-embeddings-fastembed")]
        "local" => Ok(Arc::new(LocalProvider::new(config)?)),
        #[cfg(not(feature = "local-embeddings-fastembed"))]
        "local" => bail!("Local embedding provider requires --features local-embeddings-fastembed"),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

/// Provider wrapped in the retrying [`Embedder`] with `config.retries` attempts.
pub fn create_embedder(config: &EmbeddingConfig, creds: &OpenAiCredentials) -> Result<Embedder> {
    let provider = create_provider(config, creds)?;
    Ok(Embedder::new(provider).with_retries(config.retries))
}
