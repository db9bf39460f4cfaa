use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use repo_rag_core::chunk::ChunkParams;
use repo_rag_core::index::{IndexMode, IndexOptions};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_window_lines")]
    pub window_lines: usize,
    #[serde(default = "default_overlap_lines")]
    pub overlap_lines: usize,
    #[serde(default)]
    pub whole_file: bool,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            window_lines: default_window_lines(),
            overlap_lines: default_overlap_lines(),
            whole_file: false,
        }
    }
}

fn default_window_lines() -> usize {
    ChunkParams::DEFAULT_WINDOW
}
fn default_overlap_lines() -> usize {
    ChunkParams::DEFAULT_OVERLAP
}

impl ChunkingConfig {
    pub fn index_options(&self) -> Result<IndexOptions> {
        let chunking = ChunkParams::new(self.window_lines, self.overlap_lines)?;
        let mode = if self.whole_file {
            IndexMode::WholeFile
        } else {
            IndexMode::Chunked
        };
        Ok(IndexOptions { chunking, mode })
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    /// Base URL override (OpenAI-compatible endpoint or Ollama host).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            url: None,
            retries: default_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_generation_model")]
    pub model: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_generation_model(),
            url: None,
            temperature: default_temperature(),
            timeout_secs: default_generation_timeout_secs(),
        }
    }
}

impl GenerationConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_retries() -> u32 {
    3
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_generation_model() -> String {
    "gpt-4o".to_string()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_generation_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_context_top_k")]
    pub context_top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            collection: default_collection(),
            top_k: default_top_k(),
            context_top_k: default_context_top_k(),
        }
    }
}

fn default_collection() -> String {
    "code_docs".to_string()
}
fn default_top_k() -> usize {
    3
}
fn default_context_top_k() -> usize {
    4
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourcesConfig {
    #[serde(default = "default_code_extensions")]
    pub code_extensions: Vec<String>,
    #[serde(default = "default_doc_extensions")]
    pub doc_extensions: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            code_extensions: default_code_extensions(),
            doc_extensions: default_doc_extensions(),
            exclude_globs: Vec::new(),
            follow_symlinks: false,
        }
    }
}

fn default_code_extensions() -> Vec<String> {
    vec!["py".to_string(), "java".to_string()]
}
fn default_doc_extensions() -> Vec<String> {
    vec!["md".to_string()]
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    // Rejects windows that would never advance
    config.chunking.index_options()?;

    if config.retrieval.top_k == 0 {
        bail!("retrieval.top_k must be >= 1");
    }

    if config.retrieval.context_top_k == 0 {
        bail!("retrieval.context_top_k must be >= 1");
    }

    if config.retrieval.collection.trim().is_empty() {
        bail!("retrieval.collection must not be empty");
    }

    if !(0.0..=2.0).contains(&config.generation.temperature) {
        bail!("generation.temperature must be in [0.0, 2.0]");
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" | "ollama" | "local" => {}
        other => bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, ollama, or local.",
            other
        ),
    }

    if config.embedding.provider == "ollama" && config.embedding.model.is_none() {
        bail!("embedding.model must be specified when provider is 'ollama'");
    }

    match config.generation.provider.as_str() {
        "disabled" | "openai" => {}
        other => bail!(
            "Unknown generation provider: '{}'. Must be disabled or openai.",
            other
        ),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_str: &str) -> Result<Config> {
        let config: Config = toml::from_str(toml_str)?;
        validate(&config)?;
        Ok(config)
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = parse("[db]\npath = \"./data/rag.sqlite\"\n").unwrap();
        assert_eq!(config.chunking.window_lines, 200);
        assert_eq!(config.chunking.overlap_lines, 50);
        assert_eq!(config.embedding.retries, 3);
        assert!(!config.embedding.is_enabled());
        assert_eq!(config.retrieval.collection, "code_docs");
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.generation.model, "gpt-4o");
        assert_eq!(config.sources.code_extensions, vec!["py", "java"]);
    }

    #[test]
    fn test_overlap_not_smaller_than_window_rejected() {
        let err = parse(
            "[db]\npath = \"x\"\n[chunking]\nwindow_lines = 50\noverlap_lines = 50\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("invalid configuration"), "{}", err);
    }

    #[test]
    fn test_zero_top_k_rejected() {
        let err = parse("[db]\npath = \"x\"\n[retrieval]\ntop_k = 0\n").unwrap_err();
        assert!(err.to_string().contains("retrieval.top_k"), "{}", err);

        let err = parse("[db]\npath = \"x\"\n[retrieval]\ncontext_top_k = 0\n").unwrap_err();
        assert!(err.to_string().contains("retrieval.context_top_k"), "{}", err);
    }

    #[test]
    fn test_unknown_provider_rejected() {
        assert!(parse("[db]\npath = \"x\"\n[embedding]\nprovider = \"cohere\"\n").is_err());
        assert!(parse("[db]\npath = \"x\"\n[generation]\nprovider = \"claude\"\n").is_err());
    }

    #[test]
    fn test_example_config_is_valid() {
        let config = parse(include_str!("../config/rag.example.toml")).unwrap();
        assert_eq!(config.embedding.provider, "openai");
        assert_eq!(config.retrieval.context_top_k, 4);
    }

    #[test]
    fn test_whole_file_mode() {
        let config = parse("[db]\npath = \"x\"\n[chunking]\nwhole_file = true\n").unwrap();
        assert_eq!(
            config.chunking.index_options().unwrap().mode,
            IndexMode::WholeFile
        );
    }
}
