//! `rag generate`: retrieval-augmented test generation.
//!
//! The query used for retrieval is the source file for `unit` tests and
//! the user prompt for `api`/`ui` tests. Retrieved chunk texts fill the
//! style's template and the rendered prompt goes to the chat model.
//!
//! With `--history`, the prior conversation is sent ahead of the new
//! message and the exchange is appended to the file afterwards.
//! `--correction` skips retrieval and asks the model to revise its last
//! answer in that conversation.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;

use repo_rag_core::embedding::Embedder;
use repo_rag_core::generation::{ChatMessage, GenerationProvider};
use repo_rag_core::models::QueryFilter;
use repo_rag_core::prompt::{build_test_prompt, TestStyle};
use repo_rag_core::retrieve::Retriever;
use repo_rag_core::store::VectorStore;

use crate::config::Config;
use crate::embedding::{create_embedder, OpenAiCredentials};
use crate::generation::create_generation_provider;
use crate::history::ChatHistory;
use crate::sqlite_store::SqliteStore;

#[derive(Debug, Clone, Default)]
pub struct GenerateArgs {
    pub style: TestStyle,
    pub file: Option<PathBuf>,
    pub prompt: Option<String>,
    pub correction: Option<String>,
    pub top_k: Option<usize>,
    pub collection: Option<String>,
    pub output: Option<PathBuf>,
    pub history: Option<PathBuf>,
}

pub async fn run_generate(
    config: &Config,
    creds: &OpenAiCredentials,
    args: &GenerateArgs,
) -> Result<()> {
    let provider = create_generation_provider(&config.generation, creds)?;

    let mut history = match &args.history {
        Some(path) => ChatHistory::load(path)?,
        None => ChatHistory::default(),
    };

    let user_message = match &args.correction {
        Some(correction) => {
            if history.messages.is_empty() {
                bail!("--correction needs a --history file with a previous exchange");
            }
            format!("Please apply this correction: {}", correction)
        }
        None => {
            let embedder = create_embedder(&config.embedding, creds)?;
            let store = SqliteStore::open(&config.db.path).await?;
            let prompt = build_prompt(&store, &embedder, config, args).await;
            store.close().await;
            prompt?
        }
    };

    let generated = complete(
        provider.as_ref(),
        &history.messages,
        &user_message,
        config.generation.temperature,
    )
    .await?;

    println!("{}", generated);

    if let Some(output) = &args.output {
        std::fs::write(output, &generated)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        eprintln!("Saved to {}", output.display());
    }

    if let Some(path) = &args.history {
        history.push_exchange(&user_message, &generated);
        history.save(path)?;
    }

    Ok(())
}

/// Retrieve context and render the prompt for `args.style`.
pub async fn build_prompt<S: VectorStore + ?Sized>(
    store: &S,
    embedder: &Embedder,
    config: &Config,
    args: &GenerateArgs,
) -> Result<String> {
    let (source_code, user_prompt) = resolve_inputs(args)?;
    let query = if args.style.needs_source() {
        source_code.as_str()
    } else {
        user_prompt.unwrap_or_default()
    };

    let collection = args
        .collection
        .as_deref()
        .unwrap_or(&config.retrieval.collection);
    let top_k = args.top_k.unwrap_or(config.retrieval.context_top_k);

    let context = Retriever::new(store, embedder)
        .retrieve(collection, query, top_k, &QueryFilter::default())
        .await?;
    tracing::info!(style = %args.style, chunks = context.len(), "retrieved generation context");

    Ok(build_test_prompt(
        args.style,
        &source_code,
        &context.texts(),
        user_prompt,
    ))
}

/// Source code for `unit`, the user prompt for `api`/`ui`.
fn resolve_inputs(args: &GenerateArgs) -> Result<(String, Option<&str>)> {
    if args.style.needs_source() {
        let path = match &args.file {
            Some(path) => path,
            None => bail!("--file is required for unit tests"),
        };
        if !path.exists() {
            bail!("{} not found", path.display());
        }
        let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let source = String::from_utf8_lossy(&bytes).into_owned();
        if source.trim().is_empty() {
            bail!("Source file is empty: {}", path.display());
        }
        return Ok((source, None));
    }

    match args.prompt.as_deref().map(str::trim) {
        Some(prompt) if !prompt.is_empty() => Ok((String::new(), Some(prompt))),
        _ => bail!("--prompt is required for {} tests", args.style),
    }
}

async fn complete(
    provider: &dyn GenerationProvider,
    history: &[ChatMessage],
    user_message: &str,
    temperature: f32,
) -> Result<String> {
    let mut messages = history.to_vec();
    messages.push(ChatMessage::user(user_message));
    let reply = provider
        .complete(&messages, temperature)
        .await
        .map_err(|e| anyhow::anyhow!("Generation failed: {}", e))?;
    Ok(reply.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use repo_rag_core::ProviderError;
    use tempfile::TempDir;

    #[test]
    fn test_unit_requires_non_empty_file() {
        let tmp = TempDir::new().unwrap();
        let args = GenerateArgs::default();
        assert!(resolve_inputs(&args).is_err());

        let empty = tmp.path().join("empty.py");
        std::fs::write(&empty, "  \n").unwrap();
        let args = GenerateArgs {
            file: Some(empty),
            ..GenerateArgs::default()
        };
        let err = resolve_inputs(&args).unwrap_err();
        assert!(err.to_string().contains("empty"));

        let src = tmp.path().join("calc.py");
        std::fs::write(&src, "def add(a, b):\n    return a + b\n").unwrap();
        let args = GenerateArgs {
            file: Some(src),
            prompt: Some("ignored".to_string()),
            ..GenerateArgs::default()
        };
        let (source, prompt) = resolve_inputs(&args).unwrap();
        assert!(source.starts_with("def add"));
        assert!(prompt.is_none());
    }

    #[test]
    fn test_api_and_ui_require_prompt() {
        for style in [TestStyle::Api, TestStyle::Ui] {
            let args = GenerateArgs {
                style,
                prompt: Some("   ".to_string()),
                ..GenerateArgs::default()
            };
            assert!(resolve_inputs(&args).is_err());

            let args = GenerateArgs {
                style,
                prompt: Some("POST /add sums numbers".to_string()),
                ..GenerateArgs::default()
            };
            let (source, prompt) = resolve_inputs(&args).unwrap();
            assert!(source.is_empty());
            assert_eq!(prompt, Some("POST /add sums numbers"));
        }
    }

    struct RecordingProvider {
        seen: Mutex<Vec<ChatMessage>>,
    }

    #[async_trait]
    impl GenerationProvider for RecordingProvider {
        fn model_name(&self) -> &str {
            "recording"
        }

        async fn complete(
            &self,
            messages: &[ChatMessage],
            _temperature: f32,
        ) -> Result<String, ProviderError> {
            *self.seen.lock().unwrap() = messages.to_vec();
            Ok("  def test_add(): assert add(1, 2) == 3\n".to_string())
        }
    }

    #[tokio::test]
    async fn test_complete_sends_history_then_message() {
        let provider = RecordingProvider {
            seen: Mutex::new(Vec::new()),
        };
        let history = vec![
            ChatMessage::user("first"),
            ChatMessage::assistant("reply"),
        ];
        let out = complete(&provider, &history, "Please apply this correction: x", 0.2)
            .await
            .unwrap();
        assert_eq!(out, "def test_add(): assert add(1, 2) == 3");

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[2].content, "Please apply this correction: x");
    }
}
