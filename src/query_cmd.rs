//! `rag query`: retrieve ranked chunks and optionally synthesize an answer.

use anyhow::Result;

use repo_rag_core::models::{Language, QueryFilter, RetrievedChunk, Tag};
use repo_rag_core::retrieve::Retriever;
use repo_rag_core::synthesize::Synthesizer;

use crate::config::Config;
use crate::embedding::{create_embedder, OpenAiCredentials};
use crate::generation::create_generation_provider;
use crate::sqlite_store::SqliteStore;

const SNIPPET_CHARS: usize = 500;

#[derive(Debug, Clone, Default)]
pub struct QueryArgs {
    pub text: String,
    pub top_k: Option<usize>,
    pub tag: Option<Tag>,
    pub language: Option<Language>,
    pub collection: Option<String>,
    pub answer: bool,
}

pub async fn run_query(config: &Config, creds: &OpenAiCredentials, args: &QueryArgs) -> Result<()> {
    let collection = args
        .collection
        .as_deref()
        .unwrap_or(&config.retrieval.collection);
    let top_k = args.top_k.unwrap_or(config.retrieval.top_k);
    let filter = QueryFilter {
        tag: args.tag,
        language: args.language,
    };

    let embedder = create_embedder(&config.embedding, creds)?;
    // Build the generator before retrieval so a bad setup fails fast.
    let synthesizer = if args.answer {
        let provider = create_generation_provider(&config.generation, creds)?;
        Some(Synthesizer::new(provider).with_temperature(config.generation.temperature))
    } else {
        None
    };

    let store = SqliteStore::open(&config.db.path).await?;
    let result = Retriever::new(&store, &embedder)
        .retrieve(collection, &args.text, top_k, &filter)
        .await;
    store.close().await;
    let result = result?;

    if result.is_empty() {
        println!("No results.");
    }
    for (i, chunk) in result.chunks.iter().enumerate() {
        print_chunk(i + 1, chunk);
    }

    if let Some(synthesizer) = synthesizer {
        let answer = synthesizer.synthesize(&args.text, &result.chunks).await;
        println!("Answer:");
        if answer.is_empty() {
            println!("  (answer unavailable)");
        } else {
            println!("{}", answer);
        }
    }

    Ok(())
}

fn print_chunk(rank: usize, chunk: &RetrievedChunk) {
    println!(
        "#{} {} ({})  score={:.3}",
        rank, chunk.metadata.file_path, chunk.metadata.tag, chunk.score
    );
    println!("{}", snippet(&chunk.text, SNIPPET_CHARS));
    println!();
}

/// First `max` characters of `text`, with `...` appended when cut.
pub fn snippet(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snippet_truncates_on_char_boundary() {
        assert_eq!(snippet("short", 500), "short");
        assert_eq!(snippet("abcdef", 3), "abc...");
        assert_eq!(snippet("ééééé", 2), "éé...");
        let exact = "x".repeat(500);
        assert_eq!(snippet(&exact, 500), exact);
    }
}
