//! `rag index`: collect files from the source, test, and doc directories
//! and upsert their chunks into a collection.

use anyhow::{bail, Result};
use std::path::PathBuf;

use repo_rag_core::embedding::Embedder;
use repo_rag_core::index::{FileOutcome, IndexReport, Indexer};
use repo_rag_core::models::Tag;
use repo_rag_core::store::VectorStore;

use crate::collect::collect_files;
use crate::config::Config;
use crate::embedding::{create_embedder, OpenAiCredentials};
use crate::sqlite_store::SqliteStore;

/// Directories to index, one per tag.
#[derive(Debug, Clone, Default)]
pub struct IndexDirs {
    pub src: Option<PathBuf>,
    pub test: Option<PathBuf>,
    pub doc: Option<PathBuf>,
}

impl IndexDirs {
    fn is_empty(&self) -> bool {
        self.src.is_none() && self.test.is_none() && self.doc.is_none()
    }
}

pub async fn run_index(
    config: &Config,
    creds: &OpenAiCredentials,
    dirs: &IndexDirs,
    collection: Option<&str>,
) -> Result<()> {
    if dirs.is_empty() {
        bail!("Nothing to index: pass at least one of --src, --test, --doc");
    }
    let collection = collection.unwrap_or(&config.retrieval.collection);

    let embedder = create_embedder(&config.embedding, creds)?;
    let store = SqliteStore::open(&config.db.path).await?;

    println!("Indexing into collection '{}' (model: {})", collection, embedder.model_name());
    let report = index_dirs(&store, &embedder, config, dirs, collection).await?;
    store.close().await;

    print_report(&report);
    Ok(())
}

/// Index every configured directory into `collection`.
pub async fn index_dirs<S: VectorStore + ?Sized>(
    store: &S,
    embedder: &Embedder,
    config: &Config,
    dirs: &IndexDirs,
    collection: &str,
) -> Result<IndexReport> {
    let indexer = Indexer::new(store, embedder, config.chunking.index_options()?);
    let code_exts = &config.sources.code_extensions;
    let doc_exts = &config.sources.doc_extensions;

    let plan = [
        (dirs.src.as_ref(), code_exts, Tag::Source),
        (dirs.test.as_ref(), code_exts, Tag::Test),
        (dirs.doc.as_ref(), doc_exts, Tag::Doc),
    ];

    let mut report = IndexReport::default();
    for (dir, exts, tag) in plan {
        let Some(dir) = dir else { continue };
        let files = collect_files(dir, exts, &config.sources)?;
        tracing::info!(dir = %dir.display(), tag = %tag, files = files.len(), "collected files");
        report.merge(indexer.index(collection, &files, tag).await?);
    }

    Ok(report)
}

fn print_report(report: &IndexReport) {
    for outcome in &report.files {
        match outcome {
            FileOutcome::Added {
                path,
                chunks,
                replaced,
            } => {
                if *replaced > 0 {
                    println!("  added    {} ({} chunks, {} replaced)", path, chunks, replaced);
                } else {
                    println!("  added    {} ({} chunks)", path, chunks);
                }
            }
            FileOutcome::Skipped { path, reason } => println!("  skipped  {}: {}", path, reason),
            FileOutcome::Failed { path, reason, .. } => println!("  failed   {}: {}", path, reason),
        }
    }
    println!();
    println!(
        "Files: {} added, {} skipped, {} failed; {} chunks written",
        report.added(),
        report.skipped(),
        report.failed(),
        report.chunks_written()
    );
}
