//! Indexing pipeline: read → chunk → embed → replace-or-insert.
//!
//! Every chunk is stored under a deterministic identifier (see
//! [`identity`](crate::identity::identity)), so indexing an unchanged
//! file twice leaves the collection exactly as the first run did.
//!
//! Failures are isolated per file. A file that cannot be read, or whose
//! chunks cannot be embedded or stored, is reported as
//! [`FileOutcome::Failed`] and the batch moves on. The remaining chunks
//! of a failing file are still attempted. Only errors reaching the
//! collection itself (creating it, listing its identifiers) abort the
//! batch.
//!
//! A chunk's embedding is computed before its previous version is
//! deleted, so an embedding failure leaves the prior document in place.
//!
//! A whitespace-only window is never embedded. If a document is already
//! stored under that window's identifier it is deleted, so the
//! collection does not keep the window's former text.
//!
//! Re-indexing a file that now produces fewer chunks leaves the former
//! higher-index documents in the collection.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::Serialize;

use crate::chunk::{chunk_lines, ChunkParams};
use crate::embedding::Embedder;
use crate::error::Result;
use crate::identity::identity;
use crate::models::{Document, DocumentMetadata, SourceFile, Tag};
use crate::store::VectorStore;

/// How files are split into documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IndexMode {
    /// One document per line window, identified by `tag:path:index`.
    #[default]
    Chunked,
    /// One document per file, identified by `tag:path`.
    WholeFile,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IndexOptions {
    pub chunking: ChunkParams,
    pub mode: IndexMode,
}

/// Result of indexing one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FileOutcome {
    Added {
        path: String,
        chunks: usize,
        replaced: usize,
    },
    Skipped {
        path: String,
        reason: String,
    },
    Failed {
        path: String,
        reason: String,
        chunks_written: usize,
    },
}

impl FileOutcome {
    pub fn path(&self) -> &str {
        match self {
            FileOutcome::Added { path, .. }
            | FileOutcome::Skipped { path, .. }
            | FileOutcome::Failed { path, .. } => path,
        }
    }
}

/// Summary of one `index` call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexReport {
    pub files: Vec<FileOutcome>,
}

impl IndexReport {
    pub fn added(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Added { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Failed { .. }))
    }

    pub fn chunks_written(&self) -> usize {
        self.files
            .iter()
            .map(|o| match o {
                FileOutcome::Added { chunks, .. } => *chunks,
                FileOutcome::Failed { chunks_written, .. } => *chunks_written,
                FileOutcome::Skipped { .. } => 0,
            })
            .sum()
    }

    pub fn merge(&mut self, other: IndexReport) {
        self.files.extend(other.files);
    }

    fn count(&self, pred: impl Fn(&FileOutcome) -> bool) -> usize {
        self.files.iter().filter(|o| pred(o)).count()
    }
}

/// Orchestrates chunking, embedding and storage for a batch of files.
pub struct Indexer<'a, S: VectorStore + ?Sized> {
    store: &'a S,
    embedder: &'a Embedder,
    options: IndexOptions,
}

impl<'a, S: VectorStore + ?Sized> Indexer<'a, S> {
    pub fn new(store: &'a S, embedder: &'a Embedder, options: IndexOptions) -> Self {
        Self {
            store,
            embedder,
            options,
        }
    }

    /// Read and index `paths` under `tag`.
    ///
    /// # Errors
    ///
    /// Only when the collection cannot be created or listed; per-file
    /// problems are reported in the returned [`IndexReport`].
    pub async fn index(&self, collection: &str, paths: &[PathBuf], tag: Tag) -> Result<IndexReport> {
        let mut files = Vec::with_capacity(paths.len());
        let mut report = IndexReport::default();

        for path in paths {
            match SourceFile::load(path, tag) {
                Ok(file) => files.push(file),
                Err(e) => {
                    let path = path.to_string_lossy().to_string();
                    tracing::warn!(path = %path, "failed to read file: {}", e);
                    report.files.push(FileOutcome::Failed {
                        path,
                        reason: format!("read failed: {}", e),
                        chunks_written: 0,
                    });
                }
            }
        }

        report.merge(self.index_files(collection, &files).await?);
        Ok(report)
    }

    /// Index already-read files, each under its own tag.
    ///
    /// # Errors
    ///
    /// See [`Indexer::index`].
    pub async fn index_files(&self, collection: &str, files: &[SourceFile]) -> Result<IndexReport> {
        self.store.get_or_create_collection(collection).await?;
        let mut existing = self.store.ids(collection).await?;
        let mut report = IndexReport::default();

        for file in files {
            let outcome = self.index_file(collection, file, &mut existing).await;
            match &outcome {
                FileOutcome::Added {
                    path,
                    chunks,
                    replaced,
                } => tracing::info!(
                    path = %path,
                    tag = %file.tag,
                    chunks,
                    replaced,
                    "indexed file"
                ),
                FileOutcome::Skipped { path, reason } => {
                    tracing::warn!(path = %path, "skipping file: {}", reason)
                }
                FileOutcome::Failed { path, reason, .. } => {
                    tracing::warn!(path = %path, "failed to index file: {}", reason)
                }
            }
            report.files.push(outcome);
        }

        Ok(report)
    }

    async fn index_file(
        &self,
        collection: &str,
        file: &SourceFile,
        existing: &mut HashSet<String>,
    ) -> FileOutcome {
        if file.is_blank() {
            return FileOutcome::Skipped {
                path: file.path.clone(),
                reason: "empty file".to_string(),
            };
        }

        let pieces: Vec<(String, Option<u32>)> = match self.options.mode {
            IndexMode::Chunked => chunk_lines(&file.content, self.options.chunking)
                .into_iter()
                .enumerate()
                .map(|(i, text)| (text, Some(i as u32)))
                .collect(),
            IndexMode::WholeFile => vec![(file.content.clone(), None)],
        };

        let total = pieces.len();
        let file_name = file.file_name();
        let mut written = 0usize;
        let mut replaced = 0usize;
        let mut errors: Vec<String> = Vec::new();

        for (text, chunk_index) in pieces {
            let id = identity(file.tag, &file.path, chunk_index);
            if text.trim().is_empty() {
                tracing::debug!(id = %id, "blank window, not embedded");
                if existing.contains(&id) {
                    match self.store.delete(collection, std::slice::from_ref(&id)).await {
                        Ok(()) => {
                            tracing::debug!(id = %id, "removed stale chunk for blank window");
                            existing.remove(&id);
                        }
                        Err(e) => errors.push(format!(
                            "chunk {}: {}",
                            chunk_index.unwrap_or(0),
                            e
                        )),
                    }
                }
                continue;
            }

            let embedding = match self.embedder.embed(&text).await {
                Ok(v) => v,
                Err(e) => {
                    errors.push(format!("chunk {}: {}", chunk_index.unwrap_or(0), e));
                    continue;
                }
            };

            let doc = Document {
                id: id.clone(),
                embedding,
                text,
                metadata: DocumentMetadata {
                    file_path: file.path.clone(),
                    file_name: file_name.clone(),
                    tag: file.tag,
                    language: file.language,
                    chunk_index: chunk_index.unwrap_or(0),
                },
            };

            match self.replace(collection, doc, existing).await {
                Ok(was_replaced) => {
                    written += 1;
                    if was_replaced {
                        replaced += 1;
                    }
                }
                Err(e) => errors.push(format!("chunk {}: {}", chunk_index.unwrap_or(0), e)),
            }
        }

        if errors.is_empty() {
            FileOutcome::Added {
                path: file.path.clone(),
                chunks: written,
                replaced,
            }
        } else {
            FileOutcome::Failed {
                path: file.path.clone(),
                reason: format!(
                    "{} of {} chunk(s) failed; first error: {}",
                    errors.len(),
                    total,
                    errors[0]
                ),
                chunks_written: written,
            }
        }
    }

    /// Delete the previous document with this identifier, then insert.
    async fn replace(
        &self,
        collection: &str,
        doc: Document,
        existing: &mut HashSet<String>,
    ) -> anyhow::Result<bool> {
        let was_present = existing.contains(&doc.id);
        if was_present {
            tracing::debug!(id = %doc.id, "replacing existing chunk");
            self.store
                .delete(collection, std::slice::from_ref(&doc.id))
                .await?;
            existing.remove(&doc.id);
        }
        self.store.insert(collection, &doc).await?;
        existing.insert(doc.id);
        Ok(was_present)
    }
}
