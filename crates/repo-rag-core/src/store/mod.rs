//! Vector store abstraction.
//!
//! The [`VectorStore`] trait is the boundary to the persistent
//! key-value-plus-similarity index. A store holds named collections;
//! each collection maps document identifiers to [`Document`]s.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.
//! The SQLite implementation lives in the app crate; [`memory`] provides
//! an in-process store for tests.
//!
//! # Operations
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`get_or_create_collection`](VectorStore::get_or_create_collection) | Reference a collection, creating it on first use |
//! | [`list_collections`](VectorStore::list_collections) | Names of all collections |
//! | [`delete_collection`](VectorStore::delete_collection) | Drop a collection and its documents |
//! | [`ids`](VectorStore::ids) | Identifiers currently stored in a collection |
//! | [`insert`](VectorStore::insert) | Add a document whose identifier is free |
//! | [`delete`](VectorStore::delete) | Remove documents by identifier |
//! | [`upsert`](VectorStore::upsert) | Delete-if-exists then insert |
//! | [`get`](VectorStore::get) | Fetch one document |
//! | [`count`](VectorStore::count) | Number of documents in a collection |
//! | [`query`](VectorStore::query) | Top-K nearest documents under a filter |

pub mod memory;

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Document, QueryFilter, RetrievedChunk};

/// A collection with its document count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionInfo {
    pub name: String,
    pub documents: usize,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn get_or_create_collection(&self, name: &str) -> Result<()>;

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>>;

    /// Returns `false` when no collection with that name existed.
    async fn delete_collection(&self, name: &str) -> Result<bool>;

    async fn ids(&self, collection: &str) -> Result<HashSet<String>>;

    /// Insert a document. Fails if the identifier is already taken.
    async fn insert(&self, collection: &str, doc: &Document) -> Result<()>;

    /// Delete documents by identifier. Unknown identifiers are ignored.
    async fn delete(&self, collection: &str, ids: &[String]) -> Result<()>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    async fn count(&self, collection: &str) -> Result<usize>;

    /// Top-K documents by decreasing cosine similarity to `embedding`.
    ///
    /// Documents failing `filter` are never returned. A missing or empty
    /// collection yields an empty list.
    async fn query(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
        filter: &QueryFilter,
    ) -> Result<Vec<RetrievedChunk>>;

    /// Replace-or-insert, implemented as delete-if-exists then insert.
    async fn upsert(&self, collection: &str, docs: &[Document]) -> Result<()> {
        let ids: Vec<String> = docs.iter().map(|d| d.id.clone()).collect();
        self.delete(collection, &ids).await?;
        for doc in docs {
            self.insert(collection, doc).await?;
        }
        Ok(())
    }
}

/// Sort by score (desc) keeping insertion order for ties, then truncate.
pub fn rank_candidates(mut candidates: Vec<RetrievedChunk>, top_k: usize) -> Vec<RetrievedChunk> {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    candidates.truncate(top_k);
    candidates
}
