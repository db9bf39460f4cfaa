//! In-memory [`VectorStore`] implementation for tests.
//!
//! Collections are `Vec`s in insertion order behind a `std::sync::RwLock`.
//! Query is brute-force cosine similarity over every stored vector.

use std::collections::{BTreeMap, HashSet};
use std::sync::RwLock;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::models::{Document, QueryFilter, RetrievedChunk};

use super::{rank_candidates, CollectionInfo, VectorStore};

/// In-memory store. Contents are lost when dropped.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    collections: RwLock<BTreeMap<String, Vec<Document>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn get_or_create_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.collections.write().unwrap();
        collections.entry(name.to_string()).or_default();
        Ok(())
    }

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
        let collections = self.collections.read().unwrap();
        Ok(collections
            .iter()
            .map(|(name, docs)| CollectionInfo {
                name: name.clone(),
                documents: docs.len(),
            })
            .collect())
    }

    async fn delete_collection(&self, name: &str) -> Result<bool> {
        let mut collections = self.collections.write().unwrap();
        Ok(collections.remove(name).is_some())
    }

    async fn ids(&self, collection: &str) -> Result<HashSet<String>> {
        let collections = self.collections.read().unwrap();
        Ok(collections
            .get(collection)
            .map(|docs| docs.iter().map(|d| d.id.clone()).collect())
            .unwrap_or_default())
    }

    async fn insert(&self, collection: &str, doc: &Document) -> Result<()> {
        let mut collections = self.collections.write().unwrap();
        let docs = collections.entry(collection.to_string()).or_default();
        if docs.iter().any(|d| d.id == doc.id) {
            bail!(
                "document '{}' already exists in collection '{}'",
                doc.id,
                collection
            );
        }
        docs.push(doc.clone());
        Ok(())
    }

    async fn delete(&self, collection: &str, ids: &[String]) -> Result<()> {
        let mut collections = self.collections.write().unwrap();
        if let Some(docs) = collections.get_mut(collection) {
            docs.retain(|d| !ids.contains(&d.id));
        }
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let collections = self.collections.read().unwrap();
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id).cloned()))
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let collections = self.collections.read().unwrap();
        Ok(collections.get(collection).map_or(0, Vec::len))
    }

    async fn query(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
        filter: &QueryFilter,
    ) -> Result<Vec<RetrievedChunk>> {
        let collections = self.collections.read().unwrap();
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let candidates = docs
            .iter()
            .filter(|d| filter.matches(&d.metadata))
            .map(|d| RetrievedChunk {
                id: d.id.clone(),
                text: d.text.clone(),
                metadata: d.metadata.clone(),
                score: cosine_similarity(embedding, &d.embedding),
            })
            .collect();

        Ok(rank_candidates(candidates, top_k))
    }
}
