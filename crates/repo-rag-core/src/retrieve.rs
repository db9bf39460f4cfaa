//! Top-K retrieval with an optional metadata filter.
//!
//! The query text is embedded through the retrying [`Embedder`] and the
//! nearest documents are fetched from the store. Result order is the
//! store's similarity order; equally similar documents keep the store's
//! internal order and should be treated as an unordered set.

use crate::embedding::Embedder;
use crate::error::{RagError, Result};
use crate::models::{QueryFilter, RetrievalResult};
use crate::store::VectorStore;

pub struct Retriever<'a, S: VectorStore + ?Sized> {
    store: &'a S,
    embedder: &'a Embedder,
}

impl<'a, S: VectorStore + ?Sized> Retriever<'a, S> {
    pub fn new(store: &'a S, embedder: &'a Embedder) -> Self {
        Self { store, embedder }
    }

    /// Return at most `top_k` chunks ordered by decreasing similarity.
    ///
    /// An empty or missing collection yields an empty result, not an error.
    ///
    /// # Errors
    ///
    /// - [`RagError::InvalidInput`] for blank query text.
    /// - [`RagError::EmbeddingUnavailable`] when the query cannot be embedded.
    /// - [`RagError::Store`] when the store query fails.
    pub async fn retrieve(
        &self,
        collection: &str,
        query: &str,
        top_k: usize,
        filter: &QueryFilter,
    ) -> Result<RetrievalResult> {
        if query.trim().is_empty() {
            return Err(RagError::InvalidInput("query text is empty".to_string()));
        }

        let embedding = self.embedder.embed(query).await?;
        if top_k == 0 {
            return Ok(RetrievalResult::default());
        }

        let chunks = self
            .store
            .query(collection, &embedding, top_k, filter)
            .await?;

        tracing::debug!(
            collection,
            top_k,
            hits = chunks.len(),
            filtered = !filter.is_empty(),
            "retrieved chunks"
        );

        Ok(RetrievalResult { chunks })
    }
}
