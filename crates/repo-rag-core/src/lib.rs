//! # repo-rag core
//!
//! Indexing and retrieval logic for repo-rag: data models, line-window
//! chunking, deterministic document identity, the vector store trait,
//! the indexer, the retriever, and grounded answer synthesis.
//!
//! This crate has no database, HTTP, or CLI dependencies. Providers and
//! the persistent store are supplied by the application through the
//! [`embedding::EmbeddingProvider`], [`generation::GenerationProvider`]
//! and [`store::VectorStore`] traits.
//!
//! ```text
//!  files ──▶ chunk ──▶ Embedder ──▶ identity ──▶ VectorStore
//!                         ▲                          │
//!  query ─────────────────┘                          ▼
//!                                   Retriever ──▶ Synthesizer ──▶ answer
//! ```

pub mod chunk;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod identity;
pub mod index;
pub mod models;
pub mod prompt;
pub mod retrieve;
pub mod store;
pub mod synthesize;

pub use error::{ProviderError, RagError};
