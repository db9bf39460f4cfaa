//! # repo-rag
//!
//! Index a project's source, test, and documentation files into a local
//! vector store, retrieve the chunks most similar to a query, and use
//! them as grounding context for answers and generated tests.
//!
//! The pipeline itself (chunking, identity, indexing, retrieval, answer
//! synthesis, prompt templates) lives in [`repo_rag_core`]. This crate
//! adds the pieces that touch the outside world: configuration, the
//! SQLite store, HTTP embedding and chat providers, directory walking,
//! and the `rag` command implementations.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ src/ test/  │──▶│ chunk+embed  │──▶│   SQLite     │
//! │ docs/       │   │ (Indexer)    │   │ SqliteStore  │
//! └─────────────┘   └──────────────┘   └──────┬───────┘
//!                                             │ cosine top-K
//!                         ┌───────────────────┤
//!                         ▼                   ▼
//!                   ┌───────────┐       ┌────────────┐
//!                   │ rag query │       │rag generate│
//!                   │ --answer  │       │ unit/api/ui│
//!                   └───────────┘       └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! rag init
//! rag index --src ./src --test ./test --doc ./docs
//! rag query "how is division by zero handled?" --answer
//! rag generate --style unit --file ./src/calculator.py --output test_calc.py
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite [`VectorStore`](repo_rag_core::store::VectorStore) |
//! | [`http`] | Shared provider HTTP plumbing |
//! | [`embedding`] | OpenAI / Ollama / local embedding providers |
//! | [`generation`] | OpenAI chat completion provider |
//! | [`collect`] | Directory walking |
//! | [`history`] | Persisted chat history |
//! | [`index_cmd`], [`query_cmd`], [`generate_cmd`], [`collections`] | CLI commands |

pub mod collect;
pub mod collections;
pub mod config;
pub mod db;
pub mod embedding;
pub mod generate_cmd;
pub mod generation;
pub mod history;
pub mod http;
pub mod index_cmd;
pub mod migrate;
pub mod query_cmd;
pub mod sqlite_store;
