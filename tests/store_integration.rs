//! SQLite store behavior through the core indexer and retriever.

use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;

use repo_rag::sqlite_store::SqliteStore;
use repo_rag_core::chunk::ChunkParams;
use repo_rag_core::embedding::{Embedder, EmbeddingProvider};
use repo_rag_core::identity::identity;
use repo_rag_core::index::{IndexMode, IndexOptions, Indexer};
use repo_rag_core::models::{Document, DocumentMetadata, Language, QueryFilter, SourceFile, Tag};
use repo_rag_core::retrieve::Retriever;
use repo_rag_core::store::VectorStore;
use repo_rag_core::ProviderError;

/// Counts of a few keywords, so similarity is predictable.
struct KeywordProvider;

const KEYWORDS: [&str; 4] = ["add", "divide", "http", "test"];

#[async_trait]
impl EmbeddingProvider for KeywordProvider {
    fn model_name(&self) -> &str {
        "keywords"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let lower = text.to_lowercase();
        let mut v: Vec<f32> = KEYWORDS
            .iter()
            .map(|k| lower.matches(k).count() as f32)
            .collect();
        v.push(0.1);
        Ok(v)
    }
}

fn embedder() -> Embedder {
    Embedder::new(Arc::new(KeywordProvider))
}

fn options(window: usize, overlap: usize) -> IndexOptions {
    IndexOptions {
        chunking: ChunkParams::new(window, overlap).unwrap(),
        mode: IndexMode::Chunked,
    }
}

async fn open(tmp: &TempDir) -> SqliteStore {
    SqliteStore::open(&tmp.path().join("data/rag.sqlite"))
        .await
        .unwrap()
}

fn files() -> Vec<SourceFile> {
    vec![
        SourceFile::new(
            "src/calculator.py",
            "def add(a, b):\n    return a + b\n\ndef divide(a, b):\n    return a / b\n",
            Tag::Source,
        ),
        SourceFile::new(
            "test/test_calculator.py",
            "def test_add():\n    assert add(1, 2) == 3\n",
            Tag::Test,
        ),
        SourceFile::new(
            "docs/api.md",
            "# API\nGET /add over http\nGET /divide over http\n",
            Tag::Doc,
        ),
    ]
}

#[tokio::test]
async fn test_index_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let store = open(&tmp).await;
    let embedder = embedder();
    let indexer = Indexer::new(&store, &embedder, options(2, 1));

    let first = indexer.index_files("code_docs", &files()).await.unwrap();
    let count = store.count("code_docs").await.unwrap();
    assert_eq!(count, first.chunks_written());
    assert_eq!(first.failed(), 0);

    indexer.index_files("code_docs", &files()).await.unwrap();
    assert_eq!(store.count("code_docs").await.unwrap(), count);
}

#[tokio::test]
async fn test_changed_content_replaces_document() {
    let tmp = TempDir::new().unwrap();
    let store = open(&tmp).await;
    let embedder = embedder();
    let indexer = Indexer::new(&store, &embedder, options(10, 2));

    let v1 = SourceFile::new("src/a.py", "def add(): pass\n", Tag::Source);
    let v2 = SourceFile::new("src/a.py", "def divide(): pass\n", Tag::Source);
    indexer.index_files("c", &[v1]).await.unwrap();
    indexer.index_files("c", &[v2]).await.unwrap();

    let id = identity(Tag::Source, "src/a.py", Some(0));
    let doc = store.get("c", &id).await.unwrap().unwrap();
    assert_eq!(doc.text, "def divide(): pass");
    assert_eq!(doc.metadata.language, Language::Python);
    assert_eq!(doc.metadata.file_name, "a.py");
    assert_eq!(store.count("c").await.unwrap(), 1);
}

#[tokio::test]
async fn test_same_path_under_two_tags_coexists() {
    let tmp = TempDir::new().unwrap();
    let store = open(&tmp).await;
    let embedder = embedder();
    let indexer = Indexer::new(&store, &embedder, options(10, 2));

    indexer
        .index_files(
            "c",
            &[
                SourceFile::new("x.py", "def add(): pass\n", Tag::Source),
                SourceFile::new("x.py", "def add(): pass\n", Tag::Test),
            ],
        )
        .await
        .unwrap();
    assert_eq!(store.count("c").await.unwrap(), 2);
}

#[tokio::test]
async fn test_retrieve_with_filters() {
    let tmp = TempDir::new().unwrap();
    let store = open(&tmp).await;
    let embedder = embedder();
    Indexer::new(&store, &embedder, options(2, 1))
        .index_files("code_docs", &files())
        .await
        .unwrap();

    let retriever = Retriever::new(&store, &embedder);

    let all = retriever
        .retrieve("code_docs", "divide", 10, &QueryFilter::default())
        .await
        .unwrap();
    assert!(!all.is_empty());
    assert!(all.chunks[0].text.contains("divide"));
    for pair in all.chunks.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }

    let docs = retriever
        .retrieve("code_docs", "http", 10, &QueryFilter::tag(Tag::Doc))
        .await
        .unwrap();
    assert!(!docs.is_empty());
    assert!(docs.chunks.iter().all(|c| c.metadata.tag == Tag::Doc));

    let none = retriever
        .retrieve(
            "code_docs",
            "add",
            10,
            &QueryFilter::tag(Tag::Doc).with_language(Language::Python),
        )
        .await
        .unwrap();
    assert!(none.is_empty());

    let capped = retriever
        .retrieve("code_docs", "add", 1, &QueryFilter::default())
        .await
        .unwrap();
    assert_eq!(capped.len(), 1);
}

#[tokio::test]
async fn test_empty_and_missing_collections() {
    let tmp = TempDir::new().unwrap();
    let store = open(&tmp).await;
    store.get_or_create_collection("empty").await.unwrap();

    let hits = store
        .query("empty", &[1.0, 0.0], 3, &QueryFilter::default())
        .await
        .unwrap();
    assert!(hits.is_empty());
    let hits = store
        .query("missing", &[1.0, 0.0], 3, &QueryFilter::default())
        .await
        .unwrap();
    assert!(hits.is_empty());
    assert_eq!(store.count("missing").await.unwrap(), 0);
}

#[tokio::test]
async fn test_insert_rejects_duplicate_id() {
    let tmp = TempDir::new().unwrap();
    let store = open(&tmp).await;
    let doc = Document {
        id: "source:a.py:0".to_string(),
        embedding: vec![1.0, 0.0],
        text: "a".to_string(),
        metadata: DocumentMetadata {
            file_path: "a.py".to_string(),
            file_name: "a.py".to_string(),
            tag: Tag::Source,
            language: Language::Python,
            chunk_index: 0,
        },
    };
    store.insert("c", &doc).await.unwrap();
    assert!(store.insert("c", &doc).await.is_err());

    let mut replaced = doc.clone();
    replaced.text = "b".to_string();
    store.upsert("c", std::slice::from_ref(&replaced)).await.unwrap();
    assert_eq!(store.get("c", &doc.id).await.unwrap().unwrap().text, "b");
    assert_eq!(store.count("c").await.unwrap(), 1);
}

#[tokio::test]
async fn test_list_drop_and_reopen() {
    let tmp = TempDir::new().unwrap();
    {
        let store = open(&tmp).await;
        let embedder = embedder();
        let indexer = Indexer::new(&store, &embedder, options(2, 1));
        indexer.index_files("b_docs", &files()).await.unwrap();
        indexer.index_files("a_docs", &files()[..1]).await.unwrap();
        store.close().await;
    }

    let store = open(&tmp).await;
    let listed = store.list_collections().await.unwrap();
    let names: Vec<&str> = listed.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["a_docs", "b_docs"]);
    assert!(listed.iter().all(|c| c.documents > 0));

    let ids = store.ids("a_docs").await.unwrap();
    assert!(ids.contains(&identity(Tag::Source, "src/calculator.py", Some(0))));

    assert!(store.delete_collection("a_docs").await.unwrap());
    assert!(!store.delete_collection("a_docs").await.unwrap());
    assert_eq!(store.count("a_docs").await.unwrap(), 0);
    assert_eq!(store.list_collections().await.unwrap().len(), 1);
}
