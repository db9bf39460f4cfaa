//! SQLite-backed [`VectorStore`] implementation.
//!
//! All collections share one database file. Each document row carries
//! its embedding as a little-endian f32 BLOB plus the metadata columns
//! used for filtering. Similarity is brute-force cosine over the rows
//! that pass the filter, ranked in process.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use repo_rag_core::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use repo_rag_core::models::{Document, DocumentMetadata, Language, QueryFilter, RetrievedChunk, Tag};
use repo_rag_core::store::{rank_candidates, CollectionInfo, VectorStore};

use crate::db;
use crate::migrate;

/// SQLite implementation of the [`VectorStore`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database at `path` and apply the schema.
    pub async fn open(path: &Path) -> Result<Self> {
        let pool = db::connect_path(path).await?;
        migrate::migrate(&pool).await?;
        Ok(Self::new(pool))
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

fn row_metadata(row: &SqliteRow) -> Result<DocumentMetadata> {
    let tag: String = row.get("tag");
    let language: String = row.get("language");
    let chunk_index: i64 = row.get("chunk_index");
    Ok(DocumentMetadata {
        file_path: row.get("file_path"),
        file_name: row.get("file_name"),
        tag: tag.parse::<Tag>().map_err(|e| anyhow!(e))?,
        language: language.parse::<Language>().map_err(|e| anyhow!(e))?,
        chunk_index: u32::try_from(chunk_index)?,
    })
}

#[async_trait]
impl VectorStore for SqliteStore {
    async fn get_or_create_collection(&self, name: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query("INSERT INTO collections (name, created_at) VALUES (?, ?) ON CONFLICT(name) DO NOTHING")
            .bind(name)
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
        let rows = sqlx::query(
            r#"
            SELECT c.name AS name, COUNT(d.seq) AS documents
            FROM collections c
            LEFT JOIN documents d ON d.collection = c.name
            GROUP BY c.name
            ORDER BY c.name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<CollectionInfo> {
                let documents: i64 = row.get("documents");
                Ok(CollectionInfo {
                    name: row.get("name"),
                    documents: usize::try_from(documents)?,
                })
            })
            .collect()
    }

    async fn delete_collection(&self, name: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM documents WHERE collection = ?")
            .bind(name)
            .execute(&mut *tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM collections WHERE name = ?")
            .bind(name)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(deleted > 0)
    }

    async fn ids(&self, collection: &str) -> Result<HashSet<String>> {
        let ids: Vec<String> = sqlx::query_scalar("SELECT id FROM documents WHERE collection = ?")
            .bind(collection)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids.into_iter().collect())
    }

    async fn insert(&self, collection: &str, doc: &Document) -> Result<()> {
        let taken: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE collection = ? AND id = ?")
                .bind(collection)
                .bind(&doc.id)
                .fetch_one(&self.pool)
                .await?;
        if taken > 0 {
            bail!(
                "document '{}' already exists in collection '{}'",
                doc.id,
                collection
            );
        }

        self.get_or_create_collection(collection).await?;

        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, text, embedding, file_path, file_name,
                                   tag, language, chunk_index)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(collection)
        .bind(&doc.id)
        .bind(&doc.text)
        .bind(vec_to_blob(&doc.embedding))
        .bind(&doc.metadata.file_path)
        .bind(&doc.metadata.file_name)
        .bind(doc.metadata.tag.as_str())
        .bind(doc.metadata.language.as_str())
        .bind(i64::from(doc.metadata.chunk_index))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, collection: &str, ids: &[String]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for id in ids {
            sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
                .bind(collection)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let row = sqlx::query(
            r#"
            SELECT id, text, embedding, file_path, file_name, tag, language, chunk_index
            FROM documents
            WHERE collection = ? AND id = ?
            "#,
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let row = match row {
            Some(row) => row,
            None => return Ok(None),
        };

        let blob: Vec<u8> = row.get("embedding");
        Ok(Some(Document {
            id: row.get("id"),
            embedding: blob_to_vec(&blob),
            text: row.get("text"),
            metadata: row_metadata(&row)?,
        }))
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE collection = ?")
            .bind(collection)
            .fetch_one(&self.pool)
            .await?;
        Ok(usize::try_from(count)?)
    }

    async fn query(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
        filter: &QueryFilter,
    ) -> Result<Vec<RetrievedChunk>> {
        let tag = filter.tag.map(|t| t.as_str());
        let language = filter.language.map(|l| l.as_str());

        let rows = sqlx::query(
            r#"
            SELECT id, text, embedding, file_path, file_name, tag, language, chunk_index
            FROM documents
            WHERE collection = ?
              AND (? IS NULL OR tag = ?)
              AND (? IS NULL OR language = ?)
            ORDER BY seq ASC
            "#,
        )
        .bind(collection)
        .bind(tag)
        .bind(tag)
        .bind(language)
        .bind(language)
        .fetch_all(&self.pool)
        .await?;

        let mut candidates = Vec::with_capacity(rows.len());
        for row in &rows {
            let blob: Vec<u8> = row.get("embedding");
            candidates.push(RetrievedChunk {
                id: row.get("id"),
                text: row.get("text"),
                metadata: row_metadata(row)?,
                score: cosine_similarity(embedding, &blob_to_vec(&blob)),
            });
        }

        Ok(rank_candidates(candidates, top_k))
    }
}
