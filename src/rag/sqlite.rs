//! SQLite-backed vector store.
//!
//! In-process persistent index: chunk text and metadata in SQLite, vectors as
//! little-endian `f32` blobs, brute-force cosine similarity for search.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::store::VectorStore;
use super::types::{EmbeddingRecord, Metadata, QueryResult};
use crate::core::errors::RagError;

pub const INDEX_FILE_NAME: &str = "index.db";

pub struct SqliteVectorStore {
    pool: SqlitePool,
    db_path: PathBuf,
}

impl SqliteVectorStore {
    /// Opens (or creates) the index inside `index_dir`.
    pub async fn open(index_dir: &Path) -> Result<Self, RagError> {
        std::fs::create_dir_all(index_dir)?;
        Self::with_path(index_dir.join(INDEX_FILE_NAME)).await
    }

    pub async fn with_path(db_path: PathBuf) -> Result<Self, RagError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Full);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await?;

        let store = Self { pool, db_path };
        store.init_schema().await?;
        tracing::info!("Vector index opened at {}", store.db_path.display());
        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    async fn init_schema(&self) -> Result<(), RagError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS chunks (
                id TEXT PRIMARY KEY,
                seq INTEGER NOT NULL,
                content TEXT NOT NULL,
                metadata TEXT NOT NULL DEFAULT '{}',
                embedding BLOB NOT NULL,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS index_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }

        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        let denom = norm_a * norm_b;

        if denom <= f32::EPSILON {
            0.0
        } else {
            dot / denom
        }
    }

    fn parse_metadata(raw: &str) -> Metadata {
        serde_json::from_str::<Metadata>(raw).unwrap_or_default()
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn insert_batch(&self, records: Vec<EmbeddingRecord>) -> Result<Vec<String>, RagError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.pool.begin().await?;

        let stored_dim: Option<String> =
            sqlx::query_scalar("SELECT value FROM index_meta WHERE key = 'dimension'")
                .fetch_optional(&mut *tx)
                .await?;
        let expected = match stored_dim {
            Some(raw) => usize::from_str(&raw).map_err(RagError::storage)?,
            None => records[0].embedding.len(),
        };
        if expected == 0 {
            return Err(RagError::InvalidArgument(
                "embedding vectors must not be empty".to_string(),
            ));
        }
        if let Some(bad) = records.iter().find(|r| r.embedding.len() != expected) {
            return Err(RagError::DimensionMismatch {
                expected,
                actual: bad.embedding.len(),
            });
        }

        sqlx::query(
            "INSERT OR IGNORE INTO index_meta (key, value) VALUES ('dimension', ?1)",
        )
        .bind(expected.to_string())
        .execute(&mut *tx)
        .await?;

        let next_seq: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(seq), 0) + 1 FROM chunks")
            .fetch_one(&mut *tx)
            .await?;

        let mut ids = Vec::with_capacity(records.len());
        for (offset, record) in records.iter().enumerate() {
            let id = uuid::Uuid::new_v4().to_string();
            let metadata_str =
                serde_json::to_string(&record.chunk.metadata).map_err(RagError::storage)?;
            let blob = Self::serialize_embedding(&record.embedding);

            sqlx::query(
                "INSERT INTO chunks (id, seq, content, metadata, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(&id)
            .bind(next_seq + offset as i64)
            .bind(&record.chunk.text)
            .bind(&metadata_str)
            .bind(&blob)
            .execute(&mut *tx)
            .await?;

            ids.push(id);
        }

        tx.commit().await?;
        tracing::debug!("Committed {} records to {}", ids.len(), self.db_path.display());
        Ok(ids)
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<QueryResult>, RagError> {
        if let Some(expected) = self.dimension().await? {
            if query_embedding.len() != expected {
                return Err(RagError::DimensionMismatch {
                    expected,
                    actual: query_embedding.len(),
                });
            }
        }

        let rows = sqlx::query("SELECT content, metadata, embedding FROM chunks ORDER BY seq")
            .fetch_all(&self.pool)
            .await?;

        let mut scored: Vec<QueryResult> = rows
            .iter()
            .map(|row| {
                let embedding_bytes: Vec<u8> = row.get("embedding");
                let stored = Self::deserialize_embedding(&embedding_bytes);
                let metadata: String = row.get("metadata");
                QueryResult {
                    content: row.get("content"),
                    metadata: Self::parse_metadata(&metadata),
                    score: Self::cosine_similarity(query_embedding, &stored),
                }
            })
            .collect();

        // Stable sort keeps insertion order among equal scores.
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit);

        Ok(scored)
    }

    async fn count(&self) -> Result<usize, RagError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }

    async fn dimension(&self) -> Result<Option<usize>, RagError> {
        let raw: Option<String> =
            sqlx::query_scalar("SELECT value FROM index_meta WHERE key = 'dimension'")
                .fetch_optional(&self.pool)
                .await?;
        raw.map(|value| usize::from_str(&value).map_err(RagError::storage))
            .transpose()
    }
}
