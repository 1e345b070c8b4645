//! Embedding + vector-store adapter.
//!
//! Owns the only write path into the index. Embedding calls are bounded by a
//! timeout and batched; the cancel token is checked before each batch. Records
//! are written in one transaction after every chunk has been embedded, so a
//! failed or cancelled ingest leaves the index untouched.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use super::cancel::CancelToken;
use super::store::VectorStore;
use super::types::{Chunk, EmbeddingRecord, QueryResult};
use crate::core::config::defaults::{DEFAULT_EMBEDDING_BATCH_SIZE, DEFAULT_EMBEDDING_TIMEOUT_SECS};
use crate::core::errors::RagError;
use crate::embedding::Embedder;

#[derive(Debug, Clone, Copy)]
pub struct AdapterOptions {
    pub batch_size: usize,
    pub timeout: Duration,
}

impl Default for AdapterOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_EMBEDDING_BATCH_SIZE,
            timeout: Duration::from_secs(DEFAULT_EMBEDDING_TIMEOUT_SECS),
        }
    }
}

pub struct VectorStoreAdapter {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    write_lock: Mutex<()>,
    options: AdapterOptions,
}

impl VectorStoreAdapter {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        options: AdapterOptions,
    ) -> Self {
        Self {
            embedder,
            store,
            write_lock: Mutex::new(()),
            options,
        }
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    pub fn embedder_name(&self) -> &str {
        self.embedder.name()
    }

    async fn embed_with_timeout(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let vectors = tokio::time::timeout(self.options.timeout, self.embedder.embed(inputs))
            .await
            .map_err(|_| RagError::Timeout(self.options.timeout.as_secs()))??;

        if vectors.len() != inputs.len() {
            return Err(RagError::EmbeddingService(format!(
                "{} returned {} vectors for {} inputs",
                self.embedder.name(),
                vectors.len(),
                inputs.len()
            )));
        }
        Ok(vectors)
    }

    /// Embeds and stores `chunks`, returning once the write is durable.
    ///
    /// Errors from the embedder are not retried.
    pub async fn add_documents(
        &self,
        chunks: Vec<Chunk>,
        cancel: &CancelToken,
    ) -> Result<Vec<String>, RagError> {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let batch_size = self.options.batch_size.max(1);
        let mut records = Vec::with_capacity(chunks.len());
        let mut pending = chunks.into_iter().peekable();

        while pending.peek().is_some() {
            if cancel.is_cancelled() {
                tracing::warn!(
                    "Ingestion cancelled after embedding {} chunks; nothing was stored",
                    records.len()
                );
                return Err(RagError::Cancelled);
            }

            let batch: Vec<Chunk> = pending.by_ref().take(batch_size).collect();
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = self.embed_with_timeout(&texts).await?;
            tracing::debug!("Embedded batch of {} chunks", batch.len());

            records.extend(
                batch
                    .into_iter()
                    .zip(vectors)
                    .map(|(chunk, embedding)| EmbeddingRecord { chunk, embedding }),
            );
        }

        if cancel.is_cancelled() {
            return Err(RagError::Cancelled);
        }

        let _guard = self.write_lock.lock().await;
        let ids = self.store.insert_batch(records).await?;
        tracing::info!("Stored {} chunks in the vector index", ids.len());
        Ok(ids)
    }

    /// Embeds `query` and returns the `k` nearest chunks, best first.
    pub async fn similarity_search(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<QueryResult>, RagError> {
        if k == 0 {
            return Err(RagError::InvalidArgument("k must be at least 1".to_string()));
        }
        if self.store.dimension().await?.is_none() {
            return Err(RagError::StoreUninitialized);
        }

        let mut vectors = self.embed_with_timeout(&[query.to_string()]).await?;
        let query_vector = vectors.pop().unwrap_or_default();
        let results = self.store.search(&query_vector, k).await?;
        tracing::debug!("Similarity search returned {} hits (k={})", results.len(), k);
        Ok(results)
    }
}
