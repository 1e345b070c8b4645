//! Fakes shared by the pipeline, adapter and scheduler tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use super::store::VectorStore;
use super::types::{metadata_from, Chunk, EmbeddingRecord, QueryResult};
use crate::core::errors::RagError;
use crate::embedding::{Embedder, HashingEmbedder};

pub fn chunk(text: &str, source: &str) -> Chunk {
    Chunk {
        text: text.to_string(),
        metadata: metadata_from([("source", source)]),
    }
}

/// Hashing embedder that remembers the size of every batch it served.
pub struct RecordingEmbedder {
    inner: HashingEmbedder,
    batches: Mutex<Vec<usize>>,
}

impl RecordingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            inner: HashingEmbedder::new(dimensions),
            batches: Mutex::new(Vec::new()),
        }
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl Embedder for RecordingEmbedder {
    fn name(&self) -> &str {
        "recording"
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        self.batches.lock().unwrap().push(inputs.len());
        self.inner.embed(inputs).await
    }
}

/// Succeeds for the first `ok_batches` calls, then reports a quota error.
pub struct FailingEmbedder {
    ok_batches: usize,
    calls: AtomicUsize,
    inner: HashingEmbedder,
}

impl FailingEmbedder {
    pub fn after_batches(ok_batches: usize) -> Self {
        Self {
            ok_batches,
            calls: AtomicUsize::new(0),
            inner: HashingEmbedder::new(8),
        }
    }
}

#[async_trait]
impl Embedder for FailingEmbedder {
    fn name(&self) -> &str {
        "failing"
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call >= self.ok_batches {
            return Err(RagError::EmbeddingService("429 quota exceeded".to_string()));
        }
        self.inner.embed(inputs).await
    }
}

pub struct SlowEmbedder {
    delay: Duration,
}

impl SlowEmbedder {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl Embedder for SlowEmbedder {
    fn name(&self) -> &str {
        "slow"
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        tokio::time::sleep(self.delay).await;
        Ok(inputs.iter().map(|_| vec![1.0]).collect())
    }
}

/// Non-persistent store for tests that run on paused tokio time.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<EmbeddingRecord>>,
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn insert_batch(&self, records: Vec<EmbeddingRecord>) -> Result<Vec<String>, RagError> {
        let mut stored = self.records.lock().unwrap();
        let start = stored.len();
        let ids = (start..start + records.len()).map(|i| i.to_string()).collect();
        stored.extend(records);
        Ok(ids)
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<QueryResult>, RagError> {
        let stored = self.records.lock().unwrap();
        let mut hits: Vec<QueryResult> = stored
            .iter()
            .map(|record| QueryResult {
                content: record.chunk.text.clone(),
                metadata: record.chunk.metadata.clone(),
                score: record
                    .embedding
                    .iter()
                    .zip(query_embedding)
                    .map(|(a, b)| a * b)
                    .sum(),
            })
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn count(&self) -> Result<usize, RagError> {
        Ok(self.records.lock().unwrap().len())
    }

    async fn dimension(&self) -> Result<Option<usize>, RagError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .first()
            .map(|record| record.embedding.len()))
    }
}

/// Memory store whose writes can be held open to observe concurrent reads.
#[derive(Default)]
pub struct GatedStore {
    inner: MemoryStore,
    closed: AtomicBool,
    entered: Notify,
    release: Notify,
}

impl GatedStore {
    /// Subsequent writes block inside `insert_batch` until [`GatedStore::open`].
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn open(&self) {
        self.closed.store(false, Ordering::SeqCst);
        self.release.notify_one();
    }

    /// Resolves once a writer is parked at the gate.
    pub async fn writer_parked(&self) {
        self.entered.notified().await;
    }
}

#[async_trait]
impl VectorStore for GatedStore {
    async fn insert_batch(&self, records: Vec<EmbeddingRecord>) -> Result<Vec<String>, RagError> {
        if self.closed.load(Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.inner.insert_batch(records).await
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<QueryResult>, RagError> {
        self.inner.search(query_embedding, limit).await
    }

    async fn count(&self) -> Result<usize, RagError> {
        self.inner.count().await
    }

    async fn dimension(&self) -> Result<Option<usize>, RagError> {
        self.inner.dimension().await
    }
}
