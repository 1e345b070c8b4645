//! RAG pipeline: ingest flow and query flow over one vector-store adapter.
//!
//! Ingest: validate → chunk each document → embed + store (all-or-nothing).
//! Query: refuse until something was ingested → embed query → nearest chunks.
//! The two flows share nothing but the adapter.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

use super::adapter::VectorStoreAdapter;
use super::cancel::CancelToken;
use super::chunker::chunk_text;
use super::loader;
use super::prompt::{PromptAssembler, PromptConfig};
use super::types::{Chunk, Document, IngestReport, Metadata, QueryResult};
use crate::core::config::defaults::{DEFAULT_CHUNK_WORDS, DEFAULT_SEARCH_K};
use crate::core::errors::RagError;

#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    pub max_words: usize,
    pub default_k: usize,
    pub prompt: PromptConfig,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_words: DEFAULT_CHUNK_WORDS,
            default_k: DEFAULT_SEARCH_K,
            prompt: PromptConfig::default(),
        }
    }
}

/// Retrieved chunks plus the prompt they were assembled into.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedContext {
    pub query: String,
    pub results: Vec<QueryResult>,
    pub prompt: String,
}

pub struct RagPipeline {
    adapter: VectorStoreAdapter,
    options: PipelineOptions,
    initialized: AtomicBool,
    assembler: PromptAssembler,
}

impl RagPipeline {
    pub fn new(adapter: VectorStoreAdapter, options: PipelineOptions) -> Self {
        Self {
            adapter,
            options,
            initialized: AtomicBool::new(false),
            assembler: PromptAssembler::new(options.prompt),
        }
    }

    pub fn adapter(&self) -> &VectorStoreAdapter {
        &self.adapter
    }

    pub fn options(&self) -> PipelineOptions {
        self.options
    }

    /// Whether the query flow is open for this instance.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Opens the query flow over an index persisted by an earlier process.
    ///
    /// Returns `false` (and leaves the flow closed) when the index is empty.
    pub async fn resume(&self) -> Result<bool, RagError> {
        let count = self.adapter.store().count().await?;
        if count > 0 {
            self.initialized.store(true, Ordering::SeqCst);
            tracing::info!("Resumed existing vector index with {} chunks", count);
        }
        Ok(count > 0)
    }

    pub async fn process_and_store(
        &self,
        documents: Vec<String>,
        metadata: Option<Vec<Metadata>>,
    ) -> Result<IngestReport, RagError> {
        self.process_and_store_with_cancel(documents, metadata, &CancelToken::never())
            .await
    }

    /// Chunks, embeds and stores `documents`.
    ///
    /// `metadata`, when given, must align 1:1 with `documents`. Validation
    /// happens before any embedding call; a failure anywhere stores nothing.
    pub async fn process_and_store_with_cancel(
        &self,
        documents: Vec<String>,
        metadata: Option<Vec<Metadata>>,
        cancel: &CancelToken,
    ) -> Result<IngestReport, RagError> {
        if documents.is_empty() {
            return Err(RagError::NoDocuments);
        }
        let metadata = match metadata {
            Some(list) if list.len() != documents.len() => {
                return Err(RagError::MetadataLengthMismatch {
                    documents: documents.len(),
                    metadata: list.len(),
                });
            }
            Some(list) => list,
            None => vec![Metadata::new(); documents.len()],
        };

        let document_count = documents.len();
        let chunks: Vec<Chunk> = documents
            .iter()
            .zip(metadata)
            .flat_map(|(text, meta)| {
                chunk_text(text, self.options.max_words)
                    .into_iter()
                    .map(move |piece| Chunk {
                        text: piece,
                        metadata: meta.clone(),
                    })
            })
            .collect();

        tracing::info!(
            "Ingesting {} documents as {} chunks",
            document_count,
            chunks.len()
        );

        let ids = self.adapter.add_documents(chunks, cancel).await?;
        if !ids.is_empty() {
            self.initialized.store(true, Ordering::SeqCst);
        }

        Ok(IngestReport {
            documents: document_count,
            chunks: ids.len(),
        })
    }

    pub async fn process_documents(
        &self,
        documents: Vec<Document>,
    ) -> Result<IngestReport, RagError> {
        self.process_documents_with_cancel(documents, &CancelToken::never())
            .await
    }

    pub async fn process_documents_with_cancel(
        &self,
        documents: Vec<Document>,
        cancel: &CancelToken,
    ) -> Result<IngestReport, RagError> {
        let (texts, metadata): (Vec<String>, Vec<Metadata>) = documents
            .into_iter()
            .map(|doc| (doc.text, doc.metadata))
            .unzip();
        self.process_and_store_with_cancel(texts, Some(metadata), cancel)
            .await
    }

    /// Loads each file, then ingests them together as one batch.
    pub async fn ingest_files(
        &self,
        paths: Vec<PathBuf>,
        cancel: &CancelToken,
    ) -> Result<IngestReport, RagError> {
        if paths.is_empty() {
            return Err(RagError::NoDocuments);
        }
        for path in &paths {
            loader::DocumentFormat::from_path(path)?;
        }

        let documents = tokio::task::spawn_blocking(move || {
            paths
                .iter()
                .map(|path| loader::load_document(path, Metadata::new()))
                .collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(|e| RagError::Extraction(format!("loader task failed: {}", e)))??;

        self.process_documents_with_cancel(documents, cancel).await
    }

    /// Returns the `k` chunks most similar to `query`, best first.
    pub async fn similarity_search(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<QueryResult>, RagError> {
        if !self.is_initialized() {
            return Err(RagError::StoreUninitialized);
        }
        self.adapter.similarity_search(query, k).await
    }

    /// [`similarity_search`](Self::similarity_search) with the configured default `k`.
    pub async fn search(&self, query: &str) -> Result<Vec<QueryResult>, RagError> {
        self.similarity_search(query, self.options.default_k).await
    }

    pub async fn context_for(
        &self,
        query: &str,
        k: usize,
    ) -> Result<RetrievedContext, RagError> {
        let results = self.similarity_search(query, k).await?;
        let prompt = self.assembler.assemble(&results, query);
        Ok(RetrievedContext {
            query: query.to_string(),
            results,
            prompt,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::embedding::HashingEmbedder;
    use crate::rag::adapter::AdapterOptions;
    use crate::rag::cancel::CancelHandle;
    use crate::rag::sqlite::SqliteVectorStore;
    use crate::rag::test_support::{FailingEmbedder, RecordingEmbedder};
    use crate::rag::types::metadata_from;
    use crate::embedding::Embedder;

    async fn pipeline_in(
        dir: &tempfile::TempDir,
        embedder: Arc<dyn Embedder>,
        max_words: usize,
    ) -> RagPipeline {
        let store = Arc::new(SqliteVectorStore::open(dir.path()).await.unwrap());
        let adapter = VectorStoreAdapter::new(embedder, store, AdapterOptions::default());
        RagPipeline::new(
            adapter,
            PipelineOptions {
                max_words,
                ..Default::default()
            },
        )
    }

    async fn hashing_pipeline(dir: &tempfile::TempDir) -> RagPipeline {
        pipeline_in(dir, Arc::new(HashingEmbedder::new(64)), 500).await
    }

    #[tokio::test]
    async fn empty_documents_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = hashing_pipeline(&dir).await;

        let err = pipeline
            .process_and_store(Vec::new(), Some(Vec::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::NoDocuments));
    }

    #[tokio::test]
    async fn metadata_length_mismatch_is_rejected_before_embedding() {
        let dir = tempfile::tempdir().unwrap();
        let embedder = Arc::new(RecordingEmbedder::new(8));
        let pipeline = pipeline_in(&dir, embedder.clone(), 500).await;

        let err = pipeline
            .process_and_store(
                vec!["a".to_string(), "b".to_string()],
                Some(vec![metadata_from([("source", "test")])]),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RagError::MetadataLengthMismatch {
                documents: 2,
                metadata: 1
            }
        ));
        assert!(embedder.batch_sizes().is_empty());
    }

    #[tokio::test]
    async fn stored_document_is_found_with_its_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = hashing_pipeline(&dir).await;

        let report = pipeline
            .process_and_store(
                vec!["hello world".to_string()],
                Some(vec![metadata_from([("source", "test")])]),
            )
            .await
            .unwrap();
        assert_eq!(report, IngestReport { documents: 1, chunks: 1 });

        let results = pipeline.similarity_search("hello", 1).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].content, "hello world");
        assert_eq!(results[0].metadata, metadata_from([("source", json!("test"))]));
    }

    #[tokio::test]
    async fn search_before_ingest_is_a_state_error() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = hashing_pipeline(&dir).await;

        let err = pipeline.similarity_search("hello", 5).await.unwrap_err();
        assert!(matches!(err, RagError::StoreUninitialized));
        assert_eq!(err.kind(), crate::core::errors::ErrorKind::State);
    }

    #[tokio::test]
    async fn every_chunk_carries_its_documents_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_in(&dir, Arc::new(HashingEmbedder::new(64)), 2).await;

        let report = pipeline
            .process_and_store(
                vec!["alpha beta gamma".to_string(), "delta".to_string()],
                Some(vec![
                    metadata_from([("source", "gmail")]),
                    metadata_from([("source", "slack")]),
                ]),
            )
            .await
            .unwrap();
        assert_eq!(report.chunks, 3);

        let results = pipeline.similarity_search("alpha", 3).await.unwrap();
        assert_eq!(results.len(), 3);
        for hit in &results {
            let expected = if hit.content == "delta" { "slack" } else { "gmail" };
            assert_eq!(hit.metadata["source"], expected);
        }
        assert_eq!(results[0].content, "alpha beta");
    }

    #[tokio::test]
    async fn failed_ingest_is_all_or_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_in(&dir, Arc::new(FailingEmbedder::after_batches(0)), 500).await;

        let err = pipeline
            .process_and_store(vec!["doc".to_string()], None)
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::EmbeddingService(_)));
        assert!(!pipeline.is_initialized());
        assert_eq!(pipeline.adapter().store().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn cancelled_ingest_keeps_query_flow_closed() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = hashing_pipeline(&dir).await;
        let (handle, token) = CancelHandle::new();
        handle.cancel();

        let err = pipeline
            .process_and_store_with_cancel(vec!["doc".to_string()], None, &token)
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Cancelled));
        assert!(!pipeline.is_initialized());
    }

    #[tokio::test]
    async fn resume_opens_query_flow_over_persisted_index() {
        let dir = tempfile::tempdir().unwrap();
        {
            let first = hashing_pipeline(&dir).await;
            first
                .process_documents(vec![Document::new(
                    "persisted budget memo",
                    metadata_from([("source", "file")]),
                )])
                .await
                .unwrap();
        }

        let second = hashing_pipeline(&dir).await;
        assert!(matches!(
            second.similarity_search("budget", 1).await,
            Err(RagError::StoreUninitialized)
        ));
        assert!(second.resume().await.unwrap());
        let hits = second.search("budget").await.unwrap();
        assert_eq!(hits[0].content, "persisted budget memo");
    }

    #[tokio::test]
    async fn ingest_files_loads_then_stores() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = hashing_pipeline(&dir).await;
        let file = dir.path().join("notice.txt");
        std::fs::write(&file, "Office closed Friday").unwrap();

        let report = pipeline
            .ingest_files(vec![file.clone()], &CancelToken::never())
            .await
            .unwrap();
        assert_eq!(report.chunks, 1);

        let hits = pipeline.similarity_search("office", 1).await.unwrap();
        assert_eq!(hits[0].metadata["file_name"], "notice.txt");
    }

    #[tokio::test]
    async fn ingest_files_rejects_unsupported_format_up_front() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = hashing_pipeline(&dir).await;
        let good = dir.path().join("ok.txt");
        std::fs::write(&good, "fine").unwrap();

        let err = pipeline
            .ingest_files(
                vec![good, dir.path().join("sheet.csv")],
                &CancelToken::never(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::UnsupportedFormat(_)));
        assert_eq!(pipeline.adapter().store().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn context_for_assembles_prompt_from_hits() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = hashing_pipeline(&dir).await;
        pipeline
            .process_and_store(vec!["the deadline is friday".to_string()], None)
            .await
            .unwrap();

        let context = pipeline.context_for("when is the deadline", 1).await.unwrap();
        assert_eq!(context.results.len(), 1);
        assert!(context.prompt.contains("the deadline is friday"));
        assert!(context.prompt.contains("Query: when is the deadline"));
    }

    #[tokio::test]
    async fn context_budget_comes_from_options() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteVectorStore::open(dir.path()).await.unwrap());
        let adapter = VectorStoreAdapter::new(
            Arc::new(HashingEmbedder::new(64)),
            store,
            AdapterOptions::default(),
        );
        let pipeline = RagPipeline::new(
            adapter,
            PipelineOptions {
                prompt: PromptConfig {
                    max_context_length: 80,
                    include_citations: false,
                },
                ..Default::default()
            },
        );
        pipeline
            .process_and_store(
                vec![
                    "the deadline is friday".to_string(),
                    "the deadline moved to monday".to_string(),
                ],
                None,
            )
            .await
            .unwrap();

        let context = pipeline.context_for("deadline", 2).await.unwrap();
        assert_eq!(context.results.len(), 2);
        assert!(context.prompt.contains(&context.results[0].content));
        assert!(!context.prompt.contains(&context.results[1].content));
        assert!(!context.prompt.contains("Source:"));
    }
}
