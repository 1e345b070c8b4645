//! VectorStore trait, the persistence seam of the pipeline.
//!
//! The primary implementation is `SqliteVectorStore` in the `sqlite` module.
//! Tests may substitute their own implementation.

use async_trait::async_trait;

use super::types::{EmbeddingRecord, QueryResult};
use crate::core::errors::RagError;

/// Persistent mapping of embeddings to stored chunks.
///
/// Implementations must:
/// - write a batch atomically (all records or none) and durably before returning
/// - fix the embedding dimensionality on the first write and reject other sizes
/// - return search hits ordered by descending cosine similarity
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Stores every record, returning the store-assigned ids in input order.
    async fn insert_batch(&self, records: Vec<EmbeddingRecord>) -> Result<Vec<String>, RagError>;

    /// Returns up to `limit` records nearest to `query_embedding`, best first.
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<QueryResult>, RagError>;

    /// Number of stored records.
    async fn count(&self) -> Result<usize, RagError>;

    /// Embedding dimensionality, `None` until the first write.
    async fn dimension(&self) -> Result<Option<usize>, RagError>;
}
