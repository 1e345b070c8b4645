//! Retrieval-augmented generation core.
//!
//! - `chunker` / `loader`: turn raw text and files into chunks
//! - `adapter`: embed and persist chunks, embed queries and search
//! - `pipeline`: the ingest and query flows callers use
//! - `prompt`: assemble retrieved context into a prompt

pub mod adapter;
pub mod cancel;
pub mod chunker;
pub mod loader;
pub mod pipeline;
pub mod prompt;
pub mod sqlite;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use adapter::{AdapterOptions, VectorStoreAdapter};
pub use cancel::{CancelHandle, CancelToken};
pub use pipeline::{PipelineOptions, RagPipeline, RetrievedContext};
pub use prompt::{PromptAssembler, PromptConfig};
pub use sqlite::SqliteVectorStore;
pub use store::VectorStore;
pub use types::{Chunk, Document, IngestReport, Metadata, QueryResult};
