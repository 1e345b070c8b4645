//! Retrieval-augmented assistant over mail, chat and document sources.
//!
//! Ingested text is chunked, embedded and persisted in a local vector index;
//! queries retrieve the nearest chunks and assemble a prompt. A background
//! scheduler keeps the index fed from configured sources.

pub mod core;
pub mod embedding;
pub mod flags;
pub mod jobs;
pub mod rag;
pub mod scheduler;
pub mod server;
pub mod sources;
pub mod state;
