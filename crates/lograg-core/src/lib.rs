//! Core traits and types for lograg
//!
//! This crate defines the collaborator interfaces the retrieval pipeline talks to:
//! document loaders, embedding providers, vector stores and chat backends. Concrete
//! implementations live in `lograg-rag` and `lograg-chat`, which keeps the pipeline
//! test-friendly and the backends swappable.

pub mod document;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod vector_store;

#[cfg(test)]
mod tests;

pub use document::{Chunk, Document, DocumentLoader};
pub use embedding::EmbeddingProvider;
pub use error::{Error, Result};
pub use llm::{BackendFactory, ChatBackend, ChatResponse};
pub use vector_store::{CollectionConfig, RetrievalResult, VectorStore, VectorStoreFactory};
