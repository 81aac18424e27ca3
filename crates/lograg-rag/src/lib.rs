//! Retrieval pipeline for lograg
//!
//! This crate holds the line-overlap chunker, the prompt composer, the chat
//! backend selector and the [`RetrievalPipeline`] that ties them together with
//! a document loader, an embedder and a vector store.

mod chunker;
mod embedding;
mod loader;
mod pipeline;
mod prompt;
mod selector;
mod vector_store;


pub use chunker::TextChunker;
pub use embedding::{
    EmbeddingSettings, HashingEmbedder, HuggingFaceEmbedder, HuggingFaceEmbeddingConfig,
};
pub use loader::DirectoryLoader;
pub use pipeline::{
    DEFAULT_SYSTEM_INSTRUCTIONS, PipelineConfig, RetrievalPipeline, RetrievalPipelineBuilder,
};
pub use prompt::{PromptComposer, PromptContext};
pub use selector::{BackendSelector, SelectorConfig};
pub use vector_store::{LocalVectorStore, LocalVectorStoreFactory};

// Re-export core types for convenience
pub use lograg_core::{
    BackendFactory, ChatBackend, ChatResponse, Chunk, CollectionConfig, Document, DocumentLoader,
    EmbeddingProvider, Error, Result, RetrievalResult, VectorStore, VectorStoreFactory,
};
