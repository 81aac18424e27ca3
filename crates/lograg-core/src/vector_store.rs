//! Vector store traits and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::{Chunk, EmbeddingProvider, Result};

/// A single hit returned by a similarity search
///
/// Results are ordered best-first; `score` is informational.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub text: String,
    pub score: Option<f32>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl RetrievalResult {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            score: None,
            metadata: HashMap::new(),
        }
    }
}

/// Where and under which name a collection lives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionConfig {
    pub name: String,
    /// Directory for snapshots; `None` keeps the collection in memory only
    pub persist_directory: Option<PathBuf>,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            name: "log_collection".to_string(),
            persist_directory: None,
        }
    }
}

/// Trait for vector stores
///
/// This is the index handle the pipeline keeps once it has been built.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Add chunks to the collection, returning their ids
    async fn add_chunks(&self, chunks: Vec<Chunk>) -> Result<Vec<String>>;

    /// Return at most `k` results for `query`, best match first
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<RetrievalResult>>;

    /// Number of entries currently stored
    async fn count(&self) -> Result<usize>;
}

/// Opens vector stores on behalf of the pipeline
///
/// Every pipeline build asks the factory for a fresh handle, so the factory
/// decides whether that means a new in-memory index or reopening a persisted one.
#[async_trait]
pub trait VectorStoreFactory: Send + Sync {
    async fn open(
        &self,
        collection: &CollectionConfig,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Arc<dyn VectorStore>>;
}
