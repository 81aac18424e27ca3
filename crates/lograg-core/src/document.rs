//! Documents, chunks and the loader trait

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::Result;

/// A loaded source document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Document {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The `source` metadata entry, if the loader recorded one
    pub fn source(&self) -> Option<&str> {
        self.metadata.get("source").map(String::as_str)
    }
}

/// A contiguous slice of a document's lines, ready to be embedded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Trait for document loaders
///
/// A loader turns a source path into an ordered list of documents. The pipeline
/// only relies on `Document::content`; metadata is carried along into chunks.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    /// Load every document found at `source`
    async fn load(&self, source: &Path) -> Result<Vec<Document>>;
}
