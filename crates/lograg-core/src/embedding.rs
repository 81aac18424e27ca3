//! Embedding provider trait

use async_trait::async_trait;

use crate::Result;

/// Trait for embedding providers
///
/// The pipeline never computes embeddings itself. It hands a provider to the
/// vector store factory, and the store embeds chunks and queries through it.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of texts, preserving order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Dimensionality of the produced vectors
    fn dimensions(&self) -> usize;

    /// Provider name used in logs and errors
    fn name(&self) -> &str;
}
