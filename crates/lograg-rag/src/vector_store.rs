//! Local vector store implementation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

use lograg_core::{
    Chunk, CollectionConfig, EmbeddingProvider, Error, Result, RetrievalResult, VectorStore,
    VectorStoreFactory,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    id: String,
    text: String,
    metadata: HashMap<String, String>,
    embedding: Vec<f32>,
}

#[derive(Default)]
struct Entries {
    items: Vec<StoredEntry>,
    positions: HashMap<String, usize>,
}

impl Entries {
    fn from_items(items: Vec<StoredEntry>) -> Self {
        let mut entries = Entries::default();
        for item in items {
            entries.upsert(item);
        }
        entries
    }

    fn upsert(&mut self, entry: StoredEntry) {
        match self.positions.get(&entry.id) {
            Some(&position) => self.items[position] = entry,
            None => {
                self.positions.insert(entry.id.clone(), self.items.len());
                self.items.push(entry);
            }
        }
    }
}

/// In-memory vector store with cosine similarity search
///
/// Entries are upserted by chunk id. When the collection has a persist
/// directory, the store reloads `<dir>/<collection>.json` on open and rewrites
/// it after every add.
pub struct LocalVectorStore {
    collection: CollectionConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    entries: RwLock<Entries>,
}

impl LocalVectorStore {
    /// Create an empty, memory-only store
    pub fn new(collection: CollectionConfig, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            collection,
            embedder,
            entries: RwLock::new(Entries::default()),
        }
    }

    /// Open a store, loading the persisted snapshot if there is one
    pub async fn open(
        collection: CollectionConfig,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        let store = Self::new(collection, embedder);

        if let Some(path) = store.snapshot_path() {
            if tokio::fs::try_exists(&path).await? {
                let raw = tokio::fs::read_to_string(&path).await?;
                let items: Vec<StoredEntry> = serde_json::from_str(&raw)?;

                let expected = store.embedder.dimensions();
                if let Some(entry) = items.iter().find(|e| e.embedding.len() != expected) {
                    return Err(Error::VectorStore(format!(
                        "snapshot {} holds {}-dimensional vectors but the embedder produces {}",
                        path.display(),
                        entry.embedding.len(),
                        expected
                    )));
                }

                info!(path = %path.display(), entries = items.len(), "loaded collection snapshot");
                *store.write_entries()? = Entries::from_items(items);
            }
        }

        Ok(store)
    }

    pub fn collection(&self) -> &CollectionConfig {
        &self.collection
    }

    fn snapshot_path(&self) -> Option<PathBuf> {
        self.collection
            .persist_directory
            .as_ref()
            .map(|dir| dir.join(format!("{}.json", self.collection.name)))
    }

    fn read_entries(&self) -> Result<std::sync::RwLockReadGuard<'_, Entries>> {
        self.entries
            .read()
            .map_err(|e| Error::VectorStore(format!("Lock error: {}", e)))
    }

    fn write_entries(&self) -> Result<std::sync::RwLockWriteGuard<'_, Entries>> {
        self.entries
            .write()
            .map_err(|e| Error::VectorStore(format!("Lock error: {}", e)))
    }

    async fn persist(&self) -> Result<()> {
        let Some(path) = self.snapshot_path() else {
            return Ok(());
        };

        let snapshot = serde_json::to_string(&self.read_entries()?.items)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, snapshot).await?;
        debug!(path = %path.display(), "wrote collection snapshot");
        Ok(())
    }

    /// Cosine similarity of two equal-length vectors
    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return 0.0;
        }

        let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot_product / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorStore for LocalVectorStore {
    async fn add_chunks(&self, chunks: Vec<Chunk>) -> Result<Vec<String>> {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(Error::VectorStore(format!(
                "embedder returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let mut ids = Vec::with_capacity(chunks.len());
        {
            let mut entries = self.write_entries()?;
            for (chunk, embedding) in chunks.into_iter().zip(embeddings) {
                ids.push(chunk.id.clone());
                entries.upsert(StoredEntry {
                    id: chunk.id,
                    text: chunk.text,
                    metadata: chunk.metadata,
                    embedding,
                });
            }
        }

        self.persist().await?;
        Ok(ids)
    }

    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<RetrievalResult>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await?;
        let entries = self.read_entries()?;

        let mut scored: Vec<(f32, &StoredEntry)> = entries
            .items
            .iter()
            .map(|entry| (Self::cosine_similarity(&query_embedding, &entry.embedding), entry))
            .collect();

        // Stable sort keeps insertion order among equal scores
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(score, entry)| RetrievalResult {
                text: entry.text.clone(),
                score: Some(score),
                metadata: entry.metadata.clone(),
            })
            .collect())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.read_entries()?.items.len())
    }
}

/// Opens [`LocalVectorStore`]s for the pipeline
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalVectorStoreFactory;

#[async_trait]
impl VectorStoreFactory for LocalVectorStoreFactory {
    async fn open(
        &self,
        collection: &CollectionConfig,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Arc<dyn VectorStore>> {
        let store = LocalVectorStore::open(collection.clone(), embedder).await?;
        Ok(Arc::new(store))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashingEmbedder;
    use tempfile::TempDir;

    fn embedder() -> Arc<dyn EmbeddingProvider> {
        Arc::new(HashingEmbedder::default())
    }

    fn chunk(id: &str, text: &str) -> Chunk {
        Chunk {
            id: id.to_string(),
            text: text.to_string(),
            metadata: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_local_vector_store() {
        let store = LocalVectorStore::new(CollectionConfig::default(), embedder());

        let ids = store
            .add_chunks(vec![chunk("c1", "kernel panic on boot")])
            .await
            .unwrap();
        assert_eq!(ids, vec!["c1"]);
        assert_eq!(store.count().await.unwrap(), 1);

        store
            .add_chunks(vec![chunk("c1", "kernel panic on reboot")])
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_search() {
        let store = LocalVectorStore::new(CollectionConfig::default(), embedder());
        store
            .add_chunks(vec![
                chunk("a", "user alice logged in"),
                chunk("b", "disk quota exceeded on volume data"),
                chunk("c", "cron job finished"),
            ])
            .await
            .unwrap();

        let results = store.similarity_search("disk quota", 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].text, "disk quota exceeded on volume data");
        assert!(results[0].score.unwrap() >= results[1].score.unwrap());

        assert!(store.similarity_search("disk", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_round_trip() {
        let dir = TempDir::new().unwrap();
        let collection = CollectionConfig {
            name: "logs".to_string(),
            persist_directory: Some(dir.path().join("db")),
        };

        let store = LocalVectorStoreFactory
            .open(&collection, embedder())
            .await
            .unwrap();
        store
            .add_chunks(vec![chunk("x", "service restarted"), chunk("y", "out of memory")])
            .await
            .unwrap();
        assert!(dir.path().join("db").join("logs.json").exists());

        let reopened = LocalVectorStoreFactory
            .open(&collection, embedder())
            .await
            .unwrap();
        assert_eq!(reopened.count().await.unwrap(), 2);

        let small = Arc::new(HashingEmbedder::new(16).unwrap());
        let mismatched = LocalVectorStore::open(collection, small).await;
        assert!(mismatched.is_err());
    }
}
