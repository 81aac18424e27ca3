//! Retrieval pipeline orchestrator.
//!
//! The [`RetrievalPipeline`] runs load → chunk → embed → index when it is
//! built, and query → prompt → generate when it is asked a question.
//!
//! It has two states: *unbuilt* (no index handle) and *built*. [`build`]
//! always constructs a fresh index and replaces the handle. [`retrieve`]
//! builds lazily the first time it finds no handle and reuses the handle from
//! then on. The handle sits behind an async mutex that is held for the whole
//! build, so concurrent callers sharing one pipeline trigger a single lazy
//! build.
//!
//! [`build`]: RetrievalPipeline::build
//! [`retrieve`]: RetrievalPipeline::retrieve
//!
//! # Example
//!
//! ```rust,ignore
//! let pipeline = RetrievalPipeline::builder()
//!     .config(PipelineConfig::from_env())
//!     .selector(selector)
//!     .build()?;
//!
//! let (results, context) = pipeline.retrieve("why did the job fail?", 3).await?;
//! let answer = pipeline
//!     .generate_response(context, "why did the job fail?", DEFAULT_SYSTEM_INSTRUCTIONS)
//!     .await?;
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info};

use lograg_core::{
    ChatResponse, Chunk, CollectionConfig, DocumentLoader, EmbeddingProvider, Error, Result,
    RetrievalResult, VectorStore, VectorStoreFactory,
};

use crate::chunker::TextChunker;
use crate::embedding::HashingEmbedder;
use crate::loader::DirectoryLoader;
use crate::prompt::{PromptComposer, PromptContext};
use crate::selector::BackendSelector;
use crate::vector_store::LocalVectorStoreFactory;

/// System instructions used when answering queries
pub const DEFAULT_SYSTEM_INSTRUCTIONS: &str = "You are a concise helpful assistant.";

/// Construction-time settings of a pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Snapshot directory handed to the vector store; `None` keeps it in memory
    pub persist_directory: Option<PathBuf>,
    pub collection_name: String,
    /// Directory the loader reads documents from
    pub loader_path: PathBuf,
    pub lines_per_chunk: usize,
    pub overlap: usize,
    /// Chat backend override; takes precedence over `CHAT_MODEL`
    pub model_backend: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            persist_directory: None,
            collection_name: "log_collection".to_string(),
            loader_path: PathBuf::from("example_logs"),
            lines_per_chunk: 2,
            overlap: 1,
            model_backend: None,
        }
    }
}

impl PipelineConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let parse = |name: &str, fallback: usize| {
            env::var(name)
                .ok()
                .and_then(|value| value.parse::<usize>().ok())
                .unwrap_or(fallback)
        };

        Self {
            persist_directory: env::var("LOGRAG_PERSIST_DIR")
                .ok()
                .filter(|dir| !dir.is_empty())
                .map(PathBuf::from),
            collection_name: env::var("LOGRAG_COLLECTION").unwrap_or(defaults.collection_name),
            loader_path: env::var("LOGRAG_DOCS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.loader_path),
            lines_per_chunk: parse("LOGRAG_LINES_PER_CHUNK", defaults.lines_per_chunk),
            overlap: parse("LOGRAG_OVERLAP", defaults.overlap),
            model_backend: None,
        }
    }

    fn collection(&self) -> CollectionConfig {
        CollectionConfig {
            name: self.collection_name.clone(),
            persist_directory: self.persist_directory.clone(),
        }
    }
}

/// The retrieval pipeline orchestrator.
///
/// Construct one via [`RetrievalPipeline::builder()`].
pub struct RetrievalPipeline {
    config: PipelineConfig,
    chunker: TextChunker,
    loader: Arc<dyn DocumentLoader>,
    embedder: Arc<dyn EmbeddingProvider>,
    store_factory: Arc<dyn VectorStoreFactory>,
    selector: BackendSelector,
    index: Mutex<Option<Arc<dyn VectorStore>>>,
}

impl RetrievalPipeline {
    /// Create a new [`RetrievalPipelineBuilder`].
    pub fn builder() -> RetrievalPipelineBuilder {
        RetrievalPipelineBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn selector(&self) -> &BackendSelector {
        &self.selector
    }

    /// Whether an index handle is currently held
    pub async fn is_built(&self) -> bool {
        self.index.lock().await.is_some()
    }

    /// Load, chunk, embed and index the corpus, replacing any existing index.
    ///
    /// # Errors
    ///
    /// Propagates loader, embedding and vector store failures. The previous
    /// index handle, if any, is kept when the build fails.
    pub async fn build(&self) -> Result<Arc<dyn VectorStore>> {
        let mut index = self.index.lock().await;
        let store = self.build_index().await?;
        *index = Some(store.clone());
        Ok(store)
    }

    async fn build_index(&self) -> Result<Arc<dyn VectorStore>> {
        let documents = self
            .loader
            .load(&self.config.loader_path)
            .await
            .inspect_err(|e| {
                error!(
                    path = %self.config.loader_path.display(),
                    error = %e,
                    "document loading failed"
                )
            })?;

        let chunks: Vec<Chunk> = documents
            .iter()
            .flat_map(|document| self.chunker.chunk_document(document))
            .collect();
        let chunk_count = chunks.len();

        let store = self
            .store_factory
            .open(&self.config.collection(), self.embedder.clone())
            .await?;
        store
            .add_chunks(chunks)
            .await
            .inspect_err(|e| error!(error = %e, "indexing chunks failed"))?;

        info!(
            collection = %self.config.collection_name,
            documents = documents.len(),
            chunks = chunk_count,
            embedder = self.embedder.name(),
            "built retrieval index"
        );
        Ok(store)
    }

    /// Return the top `k` matches for `query` and their texts, in rank order.
    ///
    /// Builds the index first if the pipeline has never been built.
    pub async fn retrieve(
        &self,
        query: &str,
        k: usize,
    ) -> Result<(Vec<RetrievalResult>, Vec<String>)> {
        let store = {
            let mut index = self.index.lock().await;
            match index.as_ref() {
                Some(store) => store.clone(),
                None => {
                    info!("index not built yet, building on first retrieval");
                    let store = self.build_index().await?;
                    *index = Some(store.clone());
                    store
                }
            }
        };

        let results = store.similarity_search(query, k).await?;
        let context = results.iter().map(|result| result.text.clone()).collect();
        Ok((results, context))
    }

    /// Compose a prompt from `context` and `query` and send it to the chat backend.
    ///
    /// The backend is resolved on every call: the pipeline's `model_backend`
    /// first, then the environment, then the default.
    pub async fn generate_response(
        &self,
        context: impl Into<PromptContext>,
        query: &str,
        system_instructions: &str,
    ) -> Result<ChatResponse> {
        let prompt = PromptComposer::new(system_instructions).format(context, query);
        let chat = self.selector.load(self.config.model_backend.as_deref())?;

        chat.invoke(&prompt)
            .await
            .inspect_err(|e| error!(backend = chat.name(), error = %e, "chat invocation failed"))
    }
}

/// Builder for a validated [`RetrievalPipeline`]
///
/// Only the backend selector is required; the loader, embedder and store
/// factory default to [`DirectoryLoader`], [`HashingEmbedder`] and
/// [`LocalVectorStoreFactory`].
#[derive(Default)]
pub struct RetrievalPipelineBuilder {
    config: PipelineConfig,
    loader: Option<Arc<dyn DocumentLoader>>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    store_factory: Option<Arc<dyn VectorStoreFactory>>,
    selector: Option<BackendSelector>,
}

impl RetrievalPipelineBuilder {
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn loader(mut self, loader: Arc<dyn DocumentLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn store_factory(mut self, store_factory: Arc<dyn VectorStoreFactory>) -> Self {
        self.store_factory = Some(store_factory);
        self
    }

    pub fn selector(mut self, selector: BackendSelector) -> Self {
        self.selector = Some(selector);
        self
    }

    /// Build the pipeline in its unbuilt state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `lines_per_chunk` is zero or no
    /// backend selector was supplied.
    pub fn build(self) -> Result<RetrievalPipeline> {
        let chunker = TextChunker::new(self.config.lines_per_chunk, self.config.overlap)?;
        let selector = self.selector.ok_or_else(|| {
            Error::Configuration("a chat backend selector is required".to_string())
        })?;

        Ok(RetrievalPipeline {
            config: self.config,
            chunker,
            loader: self.loader.unwrap_or_else(|| Arc::new(DirectoryLoader::new())),
            embedder: self
                .embedder
                .unwrap_or_else(|| Arc::new(HashingEmbedder::default())),
            store_factory: self
                .store_factory
                .unwrap_or_else(|| Arc::new(LocalVectorStoreFactory)),
            selector,
            index: Mutex::new(None),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::SelectorConfig;
    use async_trait::async_trait;
    use lograg_core::{BackendFactory, ChatBackend, Document};
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingLoader {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DocumentLoader for CountingLoader {
        async fn load(&self, _source: &Path) -> Result<Vec<Document>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![Document::new("boot ok\ndisk full\nretrying\ndisk freed")
                .with_metadata("source", "syslog.log")])
        }
    }

    struct FailingLoader;

    #[async_trait]
    impl DocumentLoader for FailingLoader {
        async fn load(&self, source: &Path) -> Result<Vec<Document>> {
            Err(Error::DocumentLoader(format!("{} is gone", source.display())))
        }
    }

    struct EchoBackend;

    #[async_trait]
    impl ChatBackend for EchoBackend {
        async fn invoke(&self, prompt: &str) -> Result<ChatResponse> {
            Ok(ChatResponse::new(prompt, "echo"))
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    fn echo_selector() -> BackendSelector {
        let factory: BackendFactory =
            Arc::new(|| -> Result<Box<dyn ChatBackend>> { Ok(Box::new(EchoBackend)) });
        BackendSelector::new(SelectorConfig::new("echo"), factory)
    }

    fn pipeline_with(loader: Arc<dyn DocumentLoader>) -> RetrievalPipeline {
        RetrievalPipeline::builder()
            .loader(loader)
            .selector(echo_selector())
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_validates_config() {
        let err = RetrievalPipeline::builder()
            .config(PipelineConfig {
                lines_per_chunk: 0,
                ..PipelineConfig::default()
            })
            .selector(echo_selector())
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, Error::Configuration(_)));

        let err = RetrievalPipeline::builder().build().err().unwrap();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[tokio::test]
    async fn test_retrieve_builds_lazily_once() {
        let loader = Arc::new(CountingLoader::default());
        let pipeline = pipeline_with(loader.clone());
        assert!(!pipeline.is_built().await);

        let (results, context) = pipeline.retrieve("disk", 2).await.unwrap();
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
        assert!(pipeline.is_built().await);
        assert_eq!(results.len(), 2);
        assert_eq!(
            context,
            results.iter().map(|r| r.text.clone()).collect::<Vec<_>>()
        );

        pipeline.retrieve("boot", 1).await.unwrap();
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_explicit_build_always_rebuilds() {
        let loader = Arc::new(CountingLoader::default());
        let pipeline = pipeline_with(loader.clone());

        let store = pipeline.build().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 3);
        pipeline.build().await.unwrap();
        assert_eq!(loader.calls.load(Ordering::SeqCst), 2);

        pipeline.retrieve("disk", 1).await.unwrap();
        assert_eq!(loader.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_retrieves_build_once() {
        let loader = Arc::new(CountingLoader::default());
        let pipeline = Arc::new(pipeline_with(loader.clone()));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let pipeline = pipeline.clone();
                tokio::spawn(async move {
                    pipeline
                        .retrieve("disk", 1)
                        .await
                        .map(|(results, _)| results.len())
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 1);
        }
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_build_failure_propagates_and_stays_unbuilt() {
        let pipeline = pipeline_with(Arc::new(FailingLoader));

        assert!(matches!(pipeline.build().await, Err(Error::DocumentLoader(_))));
        assert!(!pipeline.is_built().await);
        assert!(pipeline.retrieve("anything", 3).await.is_err());
    }

    #[tokio::test]
    async fn test_generate_response_uses_composed_prompt() {
        let pipeline = pipeline_with(Arc::new(CountingLoader::default()));

        let response = pipeline
            .generate_response(
                vec!["disk full".to_string()],
                "what broke?",
                DEFAULT_SYSTEM_INSTRUCTIONS,
            )
            .await
            .unwrap();
        assert_eq!(
            response.content,
            "SYSTEM: You are a concise helpful assistant.\n\n\
             CONTEXT:\ndisk full\n\n\
             USER QUERY:\nwhat broke?"
        );
        assert!(!pipeline.is_built().await);
    }
}
