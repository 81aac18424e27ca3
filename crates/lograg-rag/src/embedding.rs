//! Embedding providers
//!
//! - [`HashingEmbedder`]: local feature-hashed bag of words, no model or network
//! - [`HuggingFaceEmbedder`]: sentence-transformer embeddings from the Hugging Face
//!   inference API

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::sync::Arc;
use std::time::Duration;

use lograg_core::{EmbeddingProvider, Error, Result};

/// Deterministic local embedder
///
/// Each lower-cased alphanumeric token is hashed into one of `dimensions`
/// buckets with a hash-derived sign, and the vector is L2-normalised. Token
/// hashes come from md5, so vectors are stable across builds and platforms.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub const NAME: &'static str = "local";
    pub const DEFAULT_DIMENSIONS: usize = 384;

    pub fn new(dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(Error::Configuration(
                "embedding dimensions must be greater than zero".to_string(),
            ));
        }
        Ok(Self { dimensions })
    }

    fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
            .map(str::to_lowercase)
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        for token in Self::tokens(text) {
            let digest = md5::compute(token.as_bytes());
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&digest.0[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimensions as u64) as usize;
            let sign = if digest.0[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self {
            dimensions: Self::DEFAULT_DIMENSIONS,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_text(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        Self::NAME
    }
}

/// Configuration for the Hugging Face embedding endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HuggingFaceEmbeddingConfig {
    pub api_token: Option<String>,
    pub api_url: String,
    pub model_id: String,
    pub dimensions: usize,
    pub timeout_secs: u64,
}

impl HuggingFaceEmbeddingConfig {
    pub const DEFAULT_API_URL: &'static str = "https://router.huggingface.co/hf-inference";
    pub const DEFAULT_MODEL: &'static str = "sentence-transformers/all-mpnet-base-v2";

    pub fn new(api_token: Option<String>) -> Self {
        Self {
            api_token,
            api_url: Self::DEFAULT_API_URL.to_string(),
            model_id: Self::DEFAULT_MODEL.to_string(),
            dimensions: 768,
            timeout_secs: 60,
        }
    }
}

#[derive(Serialize)]
struct FeatureExtractionRequest<'a> {
    inputs: &'a [String],
}

/// Embeddings from the Hugging Face feature-extraction pipeline
pub struct HuggingFaceEmbedder {
    config: HuggingFaceEmbeddingConfig,
    client: Client,
}

impl HuggingFaceEmbedder {
    pub const NAME: &'static str = "huggingface";

    pub fn new(config: HuggingFaceEmbeddingConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self { config, client })
    }
}

#[async_trait]
impl EmbeddingProvider for HuggingFaceEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .pop()
            .ok_or_else(|| Error::embedding(Self::NAME, "no embedding returned"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!(
            "{}/models/{}/pipeline/feature-extraction",
            self.config.api_url.trim_end_matches('/'),
            self.config.model_id
        );

        let mut request = self
            .client
            .post(&url)
            .json(&FeatureExtractionRequest { inputs: texts });
        if let Some(token) = &self.config.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::embedding(
                Self::NAME,
                format!("request failed with status {}: {}", status, error_text),
            ));
        }

        let embeddings: Vec<Vec<f32>> = response
            .json()
            .await
            .map_err(|e| Error::Serialization(e.to_string()))?;

        if embeddings.len() != texts.len() {
            return Err(Error::embedding(
                Self::NAME,
                format!("expected {} embeddings, got {}", texts.len(), embeddings.len()),
            ));
        }
        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    fn name(&self) -> &str {
        Self::NAME
    }
}

/// Which embedder the pipeline should use, read once at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    /// `local` or `huggingface`
    pub backend: String,
    pub local_dimensions: usize,
    pub huggingface: HuggingFaceEmbeddingConfig,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            backend: HashingEmbedder::NAME.to_string(),
            local_dimensions: HashingEmbedder::DEFAULT_DIMENSIONS,
            huggingface: HuggingFaceEmbeddingConfig::new(None),
        }
    }
}

impl EmbeddingSettings {
    /// Create settings from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut settings = Self::default();
        if let Ok(backend) = env::var("EMBEDDING_BACKEND") {
            settings.backend = backend.to_lowercase();
        }
        if let Some(dimensions) = env::var("EMBEDDING_DIMENSIONS")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
        {
            settings.local_dimensions = dimensions;
        }
        settings.huggingface.api_token = env::var("HUGGINGFACEHUB_API_TOKEN")
            .or_else(|_| env::var("HF_TOKEN"))
            .ok()
            .filter(|token| !token.is_empty());
        if let Ok(model) = env::var("HF_EMBEDDING_MODEL") {
            settings.huggingface.model_id = model;
        }
        settings
    }

    /// Build the configured embedding provider
    pub fn build(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        match self.backend.as_str() {
            HashingEmbedder::NAME => Ok(Arc::new(HashingEmbedder::new(self.local_dimensions)?)),
            HuggingFaceEmbedder::NAME => {
                Ok(Arc::new(HuggingFaceEmbedder::new(self.huggingface.clone())?))
            }
            other => Err(Error::Configuration(format!(
                "unknown embedding backend '{}' (expected 'local' or 'huggingface')",
                other
            ))),
        }
    }
}
