//! Chat backend trait and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::Result;

/// Textual answer from a chat backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: String,
    pub model_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u32>,
}

impl ChatResponse {
    pub fn new(content: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model_name: model_name.into(),
            finish_reason: None,
            total_tokens: None,
        }
    }
}

/// Trait for chat backends (e.g., Hugging Face, Gemini)
///
/// Backends are named and swappable; the selector in `lograg-rag` picks one per call.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send a fully composed prompt and return the model's answer
    async fn invoke(&self, prompt: &str) -> Result<ChatResponse>;

    /// Registry name of this backend
    fn name(&self) -> &str;
}

/// Constructor registered for a backend name
///
/// Factories run on every resolution, so they should be cheap; failures are
/// reported as errors rather than panics so the selector can fall back.
pub type BackendFactory = Arc<dyn Fn() -> Result<Box<dyn ChatBackend>> + Send + Sync>;
