//! Chat model backends for lograg
//!
//! This crate provides the concrete `ChatBackend` implementations and the
//! factories the backend selector registers at startup.

mod config;
mod gemini;
mod huggingface;


use std::sync::Arc;

pub use config::{ChatSettings, GeminiConfig, HuggingFaceConfig};
pub use gemini::GeminiChat;
pub use huggingface::HuggingFaceChat;

// Re-export core types for convenience
pub use lograg_core::{BackendFactory, ChatBackend, ChatResponse, Error, Result};

/// Name of the backend used when nothing else is configured or resolvable
pub const DEFAULT_BACKEND: &str = HuggingFaceChat::NAME;

/// Factory for the default Hugging Face backend
pub fn huggingface_factory(config: HuggingFaceConfig) -> BackendFactory {
    Arc::new(move || -> Result<Box<dyn ChatBackend>> {
        let chat = HuggingFaceChat::new(config.clone())?;
        Ok(Box::new(chat))
    })
}

/// Factory for the Gemini backend
pub fn gemini_factory(config: GeminiConfig) -> BackendFactory {
    Arc::new(move || -> Result<Box<dyn ChatBackend>> {
        let chat = GeminiChat::new(config.clone())?;
        Ok(Box::new(chat))
    })
}

/// Every built-in backend as `(name, factory)` pairs, default first
pub fn builtin_backends(settings: &ChatSettings) -> Vec<(&'static str, BackendFactory)> {
    vec![
        (HuggingFaceChat::NAME, huggingface_factory(settings.huggingface.clone())),
        (GeminiChat::NAME, gemini_factory(settings.gemini.clone())),
    ]
}
