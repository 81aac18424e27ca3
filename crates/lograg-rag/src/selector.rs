//! Chat backend selection
//!
//! Backends are looked up in an explicit registry of factories. A name is
//! resolved from, in order: the caller's explicit choice, the name configured
//! in the environment at startup, and the default backend.
//!
//! Loading never fails because of the *requested* backend: an unknown name or
//! a factory error is logged and the default backend is loaded instead. This
//! keeps the pipeline answering when a backend is misconfigured, at the cost
//! of the misconfiguration only showing up in the logs. Only a failure of the
//! default factory itself reaches the caller.

use std::collections::HashMap;
use std::env;

use tracing::{debug, warn};

use lograg_core::{BackendFactory, ChatBackend, Error, Result};

/// Names used to resolve a backend when the caller passes none
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorConfig {
    pub default_backend: String,
    /// Backend named by the environment (`CHAT_MODEL`), captured once at startup
    pub env_backend: Option<String>,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            default_backend: "huggingface".to_string(),
            env_backend: None,
        }
    }
}

impl SelectorConfig {
    pub fn new(default_backend: impl Into<String>) -> Self {
        Self {
            default_backend: default_backend.into(),
            env_backend: None,
        }
    }

    /// Create configuration from environment variables
    pub fn from_env(default_backend: impl Into<String>) -> Self {
        dotenvy::dotenv().ok();

        Self {
            default_backend: default_backend.into(),
            env_backend: env::var("CHAT_MODEL").ok().filter(|name| !name.is_empty()),
        }
    }

    pub fn with_env_backend(mut self, name: impl Into<String>) -> Self {
        self.env_backend = Some(name.into());
        self
    }
}

/// Registry of chat backend factories with a guaranteed default
pub struct BackendSelector {
    config: SelectorConfig,
    registry: HashMap<String, BackendFactory>,
}

impl BackendSelector {
    /// Create a selector; `default_factory` is registered under the default name
    pub fn new(config: SelectorConfig, default_factory: BackendFactory) -> Self {
        let mut registry = HashMap::new();
        registry.insert(config.default_backend.to_lowercase(), default_factory);
        Self { config, registry }
    }

    /// Register (or replace) the factory for `name`
    pub fn register(mut self, name: impl Into<String>, factory: BackendFactory) -> Self {
        self.registry.insert(name.into().to_lowercase(), factory);
        self
    }

    pub fn default_backend(&self) -> &str {
        &self.config.default_backend
    }

    /// Registered backend names, sorted
    pub fn backends(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.registry.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Resolve the canonical backend name for an optional explicit choice
    pub fn resolve(&self, explicit: Option<&str>) -> String {
        explicit
            .filter(|name| !name.is_empty())
            .or(self.config.env_backend.as_deref().filter(|name| !name.is_empty()))
            .unwrap_or(&self.config.default_backend)
            .to_lowercase()
    }

    /// Build the backend registered under `name`, without any fallback
    pub fn try_load(&self, name: &str) -> Result<Box<dyn ChatBackend>> {
        let factory = self
            .registry
            .get(name)
            .ok_or_else(|| Error::BackendNotRegistered(name.to_string()))?;

        factory().map_err(|e| Error::BackendConstruction {
            backend: name.to_string(),
            message: e.to_string(),
        })
    }

    /// Resolve and build a backend, falling back to the default on failure
    pub fn load(&self, name: Option<&str>) -> Result<Box<dyn ChatBackend>> {
        let backend = self.resolve(name);

        match self.try_load(&backend) {
            Ok(chat) => {
                debug!(backend = %backend, "loaded chat backend");
                Ok(chat)
            }
            Err(err) => {
                let default = self.config.default_backend.to_lowercase();
                match &err {
                    Error::BackendNotRegistered(_) => {
                        warn!(
                            backend = %backend,
                            fallback = %default,
                            "chat backend not registered, using default"
                        )
                    }
                    _ => {
                        warn!(
                            backend = %backend,
                            fallback = %default,
                            error = %err,
                            "chat backend failed to load, using default"
                        )
                    }
                }
                self.try_load(&default)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lograg_core::ChatResponse;
    use std::sync::Arc;

    struct NamedBackend(&'static str);

    #[async_trait]
    impl ChatBackend for NamedBackend {
        async fn invoke(&self, prompt: &str) -> Result<ChatResponse> {
            Ok(ChatResponse::new(format!("{}: {}", self.0, prompt), self.0))
        }

        fn name(&self) -> &str {
            self.0
        }
    }

    fn named(name: &'static str) -> BackendFactory {
        Arc::new(move || -> Result<Box<dyn ChatBackend>> { Ok(Box::new(NamedBackend(name))) })
    }

    fn failing(message: &'static str) -> BackendFactory {
        Arc::new(move || -> Result<Box<dyn ChatBackend>> {
            Err(Error::Configuration(message.to_string()))
        })
    }

    fn selector(config: SelectorConfig) -> BackendSelector {
        BackendSelector::new(config, named("huggingface"))
            .register("gemini", named("gemini"))
            .register("broken", failing("missing key"))
    }

    #[test]
    fn test_resolve_order() {
        let plain = selector(SelectorConfig::default());
        assert_eq!(plain.resolve(None), "huggingface");
        assert_eq!(plain.resolve(Some("")), "huggingface");
        assert_eq!(plain.resolve(Some("Gemini")), "gemini");

        let with_env = selector(SelectorConfig::default().with_env_backend("GEMINI"));
        assert_eq!(with_env.resolve(None), "gemini");
        assert_eq!(with_env.resolve(Some("huggingface")), "huggingface");
    }

    #[test]
    fn test_explicit_beats_environment() {
        let selector = selector(SelectorConfig::default().with_env_backend("gemini"));
        let chat = selector.load(Some("HuggingFace")).unwrap();
        assert_eq!(chat.name(), "huggingface");
    }

    #[test]
    fn test_unknown_backend_falls_back_to_default() {
        let selector = selector(SelectorConfig::default());
        let chat = selector.load(Some("does-not-exist")).unwrap();
        assert_eq!(chat.name(), "huggingface");

        assert!(matches!(
            selector.try_load("does-not-exist").err().unwrap(),
            Error::BackendNotRegistered(_)
        ));
    }

    #[test]
    fn test_construction_failure_falls_back_to_default() {
        let selector = selector(SelectorConfig::default().with_env_backend("broken"));
        let chat = selector.load(None).unwrap();
        assert_eq!(chat.name(), "huggingface");

        assert!(matches!(
            selector.try_load("broken").err().unwrap(),
            Error::BackendConstruction { .. }
        ));
    }

    #[test]
    fn test_default_failure_is_reported() {
        let selector = BackendSelector::new(SelectorConfig::default(), failing("no token"));
        assert!(selector.load(Some("gemini")).is_err());
    }

    #[test]
    fn test_backends_listing() {
        let selector = selector(SelectorConfig::default());
        assert_eq!(selector.backends(), vec!["broken", "gemini", "huggingface"]);
    }
}
