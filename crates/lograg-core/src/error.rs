//! Error types for lograg

use thiserror::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for the lograg system
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Document loader error: {0}")]
    DocumentLoader(String),

    #[error("Embedding error ({provider}): {message}")]
    Embedding { provider: String, message: String },

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Chat backend error ({backend}): {message}")]
    ChatBackend { backend: String, message: String },

    /// No factory is registered under the requested backend name.
    #[error("Chat backend '{0}' is not registered")]
    BackendNotRegistered(String),

    /// A factory was found but could not build its backend.
    #[error("Chat backend '{backend}' could not be constructed: {message}")]
    BackendConstruction { backend: String, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Timeout error: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn chat(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ChatBackend {
            backend: backend.into(),
            message: message.into(),
        }
    }

    pub fn embedding(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Embedding {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
