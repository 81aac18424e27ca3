//! Chat backend configuration

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Configuration for the Hugging Face chat backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HuggingFaceConfig {
    pub api_token: Option<String>,
    pub api_url: String,
    pub model_id: String,
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl HuggingFaceConfig {
    pub const DEFAULT_API_URL: &'static str = "https://router.huggingface.co/v1";
    pub const DEFAULT_MODEL: &'static str = "deepseek-ai/DeepSeek-R1-0528";

    /// Create configuration with explicit values
    pub fn new(api_token: Option<String>) -> Self {
        Self {
            api_token,
            api_url: Self::DEFAULT_API_URL.to_string(),
            model_id: Self::DEFAULT_MODEL.to_string(),
            max_new_tokens: 512,
            temperature: 0.0,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Configuration for the Gemini chat backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub api_url: String,
    pub model_id: String,
    pub temperature: f32,
    pub max_retries: u32,
    pub timeout_secs: u64,
}

impl GeminiConfig {
    pub const DEFAULT_API_URL: &'static str = "https://generativelanguage.googleapis.com/v1beta";
    pub const DEFAULT_MODEL: &'static str = "gemini-2.5-flash";

    /// Create configuration with explicit values
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            api_url: Self::DEFAULT_API_URL.to_string(),
            model_id: Self::DEFAULT_MODEL.to_string(),
            temperature: 0.0,
            max_retries: 2,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Settings for every built-in chat backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSettings {
    pub huggingface: HuggingFaceConfig,
    pub gemini: GeminiConfig,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            huggingface: HuggingFaceConfig::new(None),
            gemini: GeminiConfig::new(None),
        }
    }
}

impl ChatSettings {
    /// Create settings from environment variables
    ///
    /// Missing credentials are not an error here: the Hugging Face backend can
    /// still be built without a token, and Gemini reports the missing key when
    /// the selector tries to construct it.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let timeout_secs = env::var("CHAT_TIMEOUT_SECS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let hf_token = env::var("HUGGINGFACEHUB_API_TOKEN")
            .or_else(|_| env::var("HF_TOKEN"))
            .ok()
            .filter(|token| !token.is_empty());

        let mut huggingface = HuggingFaceConfig::new(hf_token);
        huggingface.timeout_secs = timeout_secs;
        if let Ok(model) = env::var("HF_CHAT_MODEL") {
            huggingface.model_id = model;
        }
        if let Ok(url) = env::var("HF_API_URL") {
            huggingface.api_url = url;
        }

        let gemini_key = env::var("GOOGLE_API_KEY")
            .or_else(|_| env::var("GEMINI_API_KEY"))
            .ok()
            .filter(|key| !key.is_empty());

        let mut gemini = GeminiConfig::new(gemini_key);
        gemini.timeout_secs = timeout_secs;
        if let Ok(model) = env::var("GEMINI_MODEL") {
            gemini.model_id = model;
        }

        Self { huggingface, gemini }
    }
}
