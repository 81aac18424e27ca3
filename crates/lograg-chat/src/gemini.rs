//! Gemini chat backend

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use lograg_core::{ChatBackend, ChatResponse, Error, Result};

use crate::config::GeminiConfig;

/// Gemini client for the `generateContent` REST API
pub struct GeminiChat {
    config: GeminiConfig,
    api_key: String,
    client: Client,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    total_token_count: Option<u32>,
}

impl GeminiChat {
    pub const NAME: &'static str = "gemini";

    /// Create a new Gemini client; fails when no API key is configured
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            Error::Configuration("GOOGLE_API_KEY environment variable not found".to_string())
        })?;

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    fn request_body<'a>(&self, prompt: &'a str) -> GenerateContentRequest<'a> {
        GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
            },
        }
    }

    async fn perform_invoke(&self, prompt: &str) -> Result<ChatResponse> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.api_url.trim_end_matches('/'),
            self.config.model_id
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = format!(
                "Gemini API request failed with status {}: {}",
                status, error_text
            );
            // Throttling and server faults are worth another attempt
            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                return Err(Error::Network(message));
            }
            return Err(Error::chat(Self::NAME, message));
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| Error::Serialization(e.to_string()))?;

        parse_generation(body, &self.config.model_id)
    }
}

fn parse_generation(body: GenerateContentResponse, requested_model: &str) -> Result<ChatResponse> {
    let total_tokens = body.usage_metadata.and_then(|usage| usage.total_token_count);
    let model_name = body
        .model_version
        .unwrap_or_else(|| requested_model.to_string());

    let candidate = body
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| Error::chat(GeminiChat::NAME, "response contained no candidates"))?;

    let content: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if content.trim().is_empty() {
        return Err(Error::chat(
            GeminiChat::NAME,
            format!(
                "empty candidate (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            ),
        ));
    }

    Ok(ChatResponse {
        content,
        model_name,
        finish_reason: candidate.finish_reason,
        total_tokens,
    })
}

fn is_transient(err: &Error) -> bool {
    matches!(err, Error::Network(_) | Error::Timeout(_))
}

#[async_trait]
impl ChatBackend for GeminiChat {
    async fn invoke(&self, prompt: &str) -> Result<ChatResponse> {
        let mut attempt = 0;
        loop {
            debug!(model = %self.config.model_id, attempt, "invoking gemini");

            let result = match timeout(self.config.timeout(), self.perform_invoke(prompt)).await {
                Ok(result) => result,
                Err(_) => Err(Error::Timeout(format!(
                    "gemini did not answer within {}s",
                    self.config.timeout_secs
                ))),
            };

            match result {
                Err(err) if is_transient(&err) && attempt < self.config.max_retries => {
                    attempt += 1;
                    warn!(attempt, error = %err, "retrying gemini request");
                    sleep(Duration::from_millis(500 * 2u64.pow(attempt - 1))).await;
                }
                other => return other,
            }
        }
    }

    fn name(&self) -> &str {
        Self::NAME
    }
}
