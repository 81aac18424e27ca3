//! Hugging Face chat backend
//!
//! Talks to the OpenAI-compatible chat completions route of the Hugging Face
//! inference router.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::debug;

use lograg_core::{ChatBackend, ChatResponse, Error, Result};

use crate::config::HuggingFaceConfig;

/// Hugging Face chat client
pub struct HuggingFaceChat {
    config: HuggingFaceConfig,
    client: Client,
}

#[derive(Debug, Serialize, PartialEq)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: u32,
}

impl HuggingFaceChat {
    pub const NAME: &'static str = "huggingface";

    /// Create a new Hugging Face client from configuration
    pub fn new(config: HuggingFaceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self { config, client })
    }

    fn request_body<'a>(&'a self, prompt: &'a str) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &self.config.model_id,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.config.max_new_tokens,
            temperature: self.config.temperature,
            stream: false,
        }
    }

    async fn perform_invoke(&self, prompt: &str) -> Result<ChatResponse> {
        let url = format!("{}/chat/completions", self.config.api_url.trim_end_matches('/'));

        let mut request = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&self.request_body(prompt));

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
            return Err(Error::chat(
                Self::NAME,
                format!("request failed with status {}: {}", status, error_text),
            ));
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::Serialization(e.to_string()))?;

        parse_completion(body, &self.config.model_id)
    }
}

fn parse_completion(body: ChatCompletionResponse, requested_model: &str) -> Result<ChatResponse> {
    let total_tokens = body.usage.map(|usage| usage.total_tokens);
    let model_name = body.model.unwrap_or_else(|| requested_model.to_string());

    let choice = body
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| Error::chat(HuggingFaceChat::NAME, "response contained no choices"))?;

    let content = choice.message.content.unwrap_or_default();
    if content.trim().is_empty() {
        return Err(Error::chat(HuggingFaceChat::NAME, "empty completion"));
    }

    Ok(ChatResponse {
        content,
        model_name,
        finish_reason: choice.finish_reason,
        total_tokens,
    })
}

#[async_trait]
impl ChatBackend for HuggingFaceChat {
    async fn invoke(&self, prompt: &str) -> Result<ChatResponse> {
        debug!(model = %self.config.model_id, prompt_len = prompt.len(), "invoking huggingface");

        match timeout(self.config.timeout(), self.perform_invoke(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(format!(
                "huggingface did not answer within {}s",
                self.config.timeout_secs
            ))),
        }
    }

    fn name(&self) -> &str {
        Self::NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_body_wire_format() {
        let chat = HuggingFaceChat::new(HuggingFaceConfig::new(None)).unwrap();
        let body = serde_json::to_value(chat.request_body("SYSTEM: hi")).unwrap();

        assert_eq!(
            body,
            json!({
                "model": "deepseek-ai/DeepSeek-R1-0528",
                "messages": [{"role": "user", "content": "SYSTEM: hi"}],
                "max_tokens": 512,
                "temperature": 0.0,
                "stream": false,
            })
        );
    }

    #[test]
    fn test_parse_completion() {
        let body: ChatCompletionResponse = serde_json::from_value(json!({
            "model": "deepseek-ai/DeepSeek-R1-0528",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "The logs show a restart loop."},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 7, "total_tokens": 17}
        }))
        .unwrap();

        let response = parse_completion(body, "fallback-model").unwrap();
        assert_eq!(response.content, "The logs show a restart loop.");
        assert_eq!(response.model_name, "deepseek-ai/DeepSeek-R1-0528");
        assert_eq!(response.finish_reason.as_deref(), Some("stop"));
        assert_eq!(response.total_tokens, Some(17));
    }

    #[test]
    fn test_parse_completion_without_choices() {
        let body: ChatCompletionResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        let err = parse_completion(body, "m").unwrap_err();
        assert!(matches!(err, Error::ChatBackend { .. }));
    }
}
