use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use weft_core::chat::{ChatRequest, ChatResponse, ChatRole};
use weft_core::config::ChatProviderConfig;
use weft_core::error::{Result, WeftError};
use weft_core::traits::ChatClient;

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Client for the OpenAI chat completions API and compatible backends
/// (OpenRouter, Ollama, vLLM, ...) selected via `base_url`.
#[derive(Debug)]
pub struct OpenAiClient {
    http: Client,
    api_key: Option<String>,
    base_url: Option<String>,
}

impl OpenAiClient {
    pub fn new(config: &ChatProviderConfig) -> Self {
        Self {
            http: Client::new(),
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
        }
    }
}

// OpenAI API request types
#[derive(Serialize)]
struct OpenAiRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<ApiMessage>,
}

#[derive(Serialize)]
struct ApiMessage {
    role: String,
    content: String,
}

// OpenAI API response types
#[derive(Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    model: String,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<UsageInfo>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct UsageInfo {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

impl UsageInfo {
    fn total(&self) -> u64 {
        if self.total_tokens > 0 {
            self.total_tokens
        } else {
            self.prompt_tokens + self.completion_tokens
        }
    }
}

impl ChatClient for OpenAiClient {
    fn chat(&self, request: ChatRequest) -> BoxFuture<'_, Result<ChatResponse>> {
        Box::pin(async move {
            let base_url = self.base_url.as_deref().unwrap_or(OPENAI_API_URL);

            let messages = request
                .messages
                .iter()
                .map(|m| ApiMessage {
                    role: match m.role {
                        ChatRole::System => "system",
                        ChatRole::User => "user",
                        ChatRole::Assistant => "assistant",
                    }
                    .to_string(),
                    content: m.content.clone(),
                })
                .collect();

            let body = OpenAiRequest {
                model: request.options.model.clone(),
                max_tokens: request.options.max_tokens,
                temperature: request.options.temperature,
                messages,
            };

            debug!(model = %body.model, url = %base_url, "Sending OpenAI chat request");

            let mut req = self
                .http
                .post(base_url)
                .timeout(Duration::from_secs(request.options.timeout_secs))
                .json(&body);
            if let Some(api_key) = &self.api_key {
                req = req.header("Authorization", format!("Bearer {}", api_key));
            }

            let response = req
                .send()
                .await
                .map_err(|e| WeftError::ChatRequest(e.to_string()))?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(WeftError::ChatRequest(format!("HTTP {}: {}", status, body)));
            }

            let parsed: OpenAiResponse = response
                .json()
                .await
                .map_err(|e| WeftError::ChatParse(e.to_string()))?;

            let text = parsed
                .choices
                .first()
                .and_then(|c| c.message.content.clone())
                .ok_or_else(|| WeftError::ChatParse("response has no choices".into()))?;

            Ok(ChatResponse {
                response: text,
                model_used: if parsed.model.is_empty() {
                    request.options.model
                } else {
                    parsed.model
                },
                tokens_used: parsed.usage.as_ref().map(|u| u.total()).unwrap_or(0),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_parsing() {
        let raw = r#"{
            "model": "gpt-4o-mini",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "pong"}}],
            "usage": {"prompt_tokens": 3, "completion_tokens": 1, "total_tokens": 4}
        }"#;
        let parsed: OpenAiResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("pong"));
        assert_eq!(parsed.usage.unwrap().total(), 4);
    }

    #[test]
    fn test_usage_total_falls_back_to_sum() {
        let usage = UsageInfo {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 0,
        };
        assert_eq!(usage.total(), 15);
    }

    #[test]
    fn test_empty_choices_is_parse_error() {
        let raw = r#"{"model": "m", "choices": []}"#;
        let parsed: OpenAiResponse = serde_json::from_str(raw).unwrap();
        assert!(parsed.choices.is_empty());
    }
}
