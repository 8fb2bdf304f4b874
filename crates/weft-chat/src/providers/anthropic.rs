use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use weft_core::chat::{ChatMessage, ChatRequest, ChatResponse, ChatRole};
use weft_core::config::ChatProviderConfig;
use weft_core::error::{Result, WeftError};
use weft_core::traits::ChatClient;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug)]
pub struct AnthropicClient {
    http: Client,
    api_key: Option<String>,
    base_url: Option<String>,
}

impl AnthropicClient {
    pub fn new(config: &ChatProviderConfig) -> Self {
        Self {
            http: Client::new(),
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
        }
    }
}

// Anthropic API request types
#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
}

#[derive(Serialize)]
struct ApiMessage {
    role: String,
    content: String,
}

// Anthropic API response types
#[derive(Deserialize)]
struct AnthropicResponse {
    model: String,
    content: Vec<ResponseBlock>,
    #[serde(default)]
    usage: Option<UsageInfo>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum ResponseBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct UsageInfo {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

/// Split system messages out; Anthropic takes them as a top-level field.
fn convert_messages(messages: &[ChatMessage]) -> (Option<String>, Vec<ApiMessage>) {
    let mut system_parts = Vec::new();
    let mut api_msgs = Vec::new();

    for msg in messages {
        match msg.role {
            ChatRole::System => system_parts.push(msg.content.clone()),
            ChatRole::User => api_msgs.push(ApiMessage {
                role: "user".to_string(),
                content: msg.content.clone(),
            }),
            ChatRole::Assistant => api_msgs.push(ApiMessage {
                role: "assistant".to_string(),
                content: msg.content.clone(),
            }),
        }
    }

    let system = if system_parts.is_empty() {
        None
    } else {
        Some(system_parts.join("\n\n"))
    };
    (system, api_msgs)
}

fn extract_text(response: &AnthropicResponse) -> String {
    response
        .content
        .iter()
        .filter_map(|b| match b {
            ResponseBlock::Text { text } => Some(text.as_str()),
            ResponseBlock::Other => None,
        })
        .collect::<Vec<_>>()
        .join("")
}

impl ChatClient for AnthropicClient {
    fn chat(&self, request: ChatRequest) -> BoxFuture<'_, Result<ChatResponse>> {
        Box::pin(async move {
            let api_key = self
                .api_key
                .as_deref()
                .ok_or_else(|| WeftError::Config("Anthropic API key not set".into()))?;

            let base_url = self.base_url.as_deref().unwrap_or(ANTHROPIC_API_URL);

            let (system, api_messages) = convert_messages(&request.messages);
            let body = AnthropicRequest {
                model: request.options.model.clone(),
                max_tokens: request.options.max_tokens,
                temperature: request.options.temperature,
                messages: api_messages,
                system,
            };

            debug!(model = %body.model, "Sending Anthropic chat request");

            let response = self
                .http
                .post(base_url)
                .header("x-api-key", api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .timeout(Duration::from_secs(request.options.timeout_secs))
                .json(&body)
                .send()
                .await
                .map_err(|e| WeftError::ChatRequest(e.to_string()))?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(WeftError::ChatRequest(format!("HTTP {}: {}", status, body)));
            }

            let parsed: AnthropicResponse = response
                .json()
                .await
                .map_err(|e| WeftError::ChatParse(e.to_string()))?;

            let tokens_used = parsed
                .usage
                .as_ref()
                .map(|u| u.input_tokens + u.output_tokens)
                .unwrap_or(0);

            Ok(ChatResponse {
                response: extract_text(&parsed),
                model_used: parsed.model,
                tokens_used,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_core::chat::ChatOptions;

    #[test]
    fn test_system_messages_lift_to_top_level() {
        let messages = vec![
            ChatMessage::system("You are terse."),
            ChatMessage::user("hi"),
            ChatMessage::assistant("hello"),
        ];
        let (system, api) = convert_messages(&messages);
        assert_eq!(system.as_deref(), Some("You are terse."));
        assert_eq!(api.len(), 2);
        assert_eq!(api[0].role, "user");
        assert_eq!(api[1].role, "assistant");
    }

    #[test]
    fn test_request_body_shape() {
        let (system, messages) = convert_messages(&[ChatMessage::user("ping")]);
        let body = AnthropicRequest {
            model: "claude-sonnet-4-20250514".into(),
            max_tokens: 256,
            temperature: 0.2,
            messages,
            system,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["model"], "claude-sonnet-4-20250514");
        assert_eq!(value["messages"][0]["content"], "ping");
        // No system message — the field must not appear at all
        assert!(value.get("system").is_none());
    }

    #[test]
    fn test_response_parsing_joins_text_blocks() {
        let raw = r#"{
            "id": "msg_1",
            "model": "claude-sonnet-4-20250514",
            "content": [
                {"type": "text", "text": "part one "},
                {"type": "tool_use", "id": "t1", "name": "x", "input": {}},
                {"type": "text", "text": "part two"}
            ],
            "usage": {"input_tokens": 12, "output_tokens": 8}
        }"#;
        let parsed: AnthropicResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(extract_text(&parsed), "part one part two");
        assert_eq!(parsed.usage.unwrap().output_tokens, 8);
    }

    #[test]
    fn test_missing_api_key_errors_before_network() {
        let client = AnthropicClient::new(&ChatProviderConfig {
            provider: "anthropic".into(),
            model_id: "claude-sonnet-4-20250514".into(),
            api_key: None,
            base_url: None,
            max_tokens: 256,
            temperature: 0.2,
            timeout_secs: 5,
        });
        let request = ChatRequest {
            messages: vec![ChatMessage::user("hi")],
            options: ChatOptions::for_model("claude-sonnet-4-20250514"),
        };
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let err = rt.block_on(client.chat(request)).unwrap_err();
        assert!(matches!(err, WeftError::Config(_)));
    }
}
