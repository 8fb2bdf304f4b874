use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use weft_core::chat::{ChatMessage, ChatOptions, ChatRequest};
use weft_core::config::{AgentProfile, ChatProviderConfig};
use weft_core::error::{Result, WeftError};
use weft_core::traits::{ChatClient, Unit};

/// An agent node backed by a chat model.
///
/// One instance is registered per `[[agents]]` profile; the profile
/// plus the `[chat]` defaults form the unit's base config, which node
/// overrides are deep-merged over at execution time.
pub struct ChatAgentUnit {
    profile: AgentProfile,
    defaults: ChatProviderConfig,
    chat: Arc<dyn ChatClient>,
}

impl ChatAgentUnit {
    pub fn new(profile: AgentProfile, defaults: ChatProviderConfig, chat: Arc<dyn ChatClient>) -> Self {
        Self {
            profile,
            defaults,
            chat,
        }
    }
}

/// Effective config after merging node overrides over the base.
#[derive(Deserialize)]
struct AgentRunConfig {
    #[serde(default)]
    system_prompt: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    temperature: Option<f32>,
    #[serde(default)]
    max_tokens: Option<u32>,
    #[serde(default)]
    timeout_secs: Option<u64>,
}

/// Render resolved inputs into a single user message.
///
/// A `prompt` (or `message`) input becomes the body; every other input
/// is appended as a labeled context line.
fn render_user_message(inputs: &Value) -> String {
    let Some(map) = inputs.as_object() else {
        return display_value(inputs);
    };

    let body = map
        .get("prompt")
        .or_else(|| map.get("message"))
        .map(display_value)
        .unwrap_or_default();

    let mut rendered = String::new();
    let mut context_lines = String::new();
    for (key, value) in map {
        if key == "prompt" || key == "message" {
            continue;
        }
        context_lines.push_str(&format!("**{}**: {}\n", key, display_value(value)));
    }

    if !context_lines.is_empty() {
        rendered.push_str("## Context Data\n\n");
        rendered.push_str(&context_lines);
        rendered.push_str("\n---\n\n");
    }
    rendered.push_str(&body);
    rendered
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl Unit for ChatAgentUnit {
    fn id(&self) -> &str {
        &self.profile.id
    }

    fn base_config(&self) -> Value {
        json!({
            "system_prompt": self.profile.system_prompt,
            "model": self.profile.model.clone().unwrap_or_else(|| self.defaults.model_id.clone()),
            "temperature": self.profile.temperature.unwrap_or(self.defaults.temperature),
            "max_tokens": self.profile.max_tokens.unwrap_or(self.defaults.max_tokens),
            "timeout_secs": self.profile.timeout_secs.unwrap_or(self.defaults.timeout_secs),
        })
    }

    fn timeout_secs(&self) -> u64 {
        self.profile.timeout_secs.unwrap_or(self.defaults.timeout_secs)
    }

    fn execute(&self, inputs: Value, config: Value) -> BoxFuture<'_, Result<Value>> {
        Box::pin(async move {
            let run: AgentRunConfig =
                serde_json::from_value(config).map_err(|e| WeftError::UnitExecution {
                    unit: self.profile.id.clone(),
                    message: format!("invalid agent config: {}", e),
                })?;

            let mut messages = Vec::new();
            if let Some(system) = run.system_prompt.filter(|s| !s.is_empty()) {
                messages.push(ChatMessage::system(system));
            }
            messages.push(ChatMessage::user(render_user_message(&inputs)));

            let mut options =
                ChatOptions::for_model(run.model.unwrap_or_else(|| self.defaults.model_id.clone()));
            if let Some(t) = run.temperature {
                options.temperature = t;
            }
            if let Some(m) = run.max_tokens {
                options.max_tokens = m;
            }
            if let Some(t) = run.timeout_secs {
                options.timeout_secs = t;
            }

            debug!(agent_id = %self.profile.id, model = %options.model, "Running agent unit");

            let reply = self.chat.chat(ChatRequest { messages, options }).await?;

            Ok(json!({
                "response": reply.response,
                "model_used": reply.model_used,
                "tokens_used": reply.tokens_used,
            }))
        })
    }
}
