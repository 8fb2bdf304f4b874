use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WeftError};

/// Top-level Weft configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeftConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    pub chat: ChatProviderConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub gateway: Option<GatewayConfig>,
    /// Agent profiles registered as agent units at startup.
    #[serde(default)]
    pub agents: Vec<AgentProfile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "weft.db".to_string()
}

/// Default chat provider shared by all agent profiles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatProviderConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    pub model_id: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_chat_timeout")]
    pub timeout_secs: u64,
}

fn default_provider() -> String {
    "anthropic".to_string()
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_temperature() -> f32 {
    0.7
}
fn default_chat_timeout() -> u64 {
    30
}

/// Engine-wide execution limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Fallback per-unit timeout when the unit declares none.
    #[serde(default = "default_unit_timeout")]
    pub unit_timeout_secs: u64,
    /// Stored error messages are truncated to this many characters.
    #[serde(default = "default_max_error_chars")]
    pub max_error_chars: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            unit_timeout_secs: default_unit_timeout(),
            max_error_chars: default_max_error_chars(),
        }
    }
}

fn default_unit_timeout() -> u64 {
    30
}
fn default_max_error_chars() -> usize {
    500
}

/// HTTP event gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Bearer token required on event submission. None = open.
    #[serde(default)]
    pub token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            token: None,
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8970".to_string()
}

/// A named agent definition referenced by `agent_id` in workflows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    pub id: String,
    pub system_prompt: String,
    /// Model override. None = the [chat] default model.
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl WeftConfig {
    /// Load config from a TOML file, with env var expansion.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| WeftError::ConfigNotFound(path.display().to_string()))?;

        // Expand ${ENV_VAR} references
        let expanded = expand_env_vars(&content);

        toml::from_str(&expanded).map_err(|e| WeftError::Config(e.to_string()))
    }

    /// Look up an agent profile by id.
    pub fn agent(&self, id: &str) -> Option<&AgentProfile> {
        self.agents.iter().find(|a| a.id == id)
    }
}

/// Expand `${ENV_VAR}` patterns in a string.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_name.push(c);
            }
            match std::env::var(&var_name) {
                Ok(val) => result.push_str(&val),
                Err(_) => {
                    // Keep original if env var not set
                    result.push_str(&format!("${{{}}}", var_name));
                }
            }
        } else {
            result.push(c);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env_vars() {
        std::env::set_var("TEST_WEFT_VAR", "hello");
        let result = expand_env_vars("key = \"${TEST_WEFT_VAR}\"");
        assert_eq!(result, "key = \"hello\"");
        std::env::remove_var("TEST_WEFT_VAR");
    }

    #[test]
    fn test_expand_env_vars_missing() {
        let result = expand_env_vars("key = \"${NONEXISTENT_WEFT_VAR}\"");
        assert_eq!(result, "key = \"${NONEXISTENT_WEFT_VAR}\"");
    }

    #[test]
    fn test_defaults_from_minimal_toml() {
        let toml_str = r#"
[chat]
model_id = "claude-sonnet-4-20250514"
"#;
        let config: WeftConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.chat.provider, "anthropic");
        assert_eq!(config.chat.max_tokens, 4096);
        assert_eq!(config.database.path, "weft.db");
        assert_eq!(config.engine.unit_timeout_secs, 30);
        assert_eq!(config.engine.max_error_chars, 500);
        assert!(config.gateway.is_none());
        assert!(config.agents.is_empty());
    }

    #[test]
    fn test_full_config_with_agents() {
        let toml_str = r#"
[database]
path = "/var/lib/weft/weft.db"

[chat]
provider = "openai"
model_id = "gpt-4o"
api_key = "sk-test"
temperature = 0.3

[gateway]
bind = "0.0.0.0:8970"
token = "wf_secret"

[[agents]]
id = "triage"
system_prompt = "You triage support tickets."
temperature = 0.1

[[agents]]
id = "summarizer"
system_prompt = "You summarize."
model = "gpt-4o-mini"
max_tokens = 1024
"#;
        let config: WeftConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.chat.provider, "openai");
        assert_eq!(config.database.path, "/var/lib/weft/weft.db");
        let gw = config.gateway.as_ref().unwrap();
        assert_eq!(gw.bind, "0.0.0.0:8970");
        assert_eq!(gw.token.as_deref(), Some("wf_secret"));
        assert_eq!(config.agents.len(), 2);
        assert_eq!(config.agent("triage").unwrap().temperature, Some(0.1));
        assert_eq!(
            config.agent("summarizer").unwrap().model.as_deref(),
            Some("gpt-4o-mini")
        );
        assert!(config.agent("missing").is_none());
    }
}
